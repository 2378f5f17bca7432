//! TrendMingle - content scheduling core for the social dashboard
//!
//! This library holds the post lifecycle, the calendar aggregation, the
//! per-platform account connection state machine and the suggestion
//! regenerator that the dashboard front end renders.

pub mod accounts;
pub mod calendar;
pub mod clock;
pub mod compose;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod identity;
pub mod logging;
pub mod scheduling;
pub mod service;
pub mod store;
pub mod suggestions;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use accounts::{ConnectionState, SocialAccount};
pub use calendar::CalendarView;
pub use config::Config;
pub use dashboard::{DashboardView, Route};
pub use error::{MingleError, Result};
pub use service::{MingleService, ServiceParts};
pub use suggestions::{SuggestionCategory, SuggestionSlot};
pub use types::{Platform, Post, PostStatus};
