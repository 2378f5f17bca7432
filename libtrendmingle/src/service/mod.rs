//! Service layer for TrendMingle
//!
//! This module provides a single API for the dashboard's behaviour that any
//! front end (web bridge, TUI, tests) can drive without duplicating logic.
//!
//! # Architecture
//!
//! `MingleService` is a facade over specialized sub-services that share one
//! store, one clock and one event bus:
//!
//! - `PostService`: post lifecycle and calendar data
//! - `AccountService`: per-platform connect/sync/disconnect
//! - `SuggestionService`: suggestion slots with pending flags
//! - `ProfileService` and `TrendService`: identity-gated shared records
//! - `EventBus`: change notifications
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libtrendmingle::identity::StaticIdentity;
//! use libtrendmingle::service::MingleService;
//! use libtrendmingle::types::Platform;
//!
//! # async fn example() -> libtrendmingle::Result<()> {
//! let identity = Arc::new(StaticIdentity::signed_in("u1", "ana@example.com"));
//! let service = MingleService::new(identity).await?;
//!
//! let post = service
//!     .posts()
//!     .create("Product launch", Platform::Instagram, "tomorrow 10am")
//!     .await?;
//! service.posts().schedule(post.id()).await?;
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod events;
pub mod posts;
pub mod profiles;
pub mod suggestions;
pub mod trends;

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

use self::accounts::AccountService;
use self::events::{EventBus, EventReceiver};
use self::posts::PostService;
use self::profiles::ProfileService;
use self::suggestions::SuggestionService;
use self::trends::TrendService;
use crate::calendar::{CalendarView, DEFAULT_PREVIEW_LIMIT};
use crate::clock::{Clock, SystemClock};
use crate::config::{resolve_db_path, Config};
use crate::dashboard::{DashboardInput, DashboardView, Route};
use crate::error::{ConfigError, MingleError, Result};
use crate::identity::{Identity, User};
use crate::logging;
use crate::store::{RemoteStore, SqliteStore};
use crate::suggestions::{Regenerator, SuggestionLibrary};
use crate::sync::simulated::SimulatedSync;
use crate::sync::AccountSync;

/// Collaborators and settings a [`MingleService`] is assembled from.
pub struct ServiceParts {
    pub store: Arc<dyn RemoteStore>,
    pub sync: Arc<dyn AccountSync>,
    pub identity: Arc<dyn Identity>,
    pub clock: Arc<dyn Clock>,
    pub regenerator: Regenerator,
    pub suggestion_delay: Duration,
    pub auto_sync_interval: Option<chrono::Duration>,
    pub preview_limit: usize,
}

impl ServiceParts {
    /// Built-in suggestions, no artificial delay, six-hour auto-sync.
    pub fn new(
        store: Arc<dyn RemoteStore>,
        sync: Arc<dyn AccountSync>,
        identity: Arc<dyn Identity>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            sync,
            identity,
            clock,
            regenerator: Regenerator::new(SuggestionLibrary::builtin()),
            suggestion_delay: Duration::ZERO,
            auto_sync_interval: Some(chrono::Duration::hours(6)),
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }
}

/// Main service facade that coordinates all sub-services
pub struct MingleService {
    identity: Arc<dyn Identity>,
    clock: Arc<dyn Clock>,
    posts: PostService,
    accounts: AccountService,
    suggestions: SuggestionService,
    profiles: ProfileService,
    trends: TrendService,
    event_bus: EventBus,
    preview_limit: usize,
}

impl MingleService {
    /// Create a service from the configuration at the default location
    ///
    /// Installs a log subscriber from the `[logging]` section when the host
    /// has not installed one.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration cannot be loaded or fails validation
    /// - The database cannot be opened or migrated
    pub async fn new(identity: Arc<dyn Identity>) -> Result<Self> {
        let config = Config::load()?;
        logging::init_from_config(&config)?;
        Self::from_config(&config, identity).await
    }

    /// Wire the production collaborators described by `config`.
    pub async fn from_config(config: &Config, identity: Arc<dyn Identity>) -> Result<Self> {
        config.validate()?;

        let db_path = resolve_db_path(&config.database.path)?;
        let db_path_str = db_path.to_str().ok_or_else(|| {
            MingleError::Config(ConfigError::InvalidValue {
                field: "database.path".to_string(),
                message: "path is not valid UTF-8".to_string(),
            })
        })?;
        let store = SqliteStore::new(db_path_str).await?;

        let auto_sync_interval = config
            .sync
            .auto_sync_interval()?
            .map(chrono::Duration::from_std)
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                field: "sync.auto_sync_interval".to_string(),
                message: e.to_string(),
            })?;

        let parts = ServiceParts {
            store: Arc::new(store),
            sync: Arc::new(SimulatedSync::from_config(&config.sync)?),
            identity,
            clock: Arc::new(SystemClock),
            regenerator: Regenerator::new(config.suggestions.library()?),
            suggestion_delay: config.suggestions.delay()?,
            auto_sync_interval,
            preview_limit: config.calendar.preview_limit,
        };
        Self::from_parts(parts).await
    }

    /// Assemble from explicit collaborators and restore stored posts and
    /// accounts.
    pub async fn from_parts(parts: ServiceParts) -> Result<Self> {
        let event_bus = EventBus::new(100);

        let posts = PostService::new(
            Arc::clone(&parts.store),
            Arc::clone(&parts.clock),
            event_bus.clone(),
        );
        let accounts = AccountService::new(
            parts.sync,
            Arc::clone(&parts.store),
            Arc::clone(&parts.clock),
            event_bus.clone(),
            parts.auto_sync_interval,
        );
        let suggestions =
            SuggestionService::new(parts.regenerator, parts.suggestion_delay, event_bus.clone());
        let profiles = ProfileService::new(Arc::clone(&parts.store), Arc::clone(&parts.identity));
        let trends = TrendService::new(parts.store, Arc::clone(&parts.identity));

        posts.restore().await?;
        accounts.restore().await?;

        Ok(Self {
            identity: parts.identity,
            clock: parts.clock,
            posts,
            accounts,
            suggestions,
            profiles,
            trends,
            event_bus,
            preview_limit: parts.preview_limit,
        })
    }

    pub fn posts(&self) -> &PostService {
        &self.posts
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn suggestions(&self) -> &SuggestionService {
        &self.suggestions
    }

    pub fn profiles(&self) -> &ProfileService {
        &self.profiles
    }

    pub fn trends(&self) -> &TrendService {
        &self.trends
    }

    /// Subscribe to service events
    ///
    /// Returns a receiver for events emitted after this call. Multiple
    /// subscribers are supported.
    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    /// Guard for protected surfaces.
    pub fn require_user(&self) -> Result<User> {
        self.identity.require_user()
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.identity.sign_out().await
    }

    /// Snapshot for the signed-in user's dashboard.
    pub async fn dashboard(
        &self,
        active: Route,
        view: CalendarView,
        anchor: NaiveDate,
    ) -> Result<DashboardView> {
        self.require_user()?;

        let posts = self.posts.list().await;
        let accounts = self.accounts.list().await;
        let suggestions = self.suggestions.slots();

        Ok(DashboardView::build(DashboardInput {
            posts: &posts,
            accounts: &accounts,
            suggestions: &suggestions,
            now: self.clock.now(),
            active,
            view,
            anchor,
            preview_limit: self.preview_limit,
        }))
    }
}
