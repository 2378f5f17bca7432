//! Event system for dashboard updates
//!
//! This module provides an in-process event bus that tells subscribers
//! (a UI, a log sink, a push bridge) what changed without blocking the
//! operation that changed it.
//!
//! # Architecture
//!
//! The event bus uses `tokio::sync::broadcast` for multi-subscriber support.
//! If no subscribers exist, events are dropped immediately. Subscribers can
//! lag without blocking emitters.
//!
//! # Example
//!
//! ```no_run
//! use libtrendmingle::service::events::{EventBus, Event};
//! use libtrendmingle::types::{Platform, PostStatus};
//!
//! # async fn example() {
//! let event_bus = EventBus::new(100);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus.emit(Event::PostScheduled {
//!     post_id: "abc123".to_string(),
//!     platform: Platform::Instagram,
//! });
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {:?}", event);
//! }
//! # }
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::accounts::{ConnectionState, SyncOperation};
use crate::suggestions::SuggestionCategory;
use crate::types::{Platform, PostStatus};

/// Event receiver type alias
pub type EventReceiver = broadcast::Receiver<Event>;

/// Event bus for distributing state-change events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the specified capacity
    ///
    /// The capacity determines how many events can be buffered per subscriber
    /// before older events are dropped (if the subscriber is lagging).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Non-blocking. Lagging subscribers lose the oldest events first.
    pub fn emit(&self, event: Event) {
        // send() only fails when nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Events emitted by services after a change is committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PostCreated {
        post_id: String,
        platform: Platform,
        status: PostStatus,
        scheduled_at: NaiveDateTime,
    },

    /// A post moved to `scheduled`
    PostScheduled { post_id: String, platform: Platform },

    PostPublished {
        post_id: String,
        platform: Platform,
        engagement: u64,
    },

    /// Title, time or status changed in a way not covered above
    PostUpdated { post_id: String, status: PostStatus },

    PostDeleted { post_id: String },

    AccountStateChanged {
        platform: Platform,
        state: ConnectionState,
        last_synced_at: Option<NaiveDateTime>,
    },

    /// A connect or sync was rejected; the account has been rolled back
    AccountOperationFailed {
        platform: Platform,
        operation: SyncOperation,
        error: String,
    },

    SuggestionRegenerated {
        category: SuggestionCategory,
        content: String,
    },
}
