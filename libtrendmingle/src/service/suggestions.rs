//! Suggestion service
//!
//! Wraps the [`Regenerator`] with the dashboard's pending flag and artificial
//! delay. A category that is already regenerating ignores further requests
//! until its draw lands.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::Result;
use crate::service::events::{Event, EventBus};
use crate::suggestions::{Regenerator, SuggestionCategory, SuggestionSlot};

struct Inner {
    regenerator: Regenerator,
    pending: BTreeSet<SuggestionCategory>,
}

/// A slot together with whether a regeneration is in flight for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotState {
    pub slot: SuggestionSlot,
    pub pending: bool,
}

#[derive(Clone)]
pub struct SuggestionService {
    inner: Arc<Mutex<Inner>>,
    delay: Duration,
    events: EventBus,
}

/// Clears the pending flag even if the caller drops the future mid-delay.
struct PendingGuard {
    inner: Arc<Mutex<Inner>>,
    category: SuggestionCategory,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock(&self.inner).pending.remove(&self.category);
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SuggestionService {
    pub fn new(regenerator: Regenerator, delay: Duration, events: EventBus) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                regenerator,
                pending: BTreeSet::new(),
            })),
            delay,
            events,
        }
    }

    pub fn slot(&self, category: SuggestionCategory) -> SlotState {
        let inner = lock(&self.inner);
        SlotState {
            slot: inner.regenerator.slot(category).clone(),
            pending: inner.pending.contains(&category),
        }
    }

    /// Every category in display order.
    pub fn slots(&self) -> Vec<SlotState> {
        SuggestionCategory::ALL
            .iter()
            .map(|&category| self.slot(category))
            .collect()
    }

    pub fn is_pending(&self, category: SuggestionCategory) -> bool {
        lock(&self.inner).pending.contains(&category)
    }

    /// Draw new content for `category` after the configured delay.
    ///
    /// Returns the current slot unchanged if a draw is already in flight.
    pub async fn regenerate(&self, category: SuggestionCategory) -> Result<SuggestionSlot> {
        let guard = {
            let mut inner = lock(&self.inner);
            if !inner.pending.insert(category) {
                tracing::debug!(%category, "Regeneration already pending");
                return Ok(inner.regenerator.slot(category).clone());
            }
            PendingGuard {
                inner: Arc::clone(&self.inner),
                category,
            }
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let slot = lock(&self.inner).regenerator.regenerate(category)?;
        drop(guard);

        tracing::debug!(%category, "Suggestion regenerated");
        self.events.emit(Event::SuggestionRegenerated {
            category,
            content: slot.content.clone(),
        });
        Ok(slot)
    }
}
