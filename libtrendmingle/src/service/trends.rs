//! Trend board service
//!
//! Anyone may read the board; writing and liking need a signed-in user.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{MingleError, Result};
use crate::identity::Identity;
use crate::store::{NewTrend, RemoteStore, Trend, TrendUpdate};

#[derive(Clone)]
pub struct TrendService {
    store: Arc<dyn RemoteStore>,
    identity: Arc<dyn Identity>,
}

impl TrendService {
    pub fn new(store: Arc<dyn RemoteStore>, identity: Arc<dyn Identity>) -> Self {
        Self { store, identity }
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<Trend>> {
        self.store.list_trends().await
    }

    pub async fn get(&self, id: &str) -> Result<Trend> {
        self.store
            .get_trend(id)
            .await?
            .ok_or_else(|| MingleError::not_found("Trend", id))
    }

    pub async fn create(&self, new: NewTrend) -> Result<Trend> {
        let user = self.identity.require_user()?;
        validate_title(&new.title)?;

        let now = Utc::now();
        let trend = Trend {
            id: Uuid::new_v4().to_string(),
            title: new.title.trim().to_string(),
            description: new.description,
            category: new.category,
            created_by: user.id,
            created_at: now,
            updated_at: now,
            likes: 0,
            tags: new.tags,
        };
        self.store.save_trend(&trend).await?;
        tracing::info!(trend_id = %trend.id, "Trend created");
        Ok(trend)
    }

    pub async fn update(&self, id: &str, update: TrendUpdate) -> Result<Trend> {
        self.identity.require_user()?;
        if let Some(title) = &update.title {
            validate_title(title)?;
        }

        let mut trend = self.get(id).await?;
        trend.apply(update, Utc::now());
        self.store.save_trend(&trend).await?;
        // The store owns the like count.
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.identity.require_user()?;
        if !self.store.delete_trend(id).await? {
            return Err(MingleError::not_found("Trend", id));
        }
        tracing::info!(trend_id = %id, "Trend deleted");
        Ok(())
    }

    /// Add one like and return the new total.
    pub async fn like(&self, id: &str) -> Result<i64> {
        self.identity.require_user()?;
        self.store.like_trend(id).await
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(MingleError::Validation(
            "Trend title cannot be empty".to_string(),
        ));
    }
    Ok(())
}
