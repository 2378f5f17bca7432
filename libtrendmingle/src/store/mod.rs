//! Remote storage collaborator
//!
//! Profiles and trends are the dashboard's shared records. Posts and account
//! records are mirrored here so a restarted process can pick up where it left
//! off. Every write is keyed by the entity's id and is safe to repeat.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::SocialAccount;
use crate::error::Result;
use crate::types::Post;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a user may change on their own profile. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Profile {
    pub fn apply(&mut self, update: ProfileUpdate, now: DateTime<Utc>) {
        if let Some(full_name) = update.full_name {
            self.full_name = Some(full_name);
        }
        if let Some(avatar_url) = update.avatar_url {
            self.avatar_url = Some(avatar_url);
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes: i64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrend {
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl Trend {
    pub fn apply(&mut self, update: TrendUpdate, now: DateTime<Utc>) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        self.updated_at = now;
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get_profile(&self, id: &str) -> Result<Option<Profile>>;

    async fn upsert_profile(&self, profile: &Profile) -> Result<()>;

    /// All trends, newest first.
    async fn list_trends(&self) -> Result<Vec<Trend>>;

    async fn get_trend(&self, id: &str) -> Result<Option<Trend>>;

    /// Insert or replace a trend by id, keeping the stored like count.
    async fn save_trend(&self, trend: &Trend) -> Result<()>;

    /// Returns whether a trend was removed.
    async fn delete_trend(&self, id: &str) -> Result<bool>;

    /// Atomically add one like and return the new count.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the trend does not exist.
    async fn like_trend(&self, id: &str) -> Result<i64>;

    async fn save_post(&self, post: &Post) -> Result<()>;

    async fn remove_post(&self, id: &str) -> Result<()>;

    /// Posts in the order they were first saved.
    async fn load_posts(&self) -> Result<Vec<Post>>;

    /// Settled account states only; pending states are never written.
    async fn save_account(&self, account: &SocialAccount) -> Result<()>;

    async fn load_accounts(&self) -> Result<Vec<SocialAccount>>;
}
