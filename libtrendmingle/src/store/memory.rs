//! In-process store, used when no database is configured and in tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::accounts::SocialAccount;
use crate::error::{MingleError, Result};
use crate::store::{Profile, RemoteStore, Trend};
use crate::types::{Platform, Post};

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<String, Profile>,
    trends: HashMap<String, Trend>,
    /// Creation order; updates replace in place.
    posts: Vec<Post>,
    accounts: HashMap<Platform, SocialAccount>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(id).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn list_trends(&self) -> Result<Vec<Trend>> {
        let mut trends: Vec<Trend> = self.tables.read().await.trends.values().cloned().collect();
        trends.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(trends)
    }

    async fn get_trend(&self, id: &str) -> Result<Option<Trend>> {
        Ok(self.tables.read().await.trends.get(id).cloned())
    }

    async fn save_trend(&self, trend: &Trend) -> Result<()> {
        let mut tables = self.tables.write().await;
        let likes = tables
            .trends
            .get(&trend.id)
            .map_or(trend.likes, |existing| existing.likes);
        let mut stored = trend.clone();
        stored.likes = likes;
        tables.trends.insert(stored.id.clone(), stored);
        Ok(())
    }

    async fn delete_trend(&self, id: &str) -> Result<bool> {
        Ok(self.tables.write().await.trends.remove(id).is_some())
    }

    async fn like_trend(&self, id: &str) -> Result<i64> {
        let mut tables = self.tables.write().await;
        let trend = tables
            .trends
            .get_mut(id)
            .ok_or_else(|| MingleError::not_found("Trend", id))?;
        trend.likes += 1;
        Ok(trend.likes)
    }

    async fn save_post(&self, post: &Post) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.posts.iter_mut().find(|stored| stored.id() == post.id()) {
            Some(stored) => *stored = post.clone(),
            None => tables.posts.push(post.clone()),
        }
        Ok(())
    }

    async fn remove_post(&self, id: &str) -> Result<()> {
        self.tables.write().await.posts.retain(|post| post.id() != id);
        Ok(())
    }

    async fn load_posts(&self) -> Result<Vec<Post>> {
        Ok(self.tables.read().await.posts.clone())
    }

    async fn save_account(&self, account: &SocialAccount) -> Result<()> {
        self.tables
            .write()
            .await
            .accounts
            .insert(account.platform(), account.clone());
        Ok(())
    }

    async fn load_accounts(&self) -> Result<Vec<SocialAccount>> {
        let mut accounts: Vec<SocialAccount> =
            self.tables.read().await.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.platform());
        Ok(accounts)
    }
}
