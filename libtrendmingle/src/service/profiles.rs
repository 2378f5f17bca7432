//! Profile service: the signed-in user's own profile record

use chrono::Utc;
use std::sync::Arc;

use crate::error::{MingleError, Result};
use crate::identity::Identity;
use crate::store::{Profile, ProfileUpdate, RemoteStore};

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn RemoteStore>,
    identity: Arc<dyn Identity>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn RemoteStore>, identity: Arc<dyn Identity>) -> Self {
        Self { store, identity }
    }

    /// The current user's profile, created from their identity on first use.
    pub async fn current(&self) -> Result<Profile> {
        let user = self.identity.require_user()?;
        if let Some(profile) = self.store.get_profile(&user.id).await? {
            return Ok(profile);
        }

        let now = Utc::now();
        let profile = Profile {
            id: user.id,
            email: user.email,
            full_name: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        self.store.upsert_profile(&profile).await?;
        tracing::info!(user_id = %profile.id, "Created profile");
        Ok(profile)
    }

    pub async fn update(&self, update: ProfileUpdate) -> Result<Profile> {
        if let Some(name) = &update.full_name {
            if name.trim().is_empty() {
                return Err(MingleError::Validation(
                    "Full name cannot be blank".to_string(),
                ));
            }
        }

        let mut profile = self.current().await?;
        profile.apply(update, Utc::now());
        self.store.upsert_profile(&profile).await?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_profile_created_then_updated() {
        let store = MemoryStore::new();
        let service = ProfileService::new(
            Arc::new(store.clone()),
            Arc::new(StaticIdentity::signed_in("u1", "ana@example.com")),
        );

        let created = service.current().await.unwrap();
        assert_eq!(created.email, "ana@example.com");
        assert_eq!(service.current().await.unwrap(), created);

        let updated = service
            .update(ProfileUpdate {
                full_name: Some("Ana Lima".to_string()),
                avatar_url: None,
            })
            .await
            .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Ana Lima"));
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(store.get_profile("u1").await.unwrap(), Some(updated));

        assert!(service
            .update(ProfileUpdate {
                full_name: Some("  ".to_string()),
                avatar_url: None,
            })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_requires_user() {
        let service = ProfileService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(StaticIdentity::anonymous()),
        );
        assert!(matches!(
            service.current().await,
            Err(MingleError::Unauthenticated)
        ));
    }
}
