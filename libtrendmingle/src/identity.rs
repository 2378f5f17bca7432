//! Identity collaborator
//!
//! The core only needs to know whether a user is present and to be able to
//! end the session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{MingleError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

#[async_trait]
pub trait Identity: Send + Sync {
    fn current_user(&self) -> Option<User>;

    async fn sign_out(&self) -> Result<()>;

    /// The signed-in user, or `Unauthenticated`.
    fn require_user(&self) -> Result<User> {
        self.current_user().ok_or(MingleError::Unauthenticated)
    }
}

/// Session held in memory; signing out forgets the user.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Arc<RwLock<Option<User>>>,
}

impl StaticIdentity {
    pub fn signed_in(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user: Arc::new(RwLock::new(Some(User {
                id: id.into(),
                email: email.into(),
            }))),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user: User) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }
}

#[async_trait]
impl Identity for StaticIdentity {
    fn current_user(&self) -> Option<User> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn sign_out(&self) -> Result<()> {
        let previous = self
            .user
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(user) = previous {
            tracing::info!(user_id = %user.id, "Signed out");
        }
        Ok(())
    }
}
