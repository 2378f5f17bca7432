//! Account synchronization collaborator
//!
//! The connection state machine treats the remote platform as a black box
//! that either accepts or rejects a connect or sync request after some delay.
//! [`AccountSync`] is that box. [`simulated::SimulatedSync`] reproduces the
//! dashboard's fixed-latency behaviour; [`mock::MockSync`] lets tests script
//! failures and hold an operation in flight.

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::types::Platform;

pub mod simulated;

// Available in all builds so integration tests can drive it
pub mod mock;

pub type SyncResult = std::result::Result<(), PlatformError>;

#[async_trait]
pub trait AccountSync: Send + Sync {
    /// Establish a connection for `username` on `platform`.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` when the handle is refused,
    /// or a network-class error when the platform cannot be reached.
    async fn connect(&self, platform: Platform, username: &str) -> SyncResult;

    /// Pull fresh data for an established connection.
    async fn sync(&self, platform: Platform, username: &str) -> SyncResult;
}
