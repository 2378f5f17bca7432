//! Account service
//!
//! Drives [`SocialAccount`] transitions around the asynchronous collaborator
//! call. The book lock is never held while the collaborator runs, so readers
//! observe `connecting`/`syncing` for the whole duration and other platforms
//! stay fully usable.

use chrono::Duration;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::accounts::{AccountBook, Begin, SocialAccount, SyncOperation, Ticket};
use crate::clock::Clock;
use crate::error::{MingleError, PlatformError, Result};
use crate::service::events::{Event, EventBus};
use crate::store::RemoteStore;
use crate::sync::AccountSync;
use crate::types::Platform;

#[derive(Clone)]
pub struct AccountService {
    book: Arc<RwLock<AccountBook>>,
    sync: Arc<dyn AccountSync>,
    store: Arc<dyn RemoteStore>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    auto_sync_interval: Option<Duration>,
}

impl AccountService {
    pub fn new(
        sync: Arc<dyn AccountSync>,
        store: Arc<dyn RemoteStore>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        auto_sync_interval: Option<Duration>,
    ) -> Self {
        Self {
            book: Arc::new(RwLock::new(AccountBook::new())),
            sync,
            store,
            clock,
            events,
            auto_sync_interval,
        }
    }

    /// Overlay stored account records on the default book.
    pub async fn restore(&self) -> Result<()> {
        let stored = self.store.load_accounts().await?;
        tracing::debug!(count = stored.len(), "Restored accounts");
        *self.book.write().await = AccountBook::restore(stored);
        Ok(())
    }

    pub async fn get(&self, platform: Platform) -> SocialAccount {
        self.book.read().await.get(platform).clone()
    }

    /// All four accounts in platform order.
    pub async fn list(&self) -> Vec<SocialAccount> {
        self.book.read().await.iter().cloned().collect()
    }

    /// Change the handle of a disconnected account.
    pub async fn set_username(&self, platform: Platform, username: &str) -> Result<SocialAccount> {
        let mut book = self.book.write().await;
        let mut next = book.get(platform).clone();
        next.set_username(username)?;

        self.store.save_account(&next).await?;
        *book.get_mut(platform) = next.clone();
        Ok(next)
    }

    /// `disconnected → connecting → connected | disconnected`
    ///
    /// Calling this while the account is already pending or connected returns
    /// the current record without contacting the collaborator.
    pub async fn connect(&self, platform: Platform) -> Result<SocialAccount> {
        let (ticket, username) = {
            let mut book = self.book.write().await;
            let account = book.get_mut(platform);
            match account.begin_connect()? {
                Begin::Started(ticket) => {
                    self.announce(account);
                    (ticket, account.username().to_string())
                }
                Begin::AlreadyPending | Begin::AlreadyConnected => {
                    tracing::debug!(%platform, state = %account.state(), "Connect ignored");
                    return Ok(account.clone());
                }
            }
        };

        tracing::debug!(%platform, username = %username, "Connecting account");
        self.run(platform, SyncOperation::Connect, ticket, username)
            .await
    }

    /// `connected → syncing → connected`
    ///
    /// A failed sync keeps the connection and the previous stamp.
    pub async fn sync_now(&self, platform: Platform) -> Result<SocialAccount> {
        let (ticket, username) = {
            let mut book = self.book.write().await;
            let account = book.get_mut(platform);
            match account.begin_sync()? {
                Begin::Started(ticket) => {
                    self.announce(account);
                    (ticket, account.username().to_string())
                }
                Begin::AlreadyPending | Begin::AlreadyConnected => {
                    tracing::debug!(%platform, state = %account.state(), "Sync ignored");
                    return Ok(account.clone());
                }
            }
        };

        self.run(platform, SyncOperation::Sync, ticket, username)
            .await
    }

    /// `connected | syncing → disconnected`. A sync still in flight is discarded
    /// when it reports back.
    pub async fn disconnect(&self, platform: Platform) -> Result<SocialAccount> {
        let mut book = self.book.write().await;
        let mut next = book.get(platform).clone();
        next.disconnect()?;

        self.store.save_account(&next).await?;
        *book.get_mut(platform) = next.clone();
        self.announce(&next);
        tracing::info!(%platform, "Account disconnected");
        Ok(next)
    }

    /// Connected accounts whose last sync is at least one interval old.
    /// Empty when auto-sync is off.
    pub async fn due_for_sync(&self) -> Vec<Platform> {
        let Some(interval) = self.auto_sync_interval else {
            return Vec::new();
        };
        let now = self.clock.now();
        self.book
            .read()
            .await
            .iter()
            .filter(|account| account.is_due_for_sync(now, interval))
            .map(SocialAccount::platform)
            .collect()
    }

    /// Sync every due account concurrently.
    pub async fn sync_due(&self) -> Vec<(Platform, Result<SocialAccount>)> {
        let due = self.due_for_sync().await;
        if !due.is_empty() {
            tracing::info!(count = due.len(), "Running auto-sync");
        }
        let outcomes = join_all(due.iter().map(|&platform| self.sync_now(platform))).await;
        due.into_iter().zip(outcomes).collect()
    }

    /// Call the collaborator and settle the outcome on a spawned task, so the
    /// account leaves its pending state even if the caller stops waiting.
    async fn run(
        &self,
        platform: Platform,
        operation: SyncOperation,
        ticket: Ticket,
        username: String,
    ) -> Result<SocialAccount> {
        let service = self.clone();
        let task = tokio::spawn(async move {
            let outcome = match operation {
                SyncOperation::Connect => service.sync.connect(platform, &username).await,
                SyncOperation::Sync => service.sync.sync(platform, &username).await,
            };
            service.settle(platform, operation, ticket, outcome).await
        });

        match task.await {
            Ok(result) => result,
            Err(join_error) => {
                tracing::error!(%platform, %operation, error = %join_error, "Account task aborted");
                let aborted = PlatformError::Rejected(format!("{} task aborted: {}", operation, join_error));
                self.settle(platform, operation, ticket, Err(aborted)).await
            }
        }
    }

    async fn settle(
        &self,
        platform: Platform,
        operation: SyncOperation,
        ticket: Ticket,
        outcome: std::result::Result<(), PlatformError>,
    ) -> Result<SocialAccount> {
        let mut book = self.book.write().await;
        let account = book.get_mut(platform);

        let applied = match (&outcome, operation) {
            (Ok(()), SyncOperation::Connect) => account.complete_connect(ticket, self.clock.now()),
            (Ok(()), SyncOperation::Sync) => account.complete_sync(ticket, self.clock.now()),
            (Err(_), SyncOperation::Connect) => account.fail_connect(ticket),
            (Err(_), SyncOperation::Sync) => account.fail_sync(ticket),
        };
        let settled = account.clone();

        if !applied {
            tracing::debug!(%platform, %operation, "Discarding stale completion");
            return Ok(settled);
        }
        self.announce(&settled);

        match outcome {
            Ok(()) => {
                tracing::info!(%platform, %operation, last_synced_at = ?settled.last_synced_at(), "Account operation succeeded");
                // Store writes happen under the book lock, in commit order.
                self.store.save_account(&settled).await?;
                Ok(settled)
            }
            Err(source) => {
                drop(book);
                tracing::warn!(%platform, %operation, error = %source, "Account operation failed");
                self.events.emit(Event::AccountOperationFailed {
                    platform,
                    operation,
                    error: source.to_string(),
                });
                Err(MingleError::Sync {
                    platform,
                    operation,
                    source,
                })
            }
        }
    }

    fn announce(&self, account: &SocialAccount) {
        self.events.emit(Event::AccountStateChanged {
            platform: account.platform(),
            state: account.state(),
            last_synced_at: account.last_synced_at(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::ConnectionState;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use crate::sync::mock::MockSync;
    use chrono::{NaiveDate, NaiveDateTime};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    struct Fixture {
        service: AccountService,
        mock: MockSync,
        store: MemoryStore,
        clock: ManualClock,
    }

    fn fixture(mock: MockSync) -> Fixture {
        let store = MemoryStore::new();
        let clock = ManualClock::new(start());
        let service = AccountService::new(
            Arc::new(mock.clone()),
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
            EventBus::new(64),
            Some(Duration::hours(6)),
        );
        Fixture {
            service,
            mock,
            store,
            clock,
        }
    }

    #[tokio::test]
    async fn test_connect_with_empty_username_fails() {
        let f = fixture(MockSync::new());
        let err = f.service.connect(Platform::Twitter).await.unwrap_err();
        assert!(matches!(err, MingleError::Validation(_)));
        assert_eq!(
            f.service.get(Platform::Twitter).await.state(),
            ConnectionState::Disconnected
        );
        assert_eq!(f.mock.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_connect_then_sync_advances_stamp() {
        let f = fixture(MockSync::new());
        f.service.set_username(Platform::Twitter, "alice").await.unwrap();

        let connected = f.service.connect(Platform::Twitter).await.unwrap();
        assert_eq!(connected.state(), ConnectionState::Connected);
        assert_eq!(connected.last_synced_at(), Some(start()));

        f.clock.advance(Duration::minutes(1));
        let synced = f.service.sync_now(Platform::Twitter).await.unwrap();
        assert!(synced.last_synced_at() > connected.last_synced_at());

        let stored = f.store.load_accounts().await.unwrap();
        assert_eq!(stored, vec![synced]);
    }

    #[tokio::test]
    async fn test_failed_connect_rolls_back() {
        let mock = MockSync::new();
        mock.fail_connect(Platform::Instagram, PlatformError::Authentication("bad handle".into()));
        let f = fixture(mock);
        f.service.set_username(Platform::Instagram, "alice").await.unwrap();

        let err = f.service.connect(Platform::Instagram).await.unwrap_err();
        assert!(err.is_recoverable());
        let account = f.service.get(Platform::Instagram).await;
        assert_eq!(account.state(), ConnectionState::Disconnected);
        assert_eq!(account.username(), "alice");

        f.mock.succeed(Platform::Instagram);
        let account = f.service.connect(Platform::Instagram).await.unwrap();
        assert_eq!(account.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_failed_sync_keeps_connection() {
        let f = fixture(MockSync::new());
        f.service.set_username(Platform::Linkedin, "alice").await.unwrap();
        f.service.connect(Platform::Linkedin).await.unwrap();
        f.mock.fail_sync(Platform::Linkedin, PlatformError::Network("timeout".into()));
        f.clock.advance(Duration::minutes(5));

        let err = f.service.sync_now(Platform::Linkedin).await.unwrap_err();
        assert!(matches!(err, MingleError::Sync { operation: SyncOperation::Sync, .. }));
        let account = f.service.get(Platform::Linkedin).await;
        assert_eq!(account.state(), ConnectionState::Connected);
        assert_eq!(account.last_synced_at(), Some(start()));
    }

    #[tokio::test]
    async fn test_pending_state_is_visible_and_repeat_is_noop() {
        let f = fixture(MockSync::gated());
        f.service.set_username(Platform::Tiktok, "alice").await.unwrap();

        let task = {
            let service = f.service.clone();
            tokio::spawn(async move { service.connect(Platform::Tiktok).await })
        };
        f.mock.wait_for_calls(1).await;
        assert_eq!(
            f.service.get(Platform::Tiktok).await.state(),
            ConnectionState::Connecting
        );

        let again = f.service.connect(Platform::Tiktok).await.unwrap();
        assert_eq!(again.state(), ConnectionState::Connecting);
        assert_eq!(f.mock.connect_calls(), 1);

        // Other platforms are unaffected while one is pending.
        f.service.set_username(Platform::Twitter, "bob").await.unwrap();

        f.mock.release(1);
        let done = task.await.unwrap().unwrap();
        assert_eq!(done.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_abandoned_connect_still_settles() {
        let f = fixture(MockSync::gated());
        f.service.set_username(Platform::Twitter, "alice").await.unwrap();

        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            f.service.connect(Platform::Twitter),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(
            f.service.get(Platform::Twitter).await.state(),
            ConnectionState::Connecting
        );

        f.mock.release(1);
        while f.service.get(Platform::Twitter).await.state().is_pending() {
            tokio::task::yield_now().await;
        }

        let account = f.service.get(Platform::Twitter).await;
        assert_eq!(account.state(), ConnectionState::Connected);
        assert_eq!(account.last_synced_at(), Some(start()));
        assert_eq!(f.mock.connect_calls(), 1);

        let disconnected = f.service.disconnect(Platform::Twitter).await.unwrap();
        assert_eq!(disconnected.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_abandoned_failing_sync_rolls_back() {
        let gated = fixture(MockSync::gated());
        gated.service.set_username(Platform::Linkedin, "alice").await.unwrap();
        let connect = {
            let service = gated.service.clone();
            tokio::spawn(async move { service.connect(Platform::Linkedin).await })
        };
        gated.mock.wait_for_calls(1).await;
        gated.mock.release(1);
        connect.await.unwrap().unwrap();

        gated
            .mock
            .fail_sync(Platform::Linkedin, PlatformError::Network("timeout".into()));
        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            gated.service.sync_now(Platform::Linkedin),
        )
        .await;
        assert!(abandoned.is_err());

        gated.mock.release(1);
        while gated.service.get(Platform::Linkedin).await.state().is_pending() {
            tokio::task::yield_now().await;
        }
        let account = gated.service.get(Platform::Linkedin).await;
        assert_eq!(account.state(), ConnectionState::Connected);
        assert_eq!(account.last_synced_at(), Some(start()));
    }

    #[tokio::test]
    async fn test_disconnect_during_sync_discards_result() {
        let f = fixture(MockSync::gated());
        f.service.set_username(Platform::Twitter, "alice").await.unwrap();
        f.mock.release(1);
        f.service.connect(Platform::Twitter).await.unwrap();

        let task = {
            let service = f.service.clone();
            tokio::spawn(async move { service.sync_now(Platform::Twitter).await })
        };
        f.mock.wait_for_calls(2).await;
        let disconnected = f.service.disconnect(Platform::Twitter).await.unwrap();
        assert_eq!(disconnected.last_synced_at(), None);

        f.mock.release(1);
        let late = task.await.unwrap().unwrap();
        assert_eq!(late.state(), ConnectionState::Disconnected);
        assert_eq!(f.service.get(Platform::Twitter).await.last_synced_at(), None);
        assert_eq!(
            f.store.load_accounts().await.unwrap()[0].state(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_disconnect_requires_connection() {
        let f = fixture(MockSync::new());
        assert!(matches!(
            f.service.disconnect(Platform::Instagram).await,
            Err(MingleError::InvalidTransition { .. })
        ));
        assert!(f.store.load_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_due_runs_only_stale_accounts() {
        let f = fixture(MockSync::new());
        for platform in [Platform::Twitter, Platform::Instagram] {
            f.service.set_username(platform, "alice").await.unwrap();
            f.service.connect(platform).await.unwrap();
        }
        assert!(f.service.due_for_sync().await.is_empty());

        f.clock.advance(Duration::hours(6));
        f.service.sync_now(Platform::Instagram).await.unwrap();
        assert_eq!(f.service.due_for_sync().await, vec![Platform::Twitter]);

        let results = f.service.sync_due().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].1.is_ok());
        assert!(f.service.due_for_sync().await.is_empty());
    }

    #[tokio::test]
    async fn test_auto_sync_disabled() {
        let mock = MockSync::new();
        let service = AccountService::new(
            Arc::new(mock),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(start())),
            EventBus::new(8),
            None,
        );
        service.set_username(Platform::Twitter, "alice").await.unwrap();
        service.connect(Platform::Twitter).await.unwrap();
        assert!(service.due_for_sync().await.is_empty());
        assert!(service.sync_due().await.is_empty());
    }

    #[tokio::test]
    async fn test_restore_from_store() {
        let f = fixture(MockSync::new());
        f.service.set_username(Platform::Linkedin, "alice").await.unwrap();
        f.service.connect(Platform::Linkedin).await.unwrap();

        let reopened = AccountService::new(
            Arc::new(MockSync::new()),
            Arc::new(f.store.clone()),
            Arc::new(f.clock.clone()),
            EventBus::new(8),
            None,
        );
        reopened.restore().await.unwrap();
        let account = reopened.get(Platform::Linkedin).await;
        assert_eq!(account.state(), ConnectionState::Connected);
        assert_eq!(account.username(), "alice");
        assert_eq!(reopened.list().await.len(), 4);
    }
}
