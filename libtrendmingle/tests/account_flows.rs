//! Account connection flows through the service facade
//!
//! Uses the gated mock collaborator so tests can observe the pending states
//! while an operation is in flight.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::sync::Arc;

use libtrendmingle::clock::ManualClock;
use libtrendmingle::error::PlatformError;
use libtrendmingle::identity::StaticIdentity;
use libtrendmingle::service::events::Event;
use libtrendmingle::store::{MemoryStore, RemoteStore};
use libtrendmingle::sync::mock::MockSync;
use libtrendmingle::{ConnectionState, MingleError, MingleService, Platform, ServiceParts};

fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

struct Harness {
    service: Arc<MingleService>,
    sync: MockSync,
    store: MemoryStore,
    clock: Arc<ManualClock>,
}

async fn harness(sync: MockSync) -> Harness {
    let store = MemoryStore::new();
    let clock = Arc::new(ManualClock::new(noon()));
    let parts = ServiceParts::new(
        Arc::new(store.clone()),
        Arc::new(sync.clone()),
        Arc::new(StaticIdentity::signed_in("user-1", "ana@example.com")),
        clock.clone(),
    );
    let service = MingleService::from_parts(parts).await.unwrap();
    for platform in Platform::ALL {
        service
            .accounts()
            .set_username(platform, &format!("ana_{}", platform.as_str()))
            .await
            .unwrap();
    }
    Harness {
        service: Arc::new(service),
        sync,
        store,
        clock,
    }
}

#[tokio::test]
async fn test_connect_is_observable_while_pending() {
    let h = harness(MockSync::gated()).await;

    let task = {
        let service = Arc::clone(&h.service);
        tokio::spawn(async move { service.accounts().connect(Platform::Twitter).await })
    };
    h.sync.wait_for_calls(1).await;

    assert_eq!(
        h.service.accounts().get(Platform::Twitter).await.state(),
        ConnectionState::Connecting
    );
    // Other platforms stay usable while Twitter is in flight.
    assert_eq!(
        h.service.accounts().get(Platform::Instagram).await.state(),
        ConnectionState::Disconnected
    );

    h.sync.release(1);
    let account = task.await.unwrap().unwrap();
    assert_eq!(account.state(), ConnectionState::Connected);
    assert_eq!(account.last_synced_at(), Some(noon()));
}

#[tokio::test]
async fn test_repeated_connect_while_pending_is_ignored() {
    let h = harness(MockSync::gated()).await;

    let task = {
        let service = Arc::clone(&h.service);
        tokio::spawn(async move { service.accounts().connect(Platform::Linkedin).await })
    };
    h.sync.wait_for_calls(1).await;

    let again = h.service.accounts().connect(Platform::Linkedin).await.unwrap();
    assert_eq!(again.state(), ConnectionState::Connecting);
    assert_eq!(h.sync.connect_calls(), 1);

    h.sync.release(1);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_failed_connect_rolls_back_and_reports() {
    let h = harness(MockSync::new()).await;
    let mut events = h.service.subscribe();
    h.sync.fail_connect(
        Platform::Tiktok,
        PlatformError::Authentication("bad token".to_string()),
    );

    let result = h.service.accounts().connect(Platform::Tiktok).await;
    match result {
        Err(error @ MingleError::Sync { .. }) => assert!(error.is_recoverable()),
        other => panic!("expected sync error, got {:?}", other),
    }

    let account = h.service.accounts().get(Platform::Tiktok).await;
    assert_eq!(account.state(), ConnectionState::Disconnected);
    assert_eq!(account.username(), "ana_tiktok");

    let mut saw_failure = false;
    while let Ok(event) = events.try_recv() {
        if let Event::AccountOperationFailed { platform, .. } = event {
            assert_eq!(platform, Platform::Tiktok);
            saw_failure = true;
        }
    }
    assert!(saw_failure);

    h.sync.succeed(Platform::Tiktok);
    let retried = h.service.accounts().connect(Platform::Tiktok).await.unwrap();
    assert_eq!(retried.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_failed_sync_keeps_connection_and_stamp() {
    let h = harness(MockSync::new()).await;
    h.service.accounts().connect(Platform::Instagram).await.unwrap();

    h.clock.advance(Duration::hours(1));
    h.sync.fail_sync(
        Platform::Instagram,
        PlatformError::Network("timeout".to_string()),
    );
    assert!(h.service.accounts().sync_now(Platform::Instagram).await.is_err());

    let account = h.service.accounts().get(Platform::Instagram).await;
    assert_eq!(account.state(), ConnectionState::Connected);
    assert_eq!(account.last_synced_at(), Some(noon()));
}

#[tokio::test]
async fn test_disconnect_discards_sync_in_flight() {
    let h = harness(MockSync::gated()).await;

    let connect = {
        let service = Arc::clone(&h.service);
        tokio::spawn(async move { service.accounts().connect(Platform::Twitter).await })
    };
    h.sync.wait_for_calls(1).await;
    h.sync.release(1);
    connect.await.unwrap().unwrap();

    let sync = {
        let service = Arc::clone(&h.service);
        tokio::spawn(async move { service.accounts().sync_now(Platform::Twitter).await })
    };
    h.sync.wait_for_calls(2).await;
    assert_eq!(
        h.service.accounts().get(Platform::Twitter).await.state(),
        ConnectionState::Syncing
    );

    h.service.accounts().disconnect(Platform::Twitter).await.unwrap();
    h.sync.release(1);
    let late = sync.await.unwrap().unwrap();

    assert_eq!(late.state(), ConnectionState::Disconnected);
    assert_eq!(late.last_synced_at(), None);

    let stored = h.store.load_accounts().await.unwrap();
    let twitter = stored
        .iter()
        .find(|a| a.platform() == Platform::Twitter)
        .unwrap();
    assert_eq!(twitter.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_auto_sync_picks_stale_accounts() {
    let h = harness(MockSync::new()).await;
    h.service.accounts().connect(Platform::Instagram).await.unwrap();
    h.clock.advance(Duration::hours(5));
    h.service.accounts().connect(Platform::Linkedin).await.unwrap();

    h.clock.advance(Duration::hours(2));
    assert_eq!(
        h.service.accounts().due_for_sync().await,
        vec![Platform::Instagram]
    );

    let outcomes = h.service.accounts().sync_due().await;
    assert_eq!(outcomes.len(), 1);
    let (platform, result) = &outcomes[0];
    assert_eq!(*platform, Platform::Instagram);
    assert_eq!(
        result.as_ref().unwrap().last_synced_at(),
        Some(noon() + Duration::hours(7))
    );
    assert!(h.service.accounts().due_for_sync().await.is_empty());
}

#[tokio::test]
async fn test_username_locked_while_connected() {
    let h = harness(MockSync::new()).await;
    h.service.accounts().connect(Platform::Twitter).await.unwrap();

    assert!(matches!(
        h.service
            .accounts()
            .set_username(Platform::Twitter, "someone_else")
            .await,
        Err(MingleError::InvalidTransition { .. })
    ));
    assert!(matches!(
        h.service.accounts().disconnect(Platform::Linkedin).await,
        Err(MingleError::InvalidTransition { .. })
    ));
}
