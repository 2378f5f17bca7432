//! Mock account collaborator for testing
//!
//! Records every call, returns scripted per-platform failures, and can hold
//! operations in flight until the test releases them. Clones share state, so
//! a test keeps one handle while the service owns another.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

use crate::accounts::SyncOperation;
use crate::error::PlatformError;
use crate::sync::{AccountSync, SyncResult};
use crate::types::Platform;

#[derive(Debug, Default)]
struct MockState {
    connect_calls: usize,
    sync_calls: usize,
    calls: Vec<(SyncOperation, Platform, String)>,
    connect_errors: HashMap<Platform, PlatformError>,
    sync_errors: HashMap<Platform, PlatformError>,
}

#[derive(Debug, Clone, Default)]
pub struct MockSync {
    state: Arc<Mutex<MockState>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockSync {
    /// Collaborator that succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collaborator whose operations block until [`MockSync::release`] is called.
    pub fn gated() -> Self {
        Self {
            state: Arc::default(),
            gate: Some(Arc::new(Semaphore::new(0))),
        }
    }

    /// Let `n` held operations finish.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn fail_connect(&self, platform: Platform, error: PlatformError) {
        self.lock().connect_errors.insert(platform, error);
    }

    pub fn fail_sync(&self, platform: Platform, error: PlatformError) {
        self.lock().sync_errors.insert(platform, error);
    }

    /// Clear scripted failures for `platform`.
    pub fn succeed(&self, platform: Platform) {
        let mut state = self.lock();
        state.connect_errors.remove(&platform);
        state.sync_errors.remove(&platform);
    }

    pub fn connect_calls(&self) -> usize {
        self.lock().connect_calls
    }

    pub fn sync_calls(&self) -> usize {
        self.lock().sync_calls
    }

    pub fn calls(&self) -> Vec<(SyncOperation, Platform, String)> {
        self.lock().calls.clone()
    }

    /// Yield until at least `n` operations have started.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.lock().calls.len() < n {
            tokio::task::yield_now().await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(&self, operation: SyncOperation, platform: Platform, username: &str) -> SyncResult {
        {
            let mut state = self.lock();
            match operation {
                SyncOperation::Connect => state.connect_calls += 1,
                SyncOperation::Sync => state.sync_calls += 1,
            }
            state
                .calls
                .push((operation, platform, username.to_string()));
        }

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let state = self.lock();
        let scripted = match operation {
            SyncOperation::Connect => state.connect_errors.get(&platform),
            SyncOperation::Sync => state.sync_errors.get(&platform),
        };
        match scripted {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AccountSync for MockSync {
    async fn connect(&self, platform: Platform, username: &str) -> SyncResult {
        self.run(SyncOperation::Connect, platform, username).await
    }

    async fn sync(&self, platform: Platform, username: &str) -> SyncResult {
        self.run(SyncOperation::Sync, platform, username).await
    }
}
