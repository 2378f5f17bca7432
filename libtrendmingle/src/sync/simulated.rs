//! Fixed-latency collaborator used when no real platform API is wired in

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::SyncConfig;
use crate::error::Result;
use crate::sync::{AccountSync, SyncResult};
use crate::types::Platform;

#[derive(Debug, Clone)]
pub struct SimulatedSync {
    connect_delay: Duration,
    sync_delay: Duration,
}

impl SimulatedSync {
    pub fn new(connect_delay: Duration, sync_delay: Duration) -> Self {
        Self {
            connect_delay,
            sync_delay,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Ok(Self::new(config.connect_delay()?, config.sync_delay()?))
    }
}

impl Default for SimulatedSync {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500), Duration::from_millis(1500))
    }
}

#[async_trait]
impl AccountSync for SimulatedSync {
    async fn connect(&self, platform: Platform, username: &str) -> SyncResult {
        tracing::debug!(%platform, username, delay = ?self.connect_delay, "Simulating connect");
        sleep(self.connect_delay).await;
        Ok(())
    }

    async fn sync(&self, platform: Platform, username: &str) -> SyncResult {
        tracing::debug!(%platform, username, delay = ?self.sync_delay, "Simulating sync");
        sleep(self.sync_delay).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_from_config() {
        let config = SyncConfig {
            connect_delay: "5ms".to_string(),
            sync_delay: "7ms".to_string(),
            ..Default::default()
        };
        let sync = SimulatedSync::from_config(&config).unwrap();
        assert_eq!(sync.connect_delay, Duration::from_millis(5));
        assert_eq!(sync.sync_delay, Duration::from_millis(7));
    }

    #[tokio::test]
    async fn test_waits_for_delay_then_succeeds() {
        let sync = SimulatedSync::new(Duration::from_millis(20), Duration::ZERO);
        let started = Instant::now();
        sync.connect(Platform::Twitter, "alice").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
        sync.sync(Platform::Twitter, "alice").await.unwrap();
    }
}
