//! Social account connection state machine
//!
//! ```text
//! disconnected ──connect──▶ connecting ──ok──▶ connected ──sync──▶ syncing
//!      ▲                        │ err              ▲  │               │
//!      └────────────────────────┘                  │  └─disconnect─┐  │ ok / err
//!      ▲                                           └───────────────┼──┘
//!      └───────────────────────────disconnect──────────────────────┘
//! ```
//!
//! The transitions here are pure. [`crate::service::accounts::AccountService`]
//! drives them around the asynchronous collaborator call. Each started
//! operation hands out a [`Ticket`]; completions carrying a stale ticket are
//! ignored, so a sync that finishes after a disconnect cannot revive the
//! connection.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MingleError, Result};
use crate::types::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Syncing,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Syncing => "syncing",
        }
    }

    /// An external operation is in flight.
    pub fn is_pending(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Syncing)
    }

    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Syncing)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Connect,
    Sync,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOperation::Connect => f.write_str("connect"),
            SyncOperation::Sync => f.write_str("sync"),
        }
    }
}

/// Identifies one started connect or sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Result of asking an account to start an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Begin {
    Started(Ticket),
    /// Another connect or sync is already in flight; nothing changed.
    AlreadyPending,
    /// `connect` on an account that is already connected; nothing changed.
    AlreadyConnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocialAccount {
    platform: Platform,
    username: String,
    state: ConnectionState,
    last_synced_at: Option<NaiveDateTime>,
    #[serde(skip)]
    epoch: u64,
}

impl SocialAccount {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            username: String::new(),
            state: ConnectionState::Disconnected,
            last_synced_at: None,
            epoch: 0,
        }
    }

    /// Rebuild an account from stored fields.
    ///
    /// Pending states cannot outlive the process that started them, so they
    /// restore as the state they would roll back to.
    pub fn restore(
        platform: Platform,
        username: String,
        state: ConnectionState,
        last_synced_at: Option<NaiveDateTime>,
    ) -> Self {
        let state = match state {
            ConnectionState::Connecting => ConnectionState::Disconnected,
            ConnectionState::Syncing => ConnectionState::Connected,
            settled => settled,
        };
        let last_synced_at = if state.is_connected() {
            last_synced_at
        } else {
            None
        };
        Self {
            platform,
            username,
            state,
            last_synced_at,
            epoch: 0,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn last_synced_at(&self) -> Option<NaiveDateTime> {
        self.last_synced_at
    }

    pub fn set_username(&mut self, username: impl Into<String>) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            return Err(self.rejected("change the username of"));
        }
        self.username = username.into();
        Ok(())
    }

    pub fn begin_connect(&mut self) -> Result<Begin> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Syncing => Ok(Begin::AlreadyPending),
            ConnectionState::Connected => Ok(Begin::AlreadyConnected),
            ConnectionState::Disconnected => {
                if self.username.trim().is_empty() {
                    return Err(MingleError::Validation(format!(
                        "username required to connect {}",
                        self.platform.label()
                    )));
                }
                self.state = ConnectionState::Connecting;
                Ok(Begin::Started(self.next_ticket()))
            }
        }
    }

    /// `connecting → connected`. Returns false if the ticket is stale.
    pub fn complete_connect(&mut self, ticket: Ticket, now: NaiveDateTime) -> bool {
        if !self.holds(ticket, ConnectionState::Connecting) {
            return false;
        }
        self.state = ConnectionState::Connected;
        self.last_synced_at = Some(now);
        true
    }

    /// `connecting → disconnected`, keeping the username for a retry.
    pub fn fail_connect(&mut self, ticket: Ticket) -> bool {
        if !self.holds(ticket, ConnectionState::Connecting) {
            return false;
        }
        self.state = ConnectionState::Disconnected;
        true
    }

    pub fn begin_sync(&mut self) -> Result<Begin> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Syncing => Ok(Begin::AlreadyPending),
            ConnectionState::Disconnected => Err(self.rejected("sync")),
            ConnectionState::Connected => {
                self.state = ConnectionState::Syncing;
                Ok(Begin::Started(self.next_ticket()))
            }
        }
    }

    /// `syncing → connected` with a fresh stamp. The stamp never moves backwards.
    pub fn complete_sync(&mut self, ticket: Ticket, now: NaiveDateTime) -> bool {
        if !self.holds(ticket, ConnectionState::Syncing) {
            return false;
        }
        self.state = ConnectionState::Connected;
        self.last_synced_at = Some(match self.last_synced_at {
            Some(previous) if previous > now => previous,
            _ => now,
        });
        true
    }

    /// `syncing → connected`; a failed sync never drops the connection.
    pub fn fail_sync(&mut self, ticket: Ticket) -> bool {
        if !self.holds(ticket, ConnectionState::Syncing) {
            return false;
        }
        self.state = ConnectionState::Connected;
        true
    }

    /// `connected | syncing → disconnected`. The username is kept.
    pub fn disconnect(&mut self) -> Result<()> {
        if !self.state.is_connected() {
            return Err(self.rejected("disconnect"));
        }
        self.state = ConnectionState::Disconnected;
        self.last_synced_at = None;
        // Invalidates the ticket of any sync still in flight.
        self.epoch += 1;
        Ok(())
    }

    /// Connected, idle, and last synced at least `interval` ago.
    pub fn is_due_for_sync(&self, now: NaiveDateTime, interval: Duration) -> bool {
        if self.state != ConnectionState::Connected {
            return false;
        }
        match self.last_synced_at {
            Some(last) => now - last >= interval,
            None => true,
        }
    }

    fn next_ticket(&mut self) -> Ticket {
        self.epoch += 1;
        Ticket(self.epoch)
    }

    fn holds(&self, ticket: Ticket, state: ConnectionState) -> bool {
        self.state == state && ticket.0 == self.epoch
    }

    fn rejected(&self, action: &'static str) -> MingleError {
        MingleError::invalid_transition(format!("{} account", self.platform), action, self.state)
    }
}

/// One account record per platform, all starting disconnected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBook {
    accounts: [SocialAccount; 4],
}

impl Default for AccountBook {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountBook {
    pub fn new() -> Self {
        Self {
            accounts: Platform::ALL.map(SocialAccount::new),
        }
    }

    /// Start from defaults and overlay stored records.
    pub fn restore(stored: impl IntoIterator<Item = SocialAccount>) -> Self {
        let mut book = Self::new();
        for account in stored {
            let slot = slot(account.platform);
            book.accounts[slot] = account;
        }
        book
    }

    pub fn get(&self, platform: Platform) -> &SocialAccount {
        &self.accounts[slot(platform)]
    }

    pub fn get_mut(&mut self, platform: Platform) -> &mut SocialAccount {
        &mut self.accounts[slot(platform)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &SocialAccount> {
        self.accounts.iter()
    }
}

fn slot(platform: Platform) -> usize {
    match platform {
        Platform::Instagram => 0,
        Platform::Twitter => 1,
        Platform::Linkedin => 2,
        Platform::Tiktok => 3,
    }
}
