//! Session registry: the live WebSocket connection of each station

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::connection::{Connection, Outbound, SessionInfo};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Station {0} is not connected")]
    NotConnected(String),

    #[error("Connection to station {0} is closing")]
    Closed(String),
}

/// Outcome of attaching a connection.
#[derive(Debug)]
pub struct RegisterResult {
    pub connection_id: u64,
    /// The previous connection for the same code, already told to close.
    pub evicted: Option<SessionInfo>,
}

/// Thread-safe registry of active station sessions, at most one per code
pub struct SessionRegistry {
    sessions: DashMap<String, Connection>,
    next_id: AtomicU64,
}

/// Shared, reference-counted session registry
pub type SharedSessionRegistry = Arc<SessionRegistry>;

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Wrap in `Arc` for shared ownership
    pub fn shared() -> SharedSessionRegistry {
        Arc::new(Self::new())
    }

    /// Register a connection for `station_code`, replacing and closing any
    /// connection already registered under that code.
    pub fn attach(
        &self,
        station_code: &str,
        sender: mpsc::UnboundedSender<Outbound>,
        remote_addr: Option<String>,
    ) -> RegisterResult {
        let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let connection = Connection::new(connection_id, station_code, sender, remote_addr);

        let evicted = self
            .sessions
            .insert(station_code.to_string(), connection)
            .map(|old| {
                old.close();
                old.info()
            });

        match &evicted {
            Some(old) => warn!(
                station_code,
                connection_id,
                evicted_connection_id = old.connection_id,
                "Replaced existing station session"
            ),
            None => info!(station_code, connection_id, "Registered station session"),
        }

        RegisterResult {
            connection_id,
            evicted,
        }
    }

    /// Remove the session only if it still belongs to `connection_id`.
    /// Returns `false` when a newer connection has taken the code over.
    pub fn detach(&self, station_code: &str, connection_id: u64) -> bool {
        let removed = self
            .sessions
            .remove_if(station_code, |_, conn| conn.connection_id == connection_id)
            .is_some();
        if removed {
            info!(station_code, connection_id, "Unregistered station session");
        } else {
            debug!(station_code, connection_id, "Session already replaced, nothing to detach");
        }
        removed
    }

    /// Queue a frame for a station's writer task
    pub fn send_to(&self, station_code: &str, frame: String) -> Result<(), SessionError> {
        match self.sessions.get(station_code) {
            Some(conn) => conn
                .send(frame)
                .map_err(|_| SessionError::Closed(station_code.to_string())),
            None => Err(SessionError::NotConnected(station_code.to_string())),
        }
    }

    /// Ask a station's connection to close. The entry is removed by the
    /// connection task once the socket is gone.
    pub fn close(&self, station_code: &str) -> bool {
        match self.sessions.get(station_code) {
            Some(conn) => {
                conn.close();
                true
            }
            None => false,
        }
    }

    /// Record inbound activity on one connection. A replaced connection that
    /// is still draining frames does not refresh its successor.
    pub fn touch(&self, station_code: &str, connection_id: u64, at: DateTime<Utc>) -> bool {
        match self.sessions.get_mut(station_code) {
            Some(mut conn) if conn.connection_id == connection_id => {
                conn.touch(at);
                true
            }
            _ => false,
        }
    }

    pub fn is_connected(&self, station_code: &str) -> bool {
        self.sessions.contains_key(station_code)
    }

    /// Snapshot of the connection registered for a code
    pub fn lookup(&self, station_code: &str) -> Option<SessionInfo> {
        self.sessions.get(station_code).map(|c| c.info())
    }

    /// Id of the connection currently registered for a code
    pub fn connection_id(&self, station_code: &str) -> Option<u64> {
        self.sessions.get(station_code).map(|c| c.connection_id)
    }

    /// Codes whose connection has had no inbound frame for longer than
    /// `timeout_seconds` at `now`
    pub fn stale_connections(&self, timeout_seconds: i64, now: DateTime<Utc>) -> Vec<String> {
        let limit = Duration::seconds(timeout_seconds);
        self.sessions
            .iter()
            .filter(|r| r.silent_for(now) > limit)
            .map(|r| r.key().clone())
            .collect()
    }

    /// Number of active sessions
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
