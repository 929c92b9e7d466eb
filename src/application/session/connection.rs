//! One station's live socket, as seen by the rest of the gateway

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc::{self, error::SendError};

/// Instruction for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Serialized OCPP frame, written as a text message
    Frame(String),
    Close,
}

#[derive(Debug)]
pub struct Connection {
    /// Distinguishes a reconnect from the socket it replaced
    pub connection_id: u64,
    pub station_code: String,
    pub sender: mpsc::UnboundedSender<Outbound>,
    pub remote_addr: Option<String>,
    pub connected_at: DateTime<Utc>,
    /// Last inbound frame
    pub last_activity: DateTime<Utc>,
}

/// Snapshot of a registered connection
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub connection_id: u64,
    pub station_code: String,
    pub remote_addr: Option<String>,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl From<&Connection> for SessionInfo {
    fn from(conn: &Connection) -> Self {
        Self {
            connection_id: conn.connection_id,
            station_code: conn.station_code.clone(),
            remote_addr: conn.remote_addr.clone(),
            connected_at: conn.connected_at,
            last_activity: conn.last_activity,
        }
    }
}

impl Connection {
    pub fn new(
        connection_id: u64,
        station_code: impl Into<String>,
        sender: mpsc::UnboundedSender<Outbound>,
        remote_addr: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            connection_id,
            station_code: station_code.into(),
            sender,
            remote_addr,
            connected_at: now,
            last_activity: now,
        }
    }

    /// Fails once the writer task has exited, handing the frame back.
    pub fn send(&self, frame: String) -> Result<(), SendError<Outbound>> {
        self.sender.send(Outbound::Frame(frame))
    }

    pub fn close(&self) {
        let _ = self.sender.send(Outbound::Close);
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_activity = at;
    }

    pub fn silent_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_activity
    }

    pub(crate) fn info(&self) -> SessionInfo {
        SessionInfo::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station() -> (Connection, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(7, "ST-001", tx, Some("10.0.0.5:40000".into())), rx)
    }

    #[test]
    fn frames_and_close_reach_the_writer_in_order() {
        let (conn, mut rx) = station();
        conn.send("[2,\"a\",\"Reset\",{}]".into()).unwrap();
        conn.close();

        assert_eq!(rx.try_recv().unwrap(), Outbound::Frame("[2,\"a\",\"Reset\",{}]".into()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
    }

    #[test]
    fn send_after_writer_exit_returns_the_frame() {
        let (conn, rx) = station();
        drop(rx);
        let err = conn.send("late".into()).unwrap_err();
        assert_eq!(err.0, Outbound::Frame("late".into()));
    }

    #[test]
    fn silence_follows_last_activity() {
        let (mut conn, _rx) = station();
        let now = Utc::now();
        conn.touch(now - Duration::seconds(10));
        assert_eq!(conn.silent_for(now), Duration::seconds(10));

        conn.touch(now);
        assert_eq!(conn.silent_for(now), Duration::zero());
    }

    #[test]
    fn info_copies_identity() {
        let (conn, _rx) = station();
        let info = conn.info();
        assert_eq!(info.connection_id, 7);
        assert_eq!(info.station_code, "ST-001");
        assert_eq!(info.remote_addr.as_deref(), Some("10.0.0.5:40000"));
    }
}
