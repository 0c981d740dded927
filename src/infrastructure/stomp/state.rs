use std::time::Instant;

use super::constants::HEARTBEAT_TIMEOUT_MULTIPLIER;
use super::frame::Heartbeat;
use crate::domain::connection::ConnectionStatus;

/// Link bookkeeping owned by the connection loop.
#[derive(Debug)]
pub struct LinkState {
    status: ConnectionStatus,
    heartbeat: Heartbeat,
    last_received: Option<Instant>,
    connected_at: Option<Instant>,
    reconnect_attempts: u32,
}

impl LinkState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            heartbeat: Heartbeat {
                send_every_ms: 0,
                expect_every_ms: 0,
            },
            last_received: None,
            connected_at: None,
            reconnect_attempts: 0,
        }
    }

    #[must_use]
    pub const fn status(&self) -> ConnectionStatus {
        self.status
    }

    #[must_use]
    pub const fn heartbeat(&self) -> Heartbeat {
        self.heartbeat
    }

    #[must_use]
    pub const fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// First attempt reports `Connecting`; retries keep `Reconnecting`.
    pub const fn transition_to_connecting(&mut self) {
        if self.reconnect_attempts == 0 {
            self.status = ConnectionStatus::Connecting;
        }
    }

    pub fn transition_to_connected(&mut self, heartbeat: Heartbeat) {
        let now = Instant::now();
        self.status = ConnectionStatus::Connected;
        self.heartbeat = heartbeat;
        self.last_received = Some(now);
        self.connected_at = Some(now);
        self.reconnect_attempts = 0;
    }

    pub const fn transition_to_reconnecting(&mut self) -> u32 {
        self.reconnect_attempts += 1;
        self.status = ConnectionStatus::Reconnecting {
            attempt: self.reconnect_attempts,
        };
        self.last_received = None;
        self.connected_at = None;
        self.reconnect_attempts
    }

    pub const fn transition_to_error(&mut self) {
        self.status = ConnectionStatus::Error;
        self.last_received = None;
        self.connected_at = None;
    }

    pub const fn transition_to_disconnected(&mut self) {
        self.status = ConnectionStatus::Disconnected;
        self.last_received = None;
        self.connected_at = None;
        self.reconnect_attempts = 0;
    }

    /// Any inbound byte, frame or heart-beat, proves the link is alive.
    pub fn record_received(&mut self) {
        self.last_received = Some(Instant::now());
    }

    /// Milliseconds of silence when the broker has been quiet for longer
    /// than the agreed interval times the tolerance factor.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn overdue_ms(&self) -> Option<u64> {
        if self.heartbeat.expect_every_ms == 0 || !self.status.is_connected() {
            return None;
        }
        let silent_ms = self.last_received?.elapsed().as_millis() as u64;
        let limit = self.heartbeat.expect_every_ms as f64 * HEARTBEAT_TIMEOUT_MULTIPLIER;
        (silent_ms as f64 > limit).then_some(silent_ms)
    }

    /// Time since the current link reached CONNECTED.
    #[must_use]
    pub fn uptime(&self) -> Option<std::time::Duration> {
        self.connected_at.map(|start| start.elapsed())
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn expecting(ms: u64) -> Heartbeat {
        Heartbeat {
            send_every_ms: 0,
            expect_every_ms: ms,
        }
    }

    #[test]
    fn test_first_attempt_connects_then_retries_reconnect() {
        let mut state = LinkState::new();
        state.transition_to_connecting();
        assert_eq!(state.status(), ConnectionStatus::Connecting);

        assert_eq!(state.transition_to_reconnecting(), 1);
        state.transition_to_connecting();
        assert_eq!(state.status(), ConnectionStatus::Reconnecting { attempt: 1 });

        state.transition_to_connected(Heartbeat::default());
        assert!(state.status().is_connected());
        assert_eq!(state.reconnect_attempts(), 0);
        assert!(state.uptime().is_some());

        state.transition_to_reconnecting();
        assert_eq!(state.uptime(), None);
    }

    #[test]
    fn test_silence_beyond_tolerance_is_overdue() {
        let mut state = LinkState::new();
        state.transition_to_connected(expecting(2));
        std::thread::sleep(Duration::from_millis(20));
        assert!(state.overdue_ms().is_some_and(|ms| ms >= 20));

        state.record_received();
        assert_eq!(state.overdue_ms(), None);
    }

    #[test]
    fn test_disabled_or_disconnected_never_overdue() {
        let mut state = LinkState::new();
        state.transition_to_connected(expecting(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(state.overdue_ms(), None);

        state.transition_to_connected(expecting(1));
        state.transition_to_error();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(state.overdue_ms(), None);
    }
}
