use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at};
use tracing::{debug, trace};

use super::connection::Outbound;

/// Emits an end-of-line heart-beat into the outbound queue every
/// negotiated interval.
pub struct HeartbeatManager {
    interval_ms: u64,
    running: Arc<AtomicBool>,
}

impl HeartbeatManager {
    #[must_use]
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts the ticker. Returns `None` when heart-beats are disabled.
    pub fn start(
        &self,
        outbound_tx: mpsc::UnboundedSender<Outbound>,
    ) -> Option<tokio::task::JoinHandle<()>> {
        if self.interval_ms == 0 {
            return None;
        }

        let interval = Duration::from_millis(self.interval_ms);
        let running = self.running.clone();
        running.store(true, Ordering::SeqCst);

        Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);

            while running.load(Ordering::SeqCst) {
                ticker.tick().await;

                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if outbound_tx.send(Outbound::Heartbeat).is_err() {
                    debug!("Outbound queue closed, stopping heart-beats");
                    break;
                }
                trace!("Queued heart-beat");
            }
        }))
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for HeartbeatManager {
    fn drop(&mut self) {
        self.stop();
    }
}
