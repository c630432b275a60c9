//! Background eviction of idle sessions and stale rate-limit windows.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::broadcast;

use crate::security::RateLimiter;
use crate::session::MemorySessionStore;

pub struct Sweeper {
    sessions: MemorySessionStore,
    limiter: Arc<RateLimiter>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(sessions: MemorySessionStore, limiter: Arc<RateLimiter>, interval: Duration) -> Self {
        Self {
            sessions,
            limiter,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Sweeper starting");

        let mut ticker = tokio::time::interval(self.interval);
        // The first tick completes immediately; nothing to sweep yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one eviction pass. Returns (sessions, rate-limit keys) removed.
    pub fn sweep_once(&self) -> (usize, usize) {
        let sessions = self.sessions.sweep(OffsetDateTime::now_utc());
        let windows = self.limiter.sweep();
        if sessions > 0 || windows > 0 {
            tracing::debug!(sessions, windows, "Swept expired state");
        }
        (sessions, windows)
    }
}
