//! Waiting out detached session terminations before exit
//!
//! The runtime runs the terminator on a detached task. A one-shot process
//! would drop that task on exit, so the logout call would never be sent.
//! `DrainingTerminator` counts terminations in flight and lets `main` wait
//! for them, bounded by `DRAIN_TIMEOUT`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use auth_runtime::{SessionTerminator, TerminationReason};
use tokio::sync::Notify;
use tracing::warn;

pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DrainingTerminator {
    inner: Arc<dyn SessionTerminator>,
    in_flight: AtomicU64,
    idle: Notify,
}

impl DrainingTerminator {
    pub fn new(inner: Arc<dyn SessionTerminator>) -> Self {
        Self {
            inner,
            in_flight: AtomicU64::new(0),
            idle: Notify::new(),
        }
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until no termination is running, or `timeout` elapses.
    ///
    /// Returns false on timeout.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let idle = self.idle.notified();
                if self.in_flight() == 0 {
                    return;
                }
                idle.await;
            }
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    remaining = self.in_flight(),
                    drain_timeout_secs = timeout.as_secs(),
                    "drain timeout exceeded, exiting before session termination finished"
                );
                false
            }
        }
    }
}

impl SessionTerminator for DrainingTerminator {
    fn terminate(&self, reason: TerminationReason) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            self.inner.terminate(reason).await;
            if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
                self.idle.notify_waiters();
            }
        })
    }
}
