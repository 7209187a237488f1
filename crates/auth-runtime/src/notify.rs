//! User-facing error display seam.

use tracing::warn;

/// Receives the display message of failed requests.
///
/// Never called for stale-credential statuses; those are retried silently.
pub trait ErrorNotifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Logs failures at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl ErrorNotifier for TracingNotifier {
    fn notify(&self, message: &str) {
        warn!(error = message, "request failed");
    }
}
