//! Original request plus its replay state.

use transport::HttpRequest;

/// Wraps the caller's request for the whole execution.
///
/// The request inside is never mutated; every attempt augments a fresh copy.
/// A request gets one replay after a refresh and no more.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    request: HttpRequest,
    replayed: bool,
}

impl RequestEnvelope {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            replayed: false,
        }
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Whether a stale-credential response may still trigger a replay.
    pub fn is_replayable(&self) -> bool {
        !self.replayed
    }

    /// Mark the single replay as used.
    pub fn into_replay(self) -> Self {
        Self {
            request: self.request,
            replayed: true,
        }
    }
}
