//! Response classification
//!
//! Maps each completed execution to one of four outcomes. The two
//! authentication statuses are server-defined, so they come from a
//! `StatusPolicy` rather than being hard-coded.
//!
//! The two status matches are independent signals. A deployment may configure
//! the same code for both; the caller then runs the session-expired handling
//! and the stale-credential handling for the same response. Error display is
//! suppressed whenever the stale-credential code matches, because that path is
//! an automatic, transparent retry.

use auth_session::{DEFAULT_STALE_CREDENTIAL_STATUS, DEFAULT_UNAUTHENTICATED_STATUS};
use reqwest::StatusCode;
use transport::HttpResponse;

use crate::error::{Error, Result};

/// Server-defined authentication statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    /// Authentication is void; the session ends.
    pub unauthenticated: StatusCode,
    /// Access token expired; refresh and replay.
    pub stale_credential: StatusCode,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            unauthenticated: StatusCode::UNAUTHORIZED,
            stale_credential: StatusCode::GONE,
        }
    }
}

impl StatusPolicy {
    /// Build a policy from raw codes. Both must be valid HTTP statuses outside
    /// the 2xx range.
    pub fn from_codes(unauthenticated: u16, stale_credential: u16) -> Result<Self> {
        Ok(Self {
            unauthenticated: auth_status("unauthenticated", unauthenticated)?,
            stale_credential: auth_status("stale_credential", stale_credential)?,
        })
    }
}

fn auth_status(name: &str, code: u16) -> Result<StatusCode> {
    let status = StatusCode::from_u16(code)
        .map_err(|e| Error::Config(format!("{name} status {code} is not a valid HTTP status: {e}")))?;
    if status.is_success() {
        return Err(Error::Config(format!(
            "{name} status must be outside 200-299, got {code}"
        )));
    }
    Ok(status)
}

/// Outcome of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    /// Terminal authentication failure; ends the session.
    SessionExpired,
    /// Recoverable by refreshing the access token and replaying.
    CredentialStale,
    GenericFailure,
}

impl Classification {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Success => "success",
            Classification::SessionExpired => "session_expired",
            Classification::CredentialStale => "credential_stale",
            Classification::GenericFailure => "generic_failure",
        }
    }
}

/// Which authentication statuses a response matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals {
    pub session_expired: bool,
    pub credential_stale: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseClassifier {
    policy: StatusPolicy,
}

impl ResponseClassifier {
    pub fn new(policy: StatusPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> StatusPolicy {
        self.policy
    }

    pub fn signals(&self, status: StatusCode) -> Signals {
        Signals {
            session_expired: status == self.policy.unauthenticated,
            credential_stale: status == self.policy.stale_credential,
        }
    }

    /// Classify a received response.
    ///
    /// `replayable` is false once the request has used its single replay; a
    /// stale-credential status is then a generic failure.
    pub fn classify(&self, response: &HttpResponse, replayable: bool) -> Classification {
        if response.is_success() {
            return Classification::Success;
        }
        let signals = self.signals(response.status);
        if signals.credential_stale && replayable {
            Classification::CredentialStale
        } else if signals.session_expired {
            Classification::SessionExpired
        } else {
            Classification::GenericFailure
        }
    }

    /// Classify a transport outcome. Transport errors never trigger refresh.
    pub fn classify_outcome(
        &self,
        outcome: &transport::Result<HttpResponse>,
        replayable: bool,
    ) -> Classification {
        match outcome {
            Ok(response) => self.classify(response, replayable),
            Err(_) => Classification::GenericFailure,
        }
    }

    /// Whether a failed response should reach the error notifier.
    pub fn should_notify(&self, status: StatusCode) -> bool {
        !status.is_success() && !self.signals(status).credential_stale
    }
}

/// Display message for a failed response: the JSON `message` field when the
/// server sent one, otherwise a generic line naming the status code.
pub fn failure_message(response: &HttpResponse) -> String {
    response
        .json::<serde_json::Value>()
        .ok()
        .and_then(|body| {
            body.get("message")
                .and_then(|m| m.as_str())
                .map(str::to_owned)
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "Request failed with status code {}",
                response.status.as_u16()
            )
        })
}
