//! Runtime counters
//!
//! - `auth_requests_total` (counter): label `classification`
//! - `auth_refresh_total` (counter): label `outcome`
//! - `auth_replays_total` (counter)
//! - `auth_session_terminations_total` (counter): label `reason`
//!
//! Without an installed recorder every call is a no-op.

use crate::classify::Classification;
use crate::session::TerminationReason;

pub fn record_classification(classification: Classification) {
    metrics::counter!("auth_requests_total", "classification" => classification.label())
        .increment(1);
}

/// `outcome` is one of `success`, `failure`, `missing_token`, `aborted`.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("auth_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_replay() {
    metrics::counter!("auth_replays_total").increment(1);
}

pub fn record_termination(reason: &TerminationReason) {
    metrics::counter!("auth_session_terminations_total", "reason" => reason.label())
        .increment(1);
}
