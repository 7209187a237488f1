//! Authenticated request runtime
//!
//! Wraps a `Transport` so every request carries the current bearer token,
//! expired tokens are refreshed transparently, and requests caught by an
//! expiry are replayed once the refresh settles.
//!
//! Request lifecycle:
//! 1. `RequestAugmenter` attaches `Authorization: Bearer <access token>`
//! 2. The transport executes the request
//! 3. `ResponseClassifier` maps the outcome to Success / SessionExpired /
//!    CredentialStale / GenericFailure
//! 4. CredentialStale → `RefreshCoordinator` runs (or joins) the single
//!    in-flight refresh, then the original request is replayed once
//! 5. SessionExpired or a failed refresh → `Session::end` clears credentials
//!    and detaches the `SessionTerminator`
//! 6. GenericFailure → `ErrorNotifier` is told (never for stale-credential
//!    statuses) and the failure is returned to the caller

pub mod augment;
pub mod classify;
pub mod client;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod refresh;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use augment::{AugmentedRequest, RequestAugmenter};
pub use classify::{Classification, ResponseClassifier, Signals, StatusPolicy, failure_message};
pub use client::{AuthClient, AuthClientBuilder};
pub use envelope::RequestEnvelope;
pub use error::{Error, Failure, Result};
pub use notify::{ErrorNotifier, TracingNotifier};
pub use refresh::{RefreshCoordinator, RefreshOutcome, RefreshState};
pub use session::{RedirectTerminator, Session, SessionTerminator, TerminationReason};
