//! Session termination
//!
//! Ending a session is two steps with different timing. Local credentials are
//! cleared synchronously, so no request started afterwards can carry them.
//! The `SessionTerminator` (server-side logout, redirect to login) runs on a
//! detached task; the request that triggered termination never waits for it.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use auth_session::{CredentialStore, DEFAULT_LOGIN_REDIRECT, HttpLogout};
use tracing::{info, warn};

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The server answered with the unauthenticated status.
    SessionExpired { status: u16 },
    /// The credential refresh failed or could not start.
    RefreshFailed(String),
}

impl TerminationReason {
    pub fn label(&self) -> &'static str {
        match self {
            TerminationReason::SessionExpired { .. } => "session_expired",
            TerminationReason::RefreshFailed(_) => "refresh_failed",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::SessionExpired { status } => {
                write!(f, "session expired (status {status})")
            }
            TerminationReason::RefreshFailed(reason) => write!(f, "refresh failed: {reason}"),
        }
    }
}

/// Ends the session outside this process: logout call, redirect to login.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn SessionTerminator>`).
pub trait SessionTerminator: Send + Sync {
    fn terminate(&self, reason: TerminationReason) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Calls the logout endpoint (when configured) and then redirects to the
/// login location.
///
/// There is no browser to navigate here, so the redirect is an `info` event
/// carrying the target.
#[derive(Debug, Clone)]
pub struct RedirectTerminator {
    logout: Option<HttpLogout>,
    redirect_to: String,
}

impl Default for RedirectTerminator {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_REDIRECT)
    }
}

impl RedirectTerminator {
    pub fn new(redirect_to: impl Into<String>) -> Self {
        Self {
            logout: None,
            redirect_to: redirect_to.into(),
        }
    }

    pub fn with_logout(mut self, logout: HttpLogout) -> Self {
        self.logout = Some(logout);
        self
    }

    pub fn redirect_to(&self) -> &str {
        &self.redirect_to
    }
}

impl SessionTerminator for RedirectTerminator {
    fn terminate(&self, reason: TerminationReason) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if let Some(logout) = &self.logout {
                if let Err(e) = logout.logout().await {
                    // the redirect happens regardless
                    warn!(error = %e, "server-side logout failed");
                }
            }
            info!(%reason, redirect_to = %self.redirect_to, "session ended, redirecting to login");
        })
    }
}

/// Shared handle for ending the session.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn CredentialStore>,
    terminator: Arc<dyn SessionTerminator>,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>, terminator: Arc<dyn SessionTerminator>) -> Self {
        Self { store, terminator }
    }

    /// Clear every stored credential, then run the terminator on its own task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn end(&self, reason: TerminationReason) {
        if let Err(e) = self.store.clear_all() {
            warn!(error = %e, "failed to clear credentials on session end");
        }
        crate::metrics::record_termination(&reason);
        info!(%reason, "ending session");

        let terminator = self.terminator.clone();
        tokio::spawn(async move {
            terminator.terminate(reason).await;
        });
    }
}
