//! Single-flight credential refresh
//!
//! At most one refresh is in flight per coordinator. The first stale caller
//! creates the pending refresh; every caller that arrives while it runs
//! attaches to the same shared future and receives the same outcome.
//!
//! The refresh itself runs on a spawned task, so a caller that gives up
//! waiting cannot cancel it for the others. Waiters hold the receiving half of
//! a oneshot channel. The slot is filled under the lock and the task is
//! spawned after the lock is released, because a runtime that is shutting
//! down drops the task inline. The task owns a guard that empties the slot
//! when the task ends for any reason, including a panic or shutdown. The guard
//! drops before the outcome is sent, so no caller is woken while the slot
//! still points at a settled refresh.

use std::sync::{Arc, Mutex, PoisonError};

use auth_session::{CredentialKey, CredentialStore, Error as SessionError, Refresher};
use common::Secret;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::session::{Session, TerminationReason};

/// What every caller attached to one refresh receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new access token is stored; replay the request.
    Refreshed,
    /// The session has ended.
    Terminal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Owns the pending-refresh slot for one client instance.
#[derive(Clone)]
pub struct RefreshCoordinator {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn Refresher>,
    session: Session,
    pending: Arc<Mutex<Option<PendingRefresh>>>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn Refresher>,
        session: Session,
    ) -> Self {
        Self {
            store,
            refresher,
            session,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> RefreshState {
        let slot = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Wait for a valid access token after a stale-credential response.
    ///
    /// `sent_with` is the access token the stale request carried. If the store
    /// already holds a different one, a refresh settled after that request
    /// left and no new refresh is started.
    pub async fn resolve(&self, sent_with: Option<&Secret<String>>) -> RefreshOutcome {
        let (pending, outcome_tx) = {
            let mut slot = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(pending) => {
                    debug!("joining in-flight refresh");
                    (pending.clone(), None)
                }
                None => {
                    if self.rotated_since(sent_with) {
                        debug!("access token already refreshed, skipping refresh");
                        return RefreshOutcome::Refreshed;
                    }
                    let (outcome_tx, pending) = self.pending_refresh();
                    *slot = Some(pending.clone());
                    (pending, Some(outcome_tx))
                }
            }
        };
        if let Some(outcome_tx) = outcome_tx {
            self.spawn_refresh(outcome_tx);
        }
        pending.await
    }

    fn rotated_since(&self, sent_with: Option<&Secret<String>>) -> bool {
        let current = self
            .store
            .get(CredentialKey::AccessToken)
            .filter(|token| !token.is_blank());
        match (current, sent_with) {
            (Some(current), Some(sent)) => current.expose() != sent.expose(),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// The shared future every attached caller awaits.
    ///
    /// A dropped sender means the task panicked or was cancelled; that is a
    /// refresh failure.
    fn pending_refresh(&self) -> (oneshot::Sender<RefreshOutcome>, PendingRefresh) {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let session = self.session.clone();
        let pending = async move {
            match outcome_rx.await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let reason = String::from("refresh task aborted");
                    warn!("refresh task did not complete, ending session");
                    metrics::record_refresh("aborted");
                    session.end(TerminationReason::RefreshFailed(reason.clone()));
                    RefreshOutcome::Terminal(reason)
                }
            }
        }
        .boxed()
        .shared();
        (outcome_tx, pending)
    }

    /// Spawn the refresh task. Must not be called with the slot lock held.
    fn spawn_refresh(&self, outcome_tx: oneshot::Sender<RefreshOutcome>) {
        let store = self.store.clone();
        let refresher = self.refresher.clone();
        let session = self.session.clone();
        let reset = ResetOnDrop(self.pending.clone());

        tokio::spawn(async move {
            let outcome = refresh_once(store.as_ref(), refresher.as_ref(), &session).await;
            drop(reset);
            // every waiter may have gone away
            let _ = outcome_tx.send(outcome);
        });
    }
}

/// Empties the pending slot when the refresh task ends.
struct ResetOnDrop(Arc<Mutex<Option<PendingRefresh>>>);

impl Drop for ResetOnDrop {
    fn drop(&mut self) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }
}

async fn refresh_once(
    store: &dyn CredentialStore,
    refresher: &dyn Refresher,
    session: &Session,
) -> RefreshOutcome {
    let Some(refresh_token) = store
        .get(CredentialKey::RefreshToken)
        .filter(|token| !token.is_blank())
    else {
        metrics::record_refresh("missing_token");
        let reason = SessionError::MissingCredential("refresh token".into()).to_string();
        // an empty store means the session already ended
        if store.get(CredentialKey::AccessToken).is_some() {
            warn!("no refresh token stored, ending session");
            session.end(TerminationReason::RefreshFailed(reason.clone()));
        } else {
            debug!("no credentials stored, session already ended");
        }
        return RefreshOutcome::Terminal(reason);
    };

    info!("refreshing access token");
    match refresher.refresh(refresh_token.expose()).await {
        Ok(token) => {
            if let Err(e) = store.set(CredentialKey::AccessToken, token.access_token) {
                warn!(error = %e, "failed to persist refreshed access token");
            }
            if let Some(rotated) = token.refresh_token {
                if let Err(e) = store.set(CredentialKey::RefreshToken, rotated) {
                    warn!(error = %e, "failed to persist rotated refresh token");
                }
            }
            metrics::record_refresh("success");
            info!("access token refreshed");
            RefreshOutcome::Refreshed
        }
        Err(e) => {
            warn!(error = %e, "token refresh failed, ending session");
            metrics::record_refresh("failure");
            let reason = e.to_string();
            session.end(TerminationReason::RefreshFailed(reason.clone()));
            RefreshOutcome::Terminal(reason)
        }
    }
}
