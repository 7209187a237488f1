//! `AuthClient`: execute-with-auth over any `Transport`
//!
//! One client owns one credential store view, one refresh coordinator and one
//! session. Clones share all three, so tasks cloned from the same client
//! coordinate their refreshes; separately built clients share nothing.

use std::sync::Arc;

use auth_session::{CredentialStore, DEFAULT_LOGIN_REDIRECT, MemoryStore, Refresher};
use tracing::{debug, instrument, warn};
use transport::{HttpRequest, HttpResponse, Transport};
use uuid::Uuid;

use crate::augment::RequestAugmenter;
use crate::classify::{Classification, ResponseClassifier, StatusPolicy, failure_message};
use crate::envelope::RequestEnvelope;
use crate::error::{Error, Failure, Result};
use crate::metrics;
use crate::notify::{ErrorNotifier, TracingNotifier};
use crate::refresh::{RefreshCoordinator, RefreshOutcome, RefreshState};
use crate::session::{RedirectTerminator, Session, SessionTerminator, TerminationReason};

struct Inner {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    augmenter: RequestAugmenter,
    classifier: ResponseClassifier,
    refresh: RefreshCoordinator,
    session: Session,
    notifier: Option<Arc<dyn ErrorNotifier>>,
}

#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<Inner>,
}

impl AuthClient {
    pub fn builder() -> AuthClientBuilder {
        AuthClientBuilder::default()
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.inner.refresh.state()
    }

    pub fn status_policy(&self) -> StatusPolicy {
        self.inner.classifier.policy()
    }

    /// Execute `request` with the current bearer token.
    ///
    /// A stale-credential response triggers (or joins) a refresh and one
    /// replay. Any other failure is returned as-is; an unauthenticated status
    /// also ends the session.
    #[instrument(
        skip_all,
        fields(request_id = %Uuid::new_v4(), method = %request.method, path = %request.path)
    )]
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let inner = &self.inner;
        let mut envelope = RequestEnvelope::new(request);

        loop {
            let augmented = inner.augmenter.augment(envelope.request());
            let outcome = inner.transport.execute(augmented.request).await;
            let classification = inner
                .classifier
                .classify_outcome(&outcome, envelope.is_replayable());
            metrics::record_classification(classification);

            let response = match outcome {
                Ok(response) => response,
                Err(e) => {
                    warn!(transport = inner.transport.id(), error = %e, "no response received");
                    self.notify(&e.to_string());
                    return Err(Failure::from(e).into());
                }
            };
            debug!(
                status = response.status.as_u16(),
                classification = classification.label(),
                replayed = !envelope.is_replayable(),
                "response received"
            );

            if inner.classifier.signals(response.status).session_expired {
                inner.session.end(TerminationReason::SessionExpired {
                    status: response.status.as_u16(),
                });
            }

            match classification {
                Classification::Success => return Ok(response),
                Classification::CredentialStale => {
                    match inner.refresh.resolve(augmented.token.as_ref()).await {
                        RefreshOutcome::Refreshed => {
                            metrics::record_replay();
                            debug!("replaying request with refreshed credential");
                            envelope = envelope.into_replay();
                        }
                        RefreshOutcome::Terminal(reason) => {
                            return Err(Error::SessionTerminated(reason));
                        }
                    }
                }
                Classification::SessionExpired | Classification::GenericFailure => {
                    let message = failure_message(&response);
                    if inner.classifier.should_notify(response.status) {
                        self.notify(&message);
                    }
                    return Err(Failure::Status {
                        status: response.status,
                        message,
                        body: response.body,
                    }
                    .into());
                }
            }
        }
    }

    fn notify(&self, message: &str) {
        if let Some(notifier) = &self.inner.notifier {
            notifier.notify(message);
        }
    }
}

/// Assembles an `AuthClient`.
///
/// Transport and refresher are required. Defaults: an empty `MemoryStore`, a
/// `RedirectTerminator` to `/login` without a logout call, `TracingNotifier`,
/// and the 401/410 status policy.
#[derive(Default)]
pub struct AuthClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn CredentialStore>>,
    refresher: Option<Arc<dyn Refresher>>,
    terminator: Option<Arc<dyn SessionTerminator>>,
    notifier: Option<Option<Arc<dyn ErrorNotifier>>>,
    policy: StatusPolicy,
}

impl AuthClientBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn refresher(mut self, refresher: Arc<dyn Refresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn terminator(mut self, terminator: Arc<dyn SessionTerminator>) -> Self {
        self.terminator = Some(terminator);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn ErrorNotifier>) -> Self {
        self.notifier = Some(Some(notifier));
        self
    }

    /// Disable failure notifications entirely.
    pub fn without_notifier(mut self) -> Self {
        self.notifier = Some(None);
        self
    }

    pub fn status_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<AuthClient> {
        let transport = self
            .transport
            .ok_or_else(|| Error::Config("transport is required".into()))?;
        let refresher = self
            .refresher
            .ok_or_else(|| Error::Config("refresher is required".into()))?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn CredentialStore>);
        let terminator = self
            .terminator
            .unwrap_or_else(|| {
                Arc::new(RedirectTerminator::new(DEFAULT_LOGIN_REDIRECT)) as Arc<dyn SessionTerminator>
            });
        let notifier = self
            .notifier
            .unwrap_or_else(|| Some(Arc::new(TracingNotifier) as Arc<dyn ErrorNotifier>));

        let session = Session::new(store.clone(), terminator);
        let refresh = RefreshCoordinator::new(store.clone(), refresher, session.clone());

        Ok(AuthClient {
            inner: Arc::new(Inner {
                transport,
                augmenter: RequestAugmenter::new(store.clone()),
                store,
                classifier: ResponseClassifier::new(self.policy),
                refresh,
                session,
                notifier,
            }),
        })
    }
}
