//! Scripted collaborators for runtime tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use auth_session::{RefreshedToken, Refresher};
use common::Secret;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use tokio::sync::{Barrier, Notify, Semaphore};
use transport::{HttpRequest, HttpResponse, Transport};

use crate::notify::ErrorNotifier;
use crate::session::{SessionTerminator, TerminationReason};

/// `Authorization` header of a request, if any.
pub(crate) fn authorization(request: &HttpRequest) -> Option<String> {
    request
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// Handler answering 200 for `Bearer <valid>` and 410 for anything else.
pub(crate) fn token_gated(
    valid: &str,
) -> impl Fn(&HttpRequest) -> transport::Result<HttpResponse> + Send + Sync + 'static {
    let expected = format!("Bearer {valid}");
    move |request| {
        if authorization(request).as_deref() == Some(expected.as_str()) {
            Ok(HttpResponse::new(StatusCode::OK, r#"{"ok":true}"#))
        } else {
            Ok(HttpResponse::new(
                StatusCode::GONE,
                r#"{"message":"access token expired"}"#,
            ))
        }
    }
}

type Handler = Box<dyn Fn(&HttpRequest) -> transport::Result<HttpResponse> + Send + Sync>;

/// Transport answering from a closure and recording every request it saw.
pub(crate) struct ScriptedTransport {
    handler: Handler,
    calls: Mutex<Vec<HttpRequest>>,
    /// Requests carrying this authorization wait on the barrier before
    /// answering.
    barrier: Option<(String, Arc<Barrier>)>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        handler: impl Fn(&HttpRequest) -> transport::Result<HttpResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            barrier: None,
        }
    }

    pub(crate) fn with_barrier(mut self, authorization: &str, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some((authorization.to_string(), barrier));
        self
    }

    pub(crate) fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn id(&self) -> &str {
        "scripted"
    }

    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = transport::Result<HttpResponse>> + Send + '_>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(request.clone());
            if let Some((gated, barrier)) = &self.barrier {
                if authorization(&request).as_deref() == Some(gated.as_str()) {
                    barrier.wait().await;
                }
            }
            (self.handler)(&request)
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) enum RefreshBehavior {
    Succeed {
        access: String,
        refresh: Option<String>,
    },
    Fail,
    Panic,
}

/// Refresher with a scripted outcome and an optional release gate.
pub(crate) struct StubRefresher {
    behavior: Mutex<RefreshBehavior>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    started: Notify,
    gate: Option<Semaphore>,
}

impl StubRefresher {
    fn with_behavior(behavior: RefreshBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            started: Notify::new(),
            gate: None,
        }
    }

    pub(crate) fn succeeding(access: &str) -> Self {
        Self::with_behavior(RefreshBehavior::Succeed {
            access: access.to_string(),
            refresh: None,
        })
    }

    pub(crate) fn rotating(access: &str, refresh: &str) -> Self {
        Self::with_behavior(RefreshBehavior::Succeed {
            access: access.to_string(),
            refresh: Some(refresh.to_string()),
        })
    }

    pub(crate) fn failing() -> Self {
        Self::with_behavior(RefreshBehavior::Fail)
    }

    pub(crate) fn panicking() -> Self {
        Self::with_behavior(RefreshBehavior::Panic)
    }

    /// Hold every refresh until `release()` is called.
    pub(crate) fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub(crate) fn succeed_with(&self, access: &str) {
        *self.behavior.lock().unwrap() = RefreshBehavior::Succeed {
            access: access.to_string(),
            refresh: None,
        };
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) async fn wait_started(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.started.notified())
            .await
            .unwrap();
    }
}

impl Refresher for StubRefresher {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = auth_session::Result<RefreshedToken>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(refresh_token.to_string());
            self.started.notify_one();

            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }

            let behavior = self.behavior.lock().unwrap().clone();
            match behavior {
                RefreshBehavior::Succeed { access, refresh } => Ok(RefreshedToken {
                    access_token: Secret::new(access),
                    refresh_token: refresh.map(Secret::new),
                }),
                RefreshBehavior::Fail => Err(auth_session::Error::InvalidCredentials(
                    "refresh token rejected".into(),
                )),
                RefreshBehavior::Panic => panic!("refresher exploded"),
            }
        })
    }
}

/// Terminator that records every reason it receives.
#[derive(Default)]
pub(crate) struct RecordingTerminator {
    reasons: Mutex<Vec<TerminationReason>>,
    changed: Notify,
    hang: bool,
}

impl RecordingTerminator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records the call, then never completes.
    pub(crate) fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub(crate) fn reasons(&self) -> Vec<TerminationReason> {
        self.reasons.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.reasons.lock().unwrap().len()
    }

    pub(crate) async fn wait_for_calls(&self, expected: usize) {
        let wait = async {
            loop {
                let changed = self.changed.notified();
                if self.calls() >= expected {
                    return;
                }
                changed.await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .unwrap();
    }
}

impl SessionTerminator for RecordingTerminator {
    fn terminate(&self, reason: TerminationReason) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            self.reasons.lock().unwrap().push(reason);
            self.changed.notify_waiters();
            if self.hang {
                std::future::pending::<()>().await;
            }
        })
    }
}

/// Notifier that keeps every message.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl ErrorNotifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
