//! Bearer credential attachment

use std::sync::Arc;

use auth_session::{BEARER_PREFIX, CredentialKey, CredentialStore};
use common::Secret;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::warn;
use transport::HttpRequest;

/// A decorated copy of a request plus the access token it carries.
#[derive(Debug, Clone)]
pub struct AugmentedRequest {
    pub request: HttpRequest,
    /// `None` when the request went out without a credential.
    pub token: Option<Secret<String>>,
}

/// Reads the current access token and attaches it as a bearer header.
#[derive(Clone)]
pub struct RequestAugmenter {
    store: Arc<dyn CredentialStore>,
}

impl RequestAugmenter {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Produce a fresh copy of `request` carrying the stored access token.
    ///
    /// Any existing `Authorization` header is replaced. Without a stored
    /// token the copy is identical to the input.
    pub fn augment(&self, request: &HttpRequest) -> AugmentedRequest {
        let mut request = request.clone();
        let Some(token) = self
            .store
            .get(CredentialKey::AccessToken)
            .filter(|token| !token.is_blank())
        else {
            return AugmentedRequest {
                request,
                token: None,
            };
        };

        match HeaderValue::from_str(&format!("{BEARER_PREFIX}{}", token.expose())) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(AUTHORIZATION, value);
                AugmentedRequest {
                    request,
                    token: Some(token),
                }
            }
            Err(_) => {
                warn!(path = %request.path, "stored access token is not a valid header value, sending without it");
                AugmentedRequest {
                    request,
                    token: None,
                }
            }
        }
    }
}
