//! Access-token refresh against the external token authority
//!
//! The authority accepts a refresh token and answers with a new access token.
//! Some deployments also rotate the refresh token; when the response carries
//! one, the caller stores it alongside the new access token.
//!
//! The refresh call goes through its own plain `reqwest::Client`, never
//! through the authenticated runtime, so a stale-credential answer from the
//! authority cannot recurse into another refresh.

use std::future::Future;
use std::pin::Pin;

use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Result of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: Secret<String>,
    /// Present only when the authority rotated the refresh token.
    pub refresh_token: Option<Secret<String>>,
}

/// Request body sent to the refresh endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Response body from the refresh endpoint.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl From<RefreshResponse> for RefreshedToken {
    fn from(response: RefreshResponse) -> Self {
        Self {
            access_token: Secret::new(response.access_token),
            refresh_token: response.refresh_token.map(Secret::new),
        }
    }
}

/// Exchanges a refresh token for a new access token.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Refresher>`).
pub trait Refresher: Send + Sync {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<RefreshedToken>> + Send + 'a>>;
}

/// Refresher that calls `PUT <url>` with `{"refreshToken": ...}`.
#[derive(Debug, Clone)]
pub struct HttpRefresher {
    client: reqwest::Client,
    url: String,
}

impl HttpRefresher {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl Refresher for HttpRefresher {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<RefreshedToken>> + Send + 'a>> {
        Box::pin(async move {
            debug!(url = %self.url, "requesting access token refresh");
            let response = self
                .client
                .put(&self.url)
                .json(&RefreshRequest { refresh_token })
                .send()
                .await
                .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("<no body>"));

                // 401/403 means the refresh token is revoked or invalid
                if status.as_u16() == 401 || status.as_u16() == 403 {
                    return Err(Error::InvalidCredentials(format!(
                        "refresh token rejected ({status}): {body}"
                    )));
                }

                return Err(Error::TokenRefresh(format!(
                    "refresh endpoint returned {status}: {body}"
                )));
            }

            let parsed = response
                .json::<RefreshResponse>()
                .await
                .map_err(|e| Error::TokenRefresh(format!("invalid refresh response: {e}")))?;
            if parsed.access_token.trim().is_empty() {
                return Err(Error::TokenRefresh(
                    "refresh response carried an empty access token".into(),
                ));
            }
            Ok(parsed.into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::put;
    use tokio::net::TcpListener;

    /// Start a stub token authority.
    ///
    /// - `rt_valid` → new access token only
    /// - `rt_rotating` → new access token plus rotated refresh token
    /// - anything else → 401
    async fn start_authority() -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            let app = axum::Router::new()
                .route(
                    "/v1/users/refresh_token",
                    put(|axum::Json(body): axum::Json<serde_json::Value>| async move {
                        match body["refreshToken"].as_str() {
                            Some("rt_valid") => (
                                StatusCode::OK,
                                axum::Json(serde_json::json!({"accessToken": "at_new"})),
                            ),
                            Some("rt_rotating") => (
                                StatusCode::OK,
                                axum::Json(serde_json::json!({
                                    "accessToken": "at_new",
                                    "refreshToken": "rt_next"
                                })),
                            ),
                            _ => (
                                StatusCode::UNAUTHORIZED,
                                axum::Json(serde_json::json!({"message": "invalid refresh token"})),
                            ),
                        }
                    }),
                )
                .route(
                    "/broken",
                    put(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
                )
                .route("/garbage", put(|| async { "definitely not json" }))
                .route(
                    "/empty",
                    put(|| async { axum::Json(serde_json::json!({"accessToken": ""})) }),
                );
            axum::serve(listener, app).await.unwrap();
        });

        (url, handle)
    }

    #[test]
    fn refresh_request_serializes_camel_case() {
        let json = serde_json::to_string(&RefreshRequest {
            refresh_token: "rt_1",
        })
        .unwrap();
        assert_eq!(json, r#"{"refreshToken":"rt_1"}"#);
    }

    #[test]
    fn refresh_response_without_rotation_deserializes() {
        let parsed: RefreshResponse = serde_json::from_str(r#"{"accessToken":"at_2"}"#).unwrap();
        assert_eq!(parsed.access_token, "at_2");
        assert!(parsed.refresh_token.is_none());
    }

    #[tokio::test]
    async fn refresh_returns_new_access_token() {
        let (url, _server) = start_authority().await;
        let refresher = HttpRefresher::new(
            reqwest::Client::new(),
            format!("{url}/v1/users/refresh_token"),
        );

        let token = refresher.refresh("rt_valid").await.unwrap();
        assert_eq!(token.access_token.expose(), "at_new");
        assert!(token.refresh_token.is_none());
    }

    #[tokio::test]
    async fn refresh_returns_rotated_refresh_token() {
        let (url, _server) = start_authority().await;
        let refresher = HttpRefresher::new(
            reqwest::Client::new(),
            format!("{url}/v1/users/refresh_token"),
        );

        let token = refresher.refresh("rt_rotating").await.unwrap();
        assert_eq!(token.access_token.expose(), "at_new");
        assert_eq!(token.refresh_token.unwrap().expose(), "rt_next");
    }

    #[tokio::test]
    async fn rejected_refresh_token_is_invalid_credentials() {
        let (url, _server) = start_authority().await;
        let refresher = HttpRefresher::new(
            reqwest::Client::new(),
            format!("{url}/v1/users/refresh_token"),
        );

        let err = refresher.refresh("rt_revoked").await.unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials(_)), "got: {err:?}");
        assert!(err.to_string().contains("invalid refresh token"));
    }

    #[tokio::test]
    async fn server_error_is_token_refresh_error() {
        let (url, _server) = start_authority().await;
        let refresher = HttpRefresher::new(reqwest::Client::new(), format!("{url}/broken"));

        let err = refresher.refresh("rt_valid").await.unwrap_err();
        assert!(matches!(err, Error::TokenRefresh(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn malformed_body_is_token_refresh_error() {
        let (url, _server) = start_authority().await;
        let refresher = HttpRefresher::new(reqwest::Client::new(), format!("{url}/garbage"));

        let err = refresher.refresh("rt_valid").await.unwrap_err();
        assert!(err.to_string().contains("invalid refresh response"), "got: {err}");
    }

    #[tokio::test]
    async fn empty_access_token_is_rejected() {
        let (url, _server) = start_authority().await;
        let refresher = HttpRefresher::new(reqwest::Client::new(), format!("{url}/empty"));

        let err = refresher.refresh("rt_valid").await.unwrap_err();
        assert!(matches!(err, Error::TokenRefresh(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn unreachable_authority_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let refresher = HttpRefresher::new(reqwest::Client::new(), format!("http://{addr}/refresh"));
        let err = refresher.refresh("rt_valid").await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got: {err:?}");
    }
}
