//! Server-side logout call.
//!
//! Ends the session at the server (invalidating cookies or server-held
//! session state). Used by session terminators after local credentials are
//! cleared; its outcome never affects the request that triggered termination.

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Calls `DELETE <url>` to end the server-side session.
#[derive(Debug, Clone)]
pub struct HttpLogout {
    client: reqwest::Client,
    url: String,
}

impl HttpLogout {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub async fn logout(&self) -> Result<()> {
        debug!(url = %self.url, "ending server-side session");
        let response = self
            .client
            .delete(&self.url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("logout request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            warn!(status = status.as_u16(), "logout endpoint rejected request");
            return Err(Error::Logout(format!("logout endpoint returned {status}: {body}")));
        }
        Ok(())
    }
}
