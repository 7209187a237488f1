//! Error types for session credential operations

/// Errors from credential storage and the token authority.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("logout failed: {0}")]
    Logout(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
