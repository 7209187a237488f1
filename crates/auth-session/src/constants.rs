//! Protocol constants shared by the store, the token authority and the runtime.

/// Authorization scheme prefix attached to every authenticated request.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Status the server uses when authentication is void and cannot be recovered.
pub const DEFAULT_UNAUTHENTICATED_STATUS: u16 = 401;

/// Status the server uses when the access token has expired but the refresh
/// token may still mint a new one.
pub const DEFAULT_STALE_CREDENTIAL_STATUS: u16 = 410;

/// Where the user agent is sent after the session ends.
pub const DEFAULT_LOGIN_REDIRECT: &str = "/login";

/// File name used when no credential path is configured.
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
