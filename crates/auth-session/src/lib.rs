//! Session credentials and the external token authority
//!
//! Holds the pieces of an authenticated session that live outside the
//! request path: where credentials are kept, how a refresh token is exchanged
//! for a new access token, and how the server-side session is ended.
//!
//! Credential flow:
//! 1. Login (outside this crate) seeds the store via `CredentialStore::set()`
//! 2. Every request reads `CredentialKey::AccessToken`
//! 3. On a stale-credential response the runtime calls `Refresher::refresh()`
//!    with `CredentialKey::RefreshToken` and stores the new access token
//! 4. On session termination the store is cleared and `HttpLogout::logout()`
//!    ends the server-side session

pub mod constants;
pub mod credentials;
pub mod error;
pub mod logout;
pub mod token;

pub use constants::*;
pub use credentials::{CredentialKey, CredentialStore, FileStore, MemoryStore};
pub use error::{Error, Result};
pub use logout::HttpLogout;
pub use token::{HttpRefresher, RefreshedToken, Refresher};
