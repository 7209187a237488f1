//! Credential storage for the active session
//!
//! A session holds three values: the access token attached to every request,
//! the refresh token used to mint a new access token, and an opaque user-info
//! document written at login. Stores are plain key-value holders with interior
//! locking; they carry no refresh logic of their own.
//!
//! Reads and writes are synchronous. Critical sections are a map lookup or
//! insert, so they are never held across an `.await` by callers.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use common::Secret;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Keys a session is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    AccessToken,
    RefreshToken,
    UserInfo,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 3] = [
        CredentialKey::AccessToken,
        CredentialKey::RefreshToken,
        CredentialKey::UserInfo,
    ];

    /// Name used in the persisted JSON document.
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialKey::AccessToken => "access_token",
            CredentialKey::RefreshToken => "refresh_token",
            CredentialKey::UserInfo => "user_info",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

/// Persistence abstraction for session credentials.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: CredentialKey) -> Option<Secret<String>>;

    fn set(&self, key: CredentialKey, value: Secret<String>) -> Result<()>;

    fn clear(&self, key: CredentialKey) -> Result<()>;

    /// Remove every session value (logout / session termination).
    fn clear_all(&self) -> Result<()> {
        for key in CredentialKey::ALL {
            self.clear(key)?;
        }
        Ok(())
    }
}

/// In-process store. Each client instance owns its own, so tests and
/// independent clients never observe each other's credentials.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<HashMap<CredentialKey, Secret<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with an access/refresh token pair.
    pub fn with_tokens(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        let mut state = HashMap::new();
        state.insert(CredentialKey::AccessToken, Secret::new(access.into()));
        state.insert(CredentialKey::RefreshToken, Secret::new(refresh.into()));
        Self {
            state: RwLock::new(state),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: CredentialKey) -> Option<Secret<String>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.get(&key).cloned()
    }

    fn set(&self, key: CredentialKey, value: Secret<String>) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.insert(key, value);
        Ok(())
    }

    fn clear(&self, key: CredentialKey) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.remove(&key);
        Ok(())
    }
}

/// JSON-file-backed store.
///
/// The file is the source of truth across process restarts; the in-memory map
/// serves reads. All writes use atomic temp-file + rename while holding the
/// write lock, so concurrent writers cannot interleave partial files.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: RwLock<HashMap<CredentialKey, Secret<String>>>,
}

impl FileStore {
    /// Load credentials from the given file path.
    ///
    /// If the file doesn't exist, creates it as `{}` (no session yet).
    /// Unknown keys are ignored with a warning.
    pub fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let raw: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            let mut state = HashMap::new();
            for (name, value) in raw {
                match CredentialKey::from_name(&name) {
                    Some(key) => {
                        state.insert(key, Secret::new(value));
                    }
                    None => warn!(key = %name, "ignoring unknown credential key"),
                }
            }
            info!(path = %path.display(), entries = state.len(), "loaded credentials");
            state
        } else {
            info!(path = %path.display(), "credential file not found, starting without a session");
            let state = HashMap::new();
            write_atomic(&path, &state)?;
            state
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: CredentialKey) -> Option<Secret<String>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.get(&key).cloned()
    }

    fn set(&self, key: CredentialKey, value: Secret<String>) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.insert(key, value);
        debug!(key = key.as_str(), "stored credential");
        write_atomic(&self.path, &state)
    }

    fn clear(&self, key: CredentialKey) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.remove(&key).is_some() {
            debug!(key = key.as_str(), "cleared credential");
            write_atomic(&self.path, &state)?;
        }
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.clear();
        debug!("cleared all credentials");
        write_atomic(&self.path, &state)
    }
}

/// Write credentials to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only) since
/// the file contains bearer tokens.
fn write_atomic(path: &Path, data: &HashMap<CredentialKey, Secret<String>>) -> Result<()> {
    let document: BTreeMap<&str, &str> = data
        .iter()
        .map(|(key, value)| (key.as_str(), value.expose().as_str()))
        .collect();
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    std::fs::write(&tmp_path, json.as_bytes())
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&tmp_path, perms)
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}
