//! Persisted session token storage.
//!
//! Stores the backend auth token in `${PROTRACK_HOME}/session.json` with
//! restricted permissions (0600). Tokens are never logged in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::paths;

/// On-disk session file layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    token: String,
}

/// In-memory handle to the current auth token, shared between the API
/// client (which reads it per request) and the auth controller (which
/// writes it on login/logout).
#[derive(Debug, Clone, Default)]
pub struct SharedToken(Arc<RwLock<Option<String>>>);

impl SharedToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the current token, if any.
    pub fn get(&self) -> Option<String> {
        self.0.read().ok().and_then(|guard| guard.clone())
    }

    pub fn set(&self, token: String) {
        if let Ok(mut guard) = self.0.write() {
            *guard = Some(token);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.0.write() {
            *guard = None;
        }
    }
}

/// File-backed session store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store at the default location under PROTRACK_HOME.
    pub fn new() -> Self {
        Self {
            path: paths::session_path(),
        }
    }

    /// Store at a specific path (tests).
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the persisted token, if any.
    ///
    /// A missing file means no session. An unreadable or corrupt file is
    /// treated the same way (fail closed): the user re-authenticates
    /// rather than running with a bad token.
    pub fn load(&self) -> Option<String> {
        if !self.path.exists() {
            return None;
        }

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to read session file");
                return None;
            }
        };

        match serde_json::from_str::<SessionFile>(&contents) {
            Ok(session) => Some(session.token),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Corrupt session file, ignoring");
                None
            }
        }
    }

    /// Persists the token with restricted permissions (0600).
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(&SessionFile {
            token: token.to_string(),
        })
        .context("Failed to serialize session")?;

        // Write with restricted permissions
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }

    /// Removes the persisted token. Missing file is not an error.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| {
                format!("Failed to remove session file {}", self.path.display())
            }),
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_save_load_clear_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));

        store.save("tok-123").unwrap();
        assert_eq!(store.load(), Some("tok-123".to_string()));

        store.clear().unwrap();
        assert_eq!(store.load(), None);

        // Clearing again is fine.
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_fails_closed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let store = SessionStore::at(path);
        assert_eq!(store.load(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::at(path.clone());
        store.save("tok-123").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_shared_token_get_set_clear() {
        let token = SharedToken::new();
        assert_eq!(token.get(), None);

        token.set("abc".to_string());
        assert_eq!(token.get(), Some("abc".to_string()));

        let alias = token.clone();
        alias.clear();
        assert_eq!(token.get(), None);
    }
}
