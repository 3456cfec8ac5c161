//! Sign-in session and its on-disk store.

use std::io;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::Role;

/// Credential issued at sign-in.
#[derive(Debug, Clone)]
pub struct Session {
    token: SecretString,
    role: Role,
    user_id: Option<String>,
}

impl Session {
    pub fn new(token: impl Into<String>, role: Role) -> Self {
        Self {
            token: SecretString::from(token.into()),
            role,
            user_id: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("failed to access session file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
    role: Role,
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
}

/// JSON file holding the current session between CLI invocations.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session. A missing file means no session.
    pub fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };
        let stored: StoredSession =
            serde_json::from_str(&content).map_err(|source| SessionStoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(Session {
            token: SecretString::from(stored.token),
            role: stored.role,
            user_id: stored.user_id,
        }))
    }

    pub fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        let stored = StoredSession {
            token: session.token.expose_secret().to_string(),
            role: session.role,
            user_id: session.user_id.clone(),
        };
        let content = serde_json::to_string_pretty(&stored).map_err(|source| {
            SessionStoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, content).map_err(|source| self.io_error(source))?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Remove the stored session. Clearing an absent session is not an error.
    pub fn clear(&self) -> Result<(), SessionStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: io::Error) -> SessionStoreError {
        SessionStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        (dir, store)
    }

    #[test]
    fn missing_file_is_no_session() {
        let (_dir, store) = store();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let (_dir, store) = store();
        store
            .save(&Session::new("tok-123", Role::Admin).with_user_id("42"))
            .unwrap();

        let session = store.load().unwrap().unwrap();
        assert_eq!(session.token().expose_secret(), "tok-123");
        assert_eq!(session.role(), Role::Admin);
        assert_eq!(session.user_id(), Some("42"));
    }

    #[test]
    fn clear_removes_file_and_is_idempotent() {
        let (_dir, store) = store();
        store.save(&Session::new("tok", Role::User)).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_reported() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "not json").unwrap();
        assert!(matches!(
            store.load(),
            Err(SessionStoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn debug_output_hides_token() {
        let session = Session::new("super-secret", Role::Admin);
        assert!(!format!("{session:?}").contains("super-secret"));
    }
}
