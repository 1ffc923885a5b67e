//! Login session cache: bearer token plus the user it belongs to.
//!
//! Held in memory and mirrored to a JSON file so the CLI and TUI stay logged
//! in across runs. This is a convenience cache, not a security boundary; the
//! server validates the token on every request.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::domain::User;
use crate::error::ApiError;

/// Message shown when a request is rejected for an expired or invalid token.
pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    current: Option<Session>,
}

impl SessionStore {
    /// Rehydrate from `path`. A missing or unreadable file means logged out.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Session>(&content) {
                Ok(s) if !s.token.is_empty() => Some(s),
                Ok(_) => None,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring corrupt session file");
                    None
                }
            },
            Err(_) => None,
        };
        debug!(path = %path.display(), logged_in = current.is_some(), "session loaded");
        Self { path, current }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.current.as_ref().map(|s| &s.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.is_some()
    }

    /// Copy the stored token (or its absence) onto a client.
    pub fn apply_to(&self, client: &mut ApiClient) {
        client.set_token(self.token().map(str::to_string));
    }

    /// Authenticate, persist the session and install the token on `client`.
    pub fn login(&mut self, client: &mut ApiClient, email: &str, password: &str) -> Result<&User, ApiError> {
        let resp = client.login(email, password)?;
        self.store(Session {
            token: resp.token,
            user: resp.user,
        })?;
        self.apply_to(client);
        info!(email, "logged in");
        self.user()
            .ok_or_else(|| ApiError::Session("session missing after login".into()))
    }

    /// Replace the cached user (after a key update, for instance).
    pub fn update_user(&mut self, user: User) -> Result<(), ApiError> {
        match self.current.take() {
            Some(session) => self.store(Session { user, ..session }),
            None => Ok(()),
        }
    }

    pub fn store(&mut self, session: Session) -> Result<(), ApiError> {
        self.current = Some(session);
        self.persist()
    }

    /// Clear memory and file. Removing an already-missing file is fine.
    pub fn logout(&mut self) -> Result<(), ApiError> {
        self.current = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Session(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Clear the session if `err` is an auth failure. Returns whether the
    /// caller should send the user back to the login screen.
    pub fn handle_auth_error(&mut self, err: &ApiError) -> bool {
        if !err.is_auth_failure() {
            return false;
        }
        warn!(error = %err, "authentication rejected, clearing session");
        if let Err(e) = self.logout() {
            warn!(error = %e, "could not clear session file");
        }
        true
    }

    fn persist(&self) -> Result<(), ApiError> {
        let Some(session) = &self.current else {
            return Ok(());
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApiError::Session(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| ApiError::Session(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| ApiError::Session(format!("failed to write {}: {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            alpaca_env: None,
            has_alpaca_keys: false,
        }
    }

    #[test]
    fn store_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let mut store = SessionStore::open(&path);
        assert!(!store.is_logged_in());

        store
            .store(Session { token: "tok".into(), user: user() })
            .unwrap();

        let reopened = SessionStore::open(&path);
        assert_eq!(reopened.token(), Some("tok"));
        assert_eq!(reopened.user().unwrap().email, "ada@example.com");
    }

    #[test]
    fn corrupt_file_means_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(!SessionStore::open(&path).is_logged_in());
    }

    #[test]
    fn auth_error_clears_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut store = SessionStore::open(&path);
        store
            .store(Session { token: "tok".into(), user: user() })
            .unwrap();

        let other = ApiError::Http { status: 500, message: "boom".into() };
        assert!(!store.handle_auth_error(&other));
        assert!(store.is_logged_in());

        let auth = ApiError::Unauthorized("token expired".into());
        assert!(store.handle_auth_error(&auth));
        assert!(!store.is_logged_in());
        assert!(!path.exists());
    }

    #[test]
    fn logout_without_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SessionStore::open(dir.path().join("missing.json"));
        assert!(store.logout().is_ok());
    }
}
