// Auth/session state machine
//
// Unauthenticated -> MfaPending(token) -> Authenticated, and back to
// Unauthenticated on logout from any phase. Callers perform the network
// calls and report the outcome here; this module only records transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::cache::ResponseCache;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session storage error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("corrupt session file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Persisted session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub is_authenticated: bool,
    pub mfa_pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AuthState {
    pub fn unauthenticated() -> Self {
        Self {
            is_authenticated: false,
            mfa_pending: false,
            mfa_token: None,
            access_token: None,
            updated_at: None,
        }
    }

    pub fn phase(&self) -> AuthPhase {
        if self.is_authenticated {
            AuthPhase::Authenticated
        } else if self.mfa_pending {
            AuthPhase::MfaPending
        } else {
            AuthPhase::Unauthenticated
        }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::unauthenticated()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Unauthenticated,
    MfaPending,
    Authenticated,
}

/// Where the session record lives between process runs
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<AuthState>, SessionError>;
    fn save(&self, state: &AuthState) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

/// JSON file store, normally `<state_dir>/session.json`
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<AuthState>, SessionError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| SessionError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&self, state: &AuthState) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let json = serde_json::to_string_pretty(state).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(|e| self.io_err(e))
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    state: Mutex<Option<AuthState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<AuthState>, SessionError> {
        Ok(self.state.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }

    fn save(&self, state: &AuthState) -> Result<(), SessionError> {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = Some(state.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = None;
        Ok(())
    }
}

/// Single owner and writer of the auth record
pub struct AuthSession<S: SessionStore> {
    store: S,
    state: AuthState,
    cache: Option<ResponseCache>,
}

impl<S: SessionStore> AuthSession<S> {
    /// Restore the persisted record, or start unauthenticated
    pub fn restore(store: S) -> Result<Self, SessionError> {
        let state = store.load()?.unwrap_or_default();
        debug!(phase = ?state.phase(), "Session restored");
        Ok(Self {
            store,
            state,
            cache: None,
        })
    }

    /// Response cache to wipe on logout
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn phase(&self) -> AuthPhase {
        self.state.phase()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.state.access_token.as_deref()
    }

    /// Credentials accepted, second factor required
    pub fn login_started(&mut self, mfa_token: impl Into<String>) -> Result<&AuthState, SessionError> {
        self.transition(AuthState {
            mfa_pending: true,
            mfa_token: Some(mfa_token.into()),
            ..AuthState::unauthenticated()
        })
    }

    /// Second factor verified. Valid from any phase; the pending token is dropped.
    pub fn complete_mfa(&mut self, access_token: Option<String>) -> Result<&AuthState, SessionError> {
        self.transition(AuthState {
            is_authenticated: true,
            access_token,
            ..AuthState::unauthenticated()
        })
    }

    /// Credentials accepted for an account without a second factor
    pub fn login_completed(&mut self, access_token: Option<String>) -> Result<&AuthState, SessionError> {
        self.complete_mfa(access_token)
    }

    /// Back to unauthenticated; wipes the persisted record and cached server data
    pub fn logout(&mut self) -> Result<&AuthState, SessionError> {
        let previous = self.state.phase();
        // In-memory state only changes once the store agrees
        self.store.clear()?;
        self.state = AuthState::unauthenticated();

        if let Some(cache) = &self.cache {
            cache.clear().map_err(|e| SessionError::Io {
                path: cache.dir().to_path_buf(),
                source: e,
            })?;
        }

        info!(from = ?previous, "Logged out");
        Ok(&self.state)
    }

    fn transition(&mut self, mut next: AuthState) -> Result<&AuthState, SessionError> {
        next.updated_at = Some(Utc::now());
        info!(from = ?self.state.phase(), to = ?next.phase(), "Session transition");
        self.store.save(&next)?;
        self.state = next;
        Ok(&self.state)
    }
}
