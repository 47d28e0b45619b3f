//! Session store - authenticated identity and credential lifecycle
//!
//! Owns the bearer credential used by every other controller. The session
//! is persisted as a single JSON record so a restart resumes logged in;
//! a record that fails to parse is discarded, never fatal. Validity of a
//! restored credential is discovered lazily through ordinary 401s.

use crate::api::{ApiClient, ApiError, LoginRequest, RegisterRequest};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;

const SESSION_FILE: &str = "session.json";

/// Minimum lengths enforced before any network call
const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

/// The authenticated identity, as returned by login/register and as
/// persisted on disk between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub session_token: String,
}

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// Client-side precondition failure; no network call was made
    #[error("{0}")]
    Validation(String),

    /// The credential endpoint rejected the request
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Reading or writing the persisted record failed
    #[error("Session storage error: {0}")]
    Storage(String),
}

/// Holds the active session and its persisted copy
///
/// Exactly one session may be active; `None` is the logged-out state and
/// gates every other controller.
pub struct SessionStore {
    api: Arc<ApiClient>,
    path: PathBuf,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Create a store persisting under `dir` (the app data directory)
    pub fn new(api: Arc<ApiClient>, dir: &Path) -> Self {
        Self {
            api,
            path: dir.join(SESSION_FILE),
            current: RwLock::new(None),
        }
    }

    fn read_current(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(|poisoned| {
            tracing::warn!("session lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_current(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(|poisoned| {
            tracing::warn!("session lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Adopt any persisted session record; discard it if unreadable.
    ///
    /// Purely local: a stale credential is only noticed once a later call
    /// comes back 401.
    pub fn restore(&self) {
        if !self.path.exists() {
            return;
        }
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) => {
                    tracing::debug!(username = %session.username, "restored session");
                    *self.write_current() = Some(session);
                }
                Err(err) => {
                    tracing::warn!("discarding corrupt session record: {err}");
                    let _ = std::fs::remove_file(&self.path);
                }
            },
            Err(err) => {
                tracing::warn!("failed to read session record: {err}");
            }
        }
    }

    /// The active session, if logged in
    pub fn current(&self) -> Option<Session> {
        self.read_current().clone()
    }

    /// The bearer token for API calls, if logged in
    pub fn token(&self) -> Option<String> {
        self.read_current().as_ref().map(|s| s.session_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_current().is_some()
    }

    /// Exchange credentials for a session and persist it.
    ///
    /// A prior session is left untouched on failure.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, SessionError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(SessionError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let session: Session = self
            .api
            .post(
                "/api/auth/login",
                &LoginRequest { username, password },
                None,
            )
            .await
            .map_err(map_auth_error("Invalid credentials"))?;

        self.adopt(session.clone())?;
        Ok(session)
    }

    /// Register a new account; same session contract as `login`.
    ///
    /// All validation happens before the network call. `email` is omitted
    /// from the request entirely when absent.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
        email: Option<&str>,
    ) -> Result<Session, SessionError> {
        if username.trim().len() < MIN_USERNAME_LEN {
            return Err(SessionError::Validation(format!(
                "Username must be at least {MIN_USERNAME_LEN} characters"
            )));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(SessionError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if password != confirm_password {
            return Err(SessionError::Validation(
                "Passwords do not match".to_string(),
            ));
        }

        let email = email.map(str::trim).filter(|e| !e.is_empty());
        let session: Session = self
            .api
            .post(
                "/api/auth/register",
                &RegisterRequest {
                    username,
                    password,
                    email,
                },
                None,
            )
            .await
            .map_err(map_auth_error("Username already exists or registration failed"))?;

        self.adopt(session.clone())?;
        Ok(session)
    }

    fn adopt(&self, session: Session) -> Result<(), SessionError> {
        self.persist(&session)?;
        *self.write_current() = Some(session);
        Ok(())
    }

    fn persist(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::Storage(e.to_string()))?;
        }
        let raw =
            serde_json::to_string_pretty(session).map_err(|e| SessionError::Storage(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| SessionError::Storage(e.to_string()))
    }

    /// Drop a credential the server has rejected.
    ///
    /// Local only: the persisted record is removed so the next run starts
    /// logged out, but no invalidation call is made for a token the
    /// server already refuses.
    pub fn forget(&self) {
        *self.write_current() = None;
        let _ = std::fs::remove_file(&self.path);
        tracing::debug!("dropped rejected session credential");
    }

    /// Log out: local state and the persisted record are cleared
    /// synchronously, then a best-effort remote invalidation is issued in
    /// the background. Its failure is logged and never surfaced; callers
    /// that are about to exit may await the returned task with a bound so
    /// the request gets a chance to leave.
    pub fn logout(&self) -> Option<tokio::task::JoinHandle<()>> {
        let token = {
            let mut guard = self.write_current();
            guard.take().map(|s| s.session_token)
        };
        let _ = std::fs::remove_file(&self.path);

        token.map(|token| {
            let api = Arc::clone(&self.api);
            tokio::spawn(async move {
                if let Err(err) = api.post_empty("/api/auth/logout", Some(&token)).await {
                    tracing::warn!("logout invalidation failed: {err}");
                }
            })
        })
    }
}

/// Replace status errors that carry no server message with a friendlier
/// fallback; network errors pass through untouched.
fn map_auth_error(fallback: &'static str) -> impl Fn(ApiError) -> SessionError {
    move |err| match err {
        ApiError::Status {
            status,
            message: None,
        } => SessionError::Api(ApiError::Status {
            status,
            message: Some(fallback.to_string()),
        }),
        other => SessionError::Api(other),
    }
}
