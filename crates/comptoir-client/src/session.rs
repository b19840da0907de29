//! # Auth Session Manager
//!
//! Owns the in-memory session and keeps it in step with the durable store.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Session Lifecycle                                 │
//! │                                                                         │
//! │  Process start                                                          │
//! │  { user: None, token: None, loading: true }     route = Loading         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  restore() ── reads token, user ──► store                              │
//! │       │        unparseable user? delete key, user = None                │
//! │       │        read failed? treat as no session                         │
//! │       ▼                                                                 │
//! │  { …, loading: false }                 route = Login | Dashboard        │
//! │       │                                                                 │
//! │       ├── login(token, user) ─ set_many ─► memory updated on success   │
//! │       │                                    only                         │
//! │       ├── update_user(patch) ─ set(user) ─► memory updated on success  │
//! │       │                                                                 │
//! │       └── logout() ─ delete_many (best effort) ─► memory always cleared │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Single Writer
//! Only this manager writes the `token` and `user` keys. State changes are
//! published on a `tokio::sync::watch` channel; screens hold a receiver
//! from [`SessionManager::subscribe`] and re-render on change.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use comptoir_core::validation::validate_email;
use comptoir_core::{User, UserPatch, ValidationError};
use comptoir_store::{keys, KeyValueStore};

use crate::error::{ClientError, ClientResult};

// =============================================================================
// Session
// =============================================================================

/// The in-memory representation of the current actor and token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user: Option<User>,
    #[serde(skip)]
    pub token: Option<String>,
    pub loading: bool,
}

impl Session {
    /// State at process start, before `restore()` resolves.
    pub fn initial() -> Self {
        Session {
            user: None,
            token: None,
            loading: true,
        }
    }

    /// Both a token and a readable user are present.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    /// Which top-level screen to show.
    pub fn route(&self) -> Route {
        if self.loading {
            Route::Loading
        } else if self.is_authenticated() {
            Route::Dashboard
        } else {
            Route::Login
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::initial()
    }
}

/// The routing decision derived from a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Restore or a login/logout is still running.
    Loading,
    /// Show the login screen.
    Login,
    /// Show the authenticated area.
    Dashboard,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Loading => write!(f, "loading"),
            Route::Login => write!(f, "login"),
            Route::Dashboard => write!(f, "dashboard"),
        }
    }
}

// =============================================================================
// Token Provider
// =============================================================================

/// Source of the bearer token, read fresh for every outgoing request.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

// =============================================================================
// Session Manager
// =============================================================================

/// Owns the process-wide session.
///
/// ## Usage
/// ```rust,ignore
/// let session = SessionManager::new(store);
/// session.restore().await;
/// match session.route() {
///     Route::Dashboard => show_dashboard(),
///     Route::Login => show_login(),
///     Route::Loading => show_splash(),
/// }
/// ```
pub struct SessionManager<S> {
    store: S,
    state: watch::Sender<Session>,
    restored: AtomicBool,
}

impl<S: KeyValueStore> SessionManager<S> {
    pub fn new(store: S) -> Self {
        let (state, _) = watch::channel(Session::initial());
        SessionManager {
            store,
            state,
            restored: AtomicBool::new(false),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Restore
    // =========================================================================

    /// Loads the persisted session.
    ///
    /// Never fails: read errors are logged and leave the session logged out.
    /// Runs once per manager; later calls return the current snapshot.
    pub async fn restore(&self) -> Session {
        if self.restored.swap(true, Ordering::SeqCst) {
            debug!("Session already restored, skipping");
            return self.snapshot();
        }

        let mut token = match self.store.get(keys::TOKEN).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token, starting logged out");
                None
            }
        };

        let user = match self.store.get(keys::USER).await {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "Stored user record is unreadable, discarding it");
                    if let Err(e) = self.store.delete(keys::USER).await {
                        warn!(error = %e, "Failed to delete unreadable user record");
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored user, starting logged out");
                token = None;
                None
            }
        };

        self.state.send_modify(|s| {
            s.token = token;
            s.user = user;
            s.loading = false;
        });

        let session = self.snapshot();
        info!(
            authenticated = session.is_authenticated(),
            user_id = session.user.as_ref().map(|u| u.id),
            "Session restored"
        );
        session
    }

    // =========================================================================
    // Login / Logout
    // =========================================================================

    /// Persists `token` and `user`, then publishes them.
    ///
    /// Both keys are written in one atomic batch. If that fails the
    /// in-memory session keeps its previous values and the storage error is
    /// returned.
    pub async fn login(&self, token: String, user: User) -> ClientResult<()> {
        self.state.send_modify(|s| s.loading = true);

        match self.persist_login(&token, &user).await {
            Ok(()) => {
                info!(user_id = user.id, "User logged in");
                self.state.send_modify(|s| {
                    s.token = Some(token);
                    s.user = Some(user);
                    s.loading = false;
                });
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to persist session, login aborted");
                self.state.send_modify(|s| s.loading = false);
                Err(e)
            }
        }
    }

    async fn persist_login(&self, token: &str, user: &User) -> ClientResult<()> {
        let raw_user =
            serde_json::to_string(user).map_err(|e| ClientError::Serialization(e.to_string()))?;
        self.store
            .set_many(&[(keys::TOKEN, token), (keys::USER, raw_user.as_str())])
            .await?;
        Ok(())
    }

    /// Clears the session. Store failures are logged, never returned.
    pub async fn logout(&self) {
        self.state.send_modify(|s| s.loading = true);

        if let Err(e) = self.store.delete_many(&keys::SESSION).await {
            warn!(error = %e, "Failed to delete stored session, clearing memory anyway");
        }

        self.state.send_modify(|s| {
            s.token = None;
            s.user = None;
            s.loading = false;
        });
        info!("User logged out");
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Merges `patch` into the current user and persists the result.
    ///
    /// ## Errors
    /// - `NotAuthenticated` when no user is loaded
    /// - `Core(Validation)` for an invalid email or empty name
    /// - `Storage` when the record cannot be written (memory unchanged)
    pub async fn update_user(&self, patch: UserPatch) -> ClientResult<User> {
        let current = self
            .snapshot()
            .user
            .ok_or(ClientError::NotAuthenticated)?;

        if let Some(email) = &patch.email {
            validate_email(email)?;
        }
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "name".to_string(),
                }
                .into());
            }
        }

        let normalized = UserPatch {
            email: patch.email.map(|e| e.trim().to_string()),
            name: patch.name.map(|n| n.trim().to_string()),
        };
        let updated = current.apply(&normalized);

        let raw_user =
            serde_json::to_string(&updated).map_err(|e| ClientError::Serialization(e.to_string()))?;
        self.store.set(keys::USER, &raw_user).await?;

        self.state.send_modify(|s| s.user = Some(updated.clone()));
        debug!(user_id = updated.id, "User record updated");
        Ok(updated)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver notified on every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn current_token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn route(&self) -> Route {
        self.state.borrow().route()
    }
}

impl<S: KeyValueStore> TokenProvider for SessionManager<S> {
    fn token(&self) -> Option<String> {
        self.current_token()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
