//! # Authentication
//!
//! [`AuthService`] speaks to the `/auth` and `/users` endpoints.
//! [`Authenticator`] ties it to the [`SessionManager`] so that a successful
//! remote login becomes a persisted session.
//!
//! ## Sign-in Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Login screen                                                          │
//! │       │  email, password                                                │
//! │       ▼                                                                 │
//! │  Authenticator::sign_in                                                │
//! │       ├── validate_email / validate_password ── invalid? → Validation  │
//! │       ▼                                                                 │
//! │  AuthService::login ── POST /auth/login {email, mot_de_passe}          │
//! │       ├── success=false / no token → ApiError 401 (server message)     │
//! │       ▼                                                                 │
//! │  SessionManager::login(token, user) ── store failed? → Storage         │
//! │       ▼                                                                 │
//! │  route() = Dashboard                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use comptoir_core::validation::{validate_email, validate_password};
use comptoir_core::{User, UserPatch, ValidationError};
use comptoir_store::KeyValueStore;

use crate::error::{ApiError, ClientError, ClientResult};
use crate::gateway::{ApiGateway, EndpointFamily};
use crate::session::SessionManager;

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    mot_de_passe: &'a str,
}

/// Body of a new account registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    #[serde(rename = "nom")]
    pub name: String,
    pub email: String,
    #[serde(rename = "mot_de_passe")]
    pub password: String,
}

/// Response of `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthResponse {
    fn rejected(&self) -> bool {
        self.success == Some(false)
    }
}

/// A successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub user: User,
}

/// Profile endpoints answer either `{ user: {...} }` or the bare record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfileResponse {
    Wrapped { user: User },
    Bare(User),
}

impl From<ProfileResponse> for User {
    fn from(response: ProfileResponse) -> Self {
        match response {
            ProfileResponse::Wrapped { user } => user,
            ProfileResponse::Bare(user) => user,
        }
    }
}

const UNAUTHORIZED: u16 = 401;

// =============================================================================
// Auth Service
// =============================================================================

/// Client for the authentication and profile endpoints.
#[derive(Clone)]
pub struct AuthService {
    gateway: ApiGateway,
}

impl AuthService {
    pub fn new(gateway: ApiGateway) -> Self {
        AuthService { gateway }
    }

    /// `POST /auth/login`.
    ///
    /// ## Errors
    /// `Api` with code 401 when the server answers `success: false` or
    /// leaves out the token or user.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Credentials> {
        let body = LoginRequest {
            email,
            mot_de_passe: password,
        };
        let response: AuthResponse = self
            .gateway
            .post("/auth/login", &body, EndpointFamily::Auth)
            .await?;

        let rejection = |response: &AuthResponse| {
            ApiError::new(
                response
                    .message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| EndpointFamily::Auth.default_message().to_string()),
                UNAUTHORIZED,
            )
        };

        if response.rejected() {
            return Err(rejection(&response).into());
        }

        match (response.token.clone(), response.user.clone()) {
            (Some(token), Some(user)) if !token.is_empty() => Ok(Credentials { token, user }),
            _ => Err(rejection(&response).into()),
        }
    }

    /// `POST /auth/register`.
    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthResponse> {
        let response: AuthResponse = self
            .gateway
            .post("/auth/register", request, EndpointFamily::Auth)
            .await?;

        if response.rejected() {
            let message = response
                .message
                .clone()
                .unwrap_or_else(|| EndpointFamily::Auth.default_message().to_string());
            return Err(ApiError::new(message, 400).into());
        }
        Ok(response)
    }

    /// `POST /auth/logout`. Invalidates the token server-side.
    pub async fn logout(&self) -> ClientResult<()> {
        let _: serde_json::Value = self
            .gateway
            .post("/auth/logout", &serde_json::json!({}), EndpointFamily::Auth)
            .await?;
        Ok(())
    }

    /// `GET /users/profile`.
    pub async fn profile(&self) -> ClientResult<User> {
        let response: ProfileResponse = self
            .gateway
            .get("/users/profile", EndpointFamily::Users)
            .await?;
        Ok(response.into())
    }

    /// `PUT /users/profile`.
    pub async fn update_profile(&self, patch: &UserPatch) -> ClientResult<User> {
        let response: ProfileResponse = self
            .gateway
            .put("/users/profile", patch, EndpointFamily::Users)
            .await?;
        Ok(response.into())
    }
}

// =============================================================================
// Authenticator
// =============================================================================

/// Remote authentication plus local session, as one unit.
pub struct Authenticator<S> {
    service: AuthService,
    session: Arc<SessionManager<S>>,
}

impl<S> Clone for Authenticator<S> {
    fn clone(&self) -> Self {
        Authenticator {
            service: self.service.clone(),
            session: Arc::clone(&self.session),
        }
    }
}

impl<S: KeyValueStore> Authenticator<S> {
    pub fn new(service: AuthService, session: Arc<SessionManager<S>>) -> Self {
        Authenticator { service, session }
    }

    pub fn service(&self) -> &AuthService {
        &self.service
    }

    pub fn session(&self) -> &Arc<SessionManager<S>> {
        &self.session
    }

    /// Validates the form, logs in remotely and persists the session.
    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<User> {
        let email = email.trim();
        validate_email(email)?;
        validate_password(password)?;

        let credentials = self.service.login(email, password).await?;
        let user = credentials.user.clone();
        self.session.login(credentials.token, credentials.user).await?;

        info!(user_id = user.id, "Signed in");
        Ok(user)
    }

    /// Tells the backend, then always clears the local session.
    pub async fn sign_out(&self) {
        if self.session.current_token().is_some() {
            if let Err(e) = self.service.logout().await {
                warn!(error = %e, "Remote logout failed, clearing local session anyway");
            }
        }
        self.session.logout().await;
    }

    /// Fetches the profile with the stored token.
    ///
    /// A 401 means the backend no longer accepts the token: the local
    /// session is cleared before the error is returned, so the next route
    /// is the login screen. Other failures leave the session alone.
    pub async fn refresh_profile(&self) -> ClientResult<User> {
        if self.session.current_token().is_none() {
            return Err(ClientError::NotAuthenticated);
        }

        match self.service.profile().await {
            Err(ClientError::Api(api)) if api.is_unauthorized() => {
                warn!(message = %api.message, "Stored token rejected, clearing session");
                self.session.logout().await;
                Err(ClientError::Api(api))
            }
            other => other,
        }
    }

    /// Changes the account email remotely, then in the stored user.
    pub async fn change_email(&self, new_email: &str) -> ClientResult<User> {
        let new_email = new_email.trim();
        validate_email(new_email)?;

        let current = self
            .session
            .current_user()
            .ok_or(ClientError::NotAuthenticated)?;
        if current.email == new_email {
            return Err(ValidationError::InvalidFormat {
                field: "email".to_string(),
                reason: "is the same as the current email".to_string(),
            }
            .into());
        }

        let remote = self
            .service
            .update_profile(&UserPatch::email(new_email))
            .await?;
        self.session.update_user(UserPatch::email(remote.email)).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
