//! # API Gateway
//!
//! Every REST call goes through here: the bearer token is attached and
//! failures come back as a normalized [`ApiError`].
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Request Interceptor                              │
//! │                                                                         │
//! │  service.list()                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiGateway::send(method, path, body, family)                          │
//! │       │                                                                 │
//! │       ├── tokens.token()  ← read fresh, never cached here              │
//! │       │      Some(t) → Authorization: Bearer t                          │
//! │       │      None    → no header                                        │
//! │       ▼                                                                 │
//! │  reqwest ──────────────────────────────► backend                        │
//! │       │                                                                 │
//! │       ├── 2xx           → body deserialized as T                        │
//! │       ├── 4xx / 5xx     → normalize_error(Some(status), body, family)  │
//! │       └── no response   → normalize_error(None, "", family)  code 500  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiSettings;
use crate::error::{ApiError, ClientError, ClientResult};
use crate::session::TokenProvider;

// =============================================================================
// Endpoint Family
// =============================================================================

/// A group of endpoints sharing a default error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointFamily {
    Auth,
    Users,
    Products,
    Sales,
    Expenses,
    Clients,
    Company,
    Proforma,
}

impl EndpointFamily {
    /// Message shown when the server gives none.
    pub fn default_message(&self) -> &'static str {
        match self {
            EndpointFamily::Auth => "Erreur d'authentification",
            EndpointFamily::Users => "Erreur lors de la gestion du profil",
            EndpointFamily::Products => "Erreur lors de la gestion des produits",
            EndpointFamily::Sales => "Erreur lors de la gestion des ventes",
            EndpointFamily::Expenses => "Erreur lors de la gestion des dépenses",
            EndpointFamily::Clients => "Erreur lors de la gestion des clients",
            EndpointFamily::Company => "Erreur lors de la gestion de l'entreprise",
            EndpointFamily::Proforma => "Erreur lors de la gestion des proformas",
        }
    }
}

impl fmt::Display for EndpointFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EndpointFamily::Auth => "auth",
            EndpointFamily::Users => "users",
            EndpointFamily::Products => "products",
            EndpointFamily::Sales => "sales",
            EndpointFamily::Expenses => "expenses",
            EndpointFamily::Clients => "clients",
            EndpointFamily::Company => "company",
            EndpointFamily::Proforma => "proforma",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Error Normalization
// =============================================================================

/// Turns a failed response into an [`ApiError`].
///
/// ## Rules
/// - `status = None` (no response): code 500
/// - message: the body's `message` field, else its `error` field (string,
///   or an object carrying `message`), else the family default
///
/// ## Example
/// ```rust
/// use comptoir_client::gateway::{normalize_error, EndpointFamily};
///
/// let err = normalize_error(Some(401), r#"{"message":"Mot de passe incorrect"}"#, EndpointFamily::Auth);
/// assert_eq!(err.code, 401);
/// assert_eq!(err.message, "Mot de passe incorrect");
///
/// let err = normalize_error(None, "", EndpointFamily::Products);
/// assert_eq!(err.code, 500);
/// ```
pub fn normalize_error(status: Option<u16>, body: &str, family: EndpointFamily) -> ApiError {
    let code = status.unwrap_or(ApiError::TRANSPORT_CODE);
    let message = server_message(body).unwrap_or_else(|| family.default_message().to_string());
    ApiError { message, code }
}

fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let non_empty = |v: Option<&serde_json::Value>| {
        v.and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    non_empty(value.get("message"))
        .or_else(|| non_empty(value.get("error")))
        .or_else(|| non_empty(value.get("error").and_then(|e| e.get("message"))))
}

// =============================================================================
// Gateway
// =============================================================================

/// HTTP client for the business API.
///
/// Cheap to clone; clones share the connection pool and token provider.
#[derive(Clone)]
pub struct ApiGateway {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiGateway {
    /// Builds a gateway from settings and a token source.
    pub fn new(settings: &ApiSettings, tokens: Arc<dyn TokenProvider>) -> ClientResult<Self> {
        let mut base = settings.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| ClientError::Config(format!("Invalid API URL '{}': {}", base, e)))?;

        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .connect_timeout(settings.connect_timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(ApiGateway {
            http,
            base_url,
            tokens,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, family: EndpointFamily) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| {
                warn!(path = %path, error = %e, "Invalid endpoint path");
                ApiError::new(family.default_message(), ApiError::TRANSPORT_CODE)
            })
    }

    /// URL of one record: `{collection}/{id}`, with `id` percent-encoded as a
    /// single path segment (`/`, `?`, `#` stay part of the id).
    pub fn item_url(
        &self,
        collection: &str,
        id: &str,
        family: EndpointFamily,
    ) -> Result<Url, ApiError> {
        let mut url = self.endpoint(collection, family)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::new(family.default_message(), ApiError::TRANSPORT_CODE))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// Sends a request and decodes a JSON response.
    ///
    /// An empty 2xx body decodes as JSON `null`, so `()` and `Option<T>`
    /// work for endpoints that return nothing.
    pub async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        family: EndpointFamily,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path, family)?;
        self.send_to(method, url, body, family).await
    }

    /// Like [`send`](Self::send), for an already resolved URL.
    pub async fn send_to<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        family: EndpointFamily,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let token = self.tokens.token();
        let path = url.path().to_string();

        debug!(
            method = %method,
            path = %path,
            family = %family,
            authenticated = token.is_some(),
            "API request"
        );

        let mut request = self.http.request(method.clone(), url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(family = %family, error = %e, "API request failed before a response");
            normalize_error(None, "", family)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            warn!(family = %family, error = %e, "Failed to read API response body");
            normalize_error(Some(status.as_u16()), "", family)
        })?;

        if !status.is_success() {
            let err = normalize_error(Some(status.as_u16()), &text, family);
            warn!(
                method = %method,
                path = %path,
                code = err.code,
                message = %err.message,
                "API error"
            );
            return Err(err);
        }

        let raw = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(raw).map_err(|e| {
            warn!(
                family = %family,
                status = status.as_u16(),
                error = %e,
                "Unexpected API response shape"
            );
            ApiError::new(family.default_message(), ApiError::TRANSPORT_CODE)
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        family: EndpointFamily,
    ) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::GET, path, None, family).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B, family: EndpointFamily) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, Some(body), family).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B, family: EndpointFamily) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PUT, path, Some(body), family).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B, family: EndpointFamily) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PATCH, path, Some(body), family).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        family: EndpointFamily,
    ) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::DELETE, path, None, family).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
