//! # Client Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      What the Screens See                               │
//! │                                                                         │
//! │  ClientError ──kind()──►  Storage     store read/write failed           │
//! │                           Network     HTTP failure, normalized ApiError │
//! │                           Validation  bad input, cart rule, stock       │
//! │                                                                         │
//! │  StoreError  ─────────►  ClientError::Storage                          │
//! │  ApiError    ─────────►  ClientError::Api                              │
//! │  CoreError   ─────────►  ClientError::Core                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! `ClientError::payload()` is what a UI layer receives:
//! ```json
//! { "kind": "network", "message": "Identifiants invalides", "code": 401 }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use comptoir_core::{CoreError, StockAdjustment, ValidationError};
use comptoir_store::StoreError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

// =============================================================================
// API Error
// =============================================================================

/// A failed REST call, normalized.
///
/// `code` is the HTTP status, or 500 when the request never got a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message} ({code})")]
pub struct ApiError {
    pub message: String,
    pub code: u16,
}

impl ApiError {
    /// Status used when no HTTP response was received.
    pub const TRANSPORT_CODE: u16 = 500;

    pub fn new(message: impl Into<String>, code: u16) -> Self {
        ApiError {
            message: message.into(),
            code,
        }
    }

    /// True for 401 responses.
    pub fn is_unauthorized(&self) -> bool {
        self.code == 401
    }
}

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse category used by screens to pick how to present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Storage,
    Network,
    Validation,
}

// =============================================================================
// Client Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ClientError {
    /// The local key-value store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// A stored or outgoing record could not be encoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A REST call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A cart, sale or input rule was violated.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The operation needs a logged-in user.
    #[error("No user is logged in")]
    NotAuthenticated,

    /// Quantities were lowered to match stock; the user must confirm.
    #[error("Stock changed: {} line(s) adjusted, please review the cart", .0.changes.len())]
    StockAdjusted(StockAdjustment),

    /// Configuration could not be loaded or is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Storage(_) | ClientError::Serialization(_) => ErrorKind::Storage,
            ClientError::Api(_) => ErrorKind::Network,
            ClientError::Core(_)
            | ClientError::NotAuthenticated
            | ClientError::StockAdjusted(_)
            | ClientError::Config(_) => ErrorKind::Validation,
        }
    }

    /// HTTP status for network errors.
    pub fn code(&self) -> Option<u16> {
        match self {
            ClientError::Api(api) => Some(api.code),
            _ => None,
        }
    }

    /// Message for display. Network errors show the server's text only.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api(api) => api.message.clone(),
            other => other.to_string(),
        }
    }

    /// Serializable form for a UI layer.
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.user_message(),
            code: self.code(),
        }
    }
}

impl From<ValidationError> for ClientError {
    fn from(err: ValidationError) -> Self {
        ClientError::Core(CoreError::Validation(err))
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

/// Serialized error for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let storage = ClientError::from(StoreError::QueryFailed("disk I/O error".into()));
        assert_eq!(storage.kind(), ErrorKind::Storage);

        let network = ClientError::from(ApiError::new("Identifiants invalides", 401));
        assert_eq!(network.kind(), ErrorKind::Network);
        assert_eq!(network.code(), Some(401));
        assert_eq!(network.user_message(), "Identifiants invalides");

        let validation = ClientError::from(ValidationError::Required {
            field: "email".into(),
        });
        assert_eq!(validation.kind(), ErrorKind::Validation);
        assert_eq!(validation.code(), None);
    }

    #[test]
    fn test_payload_shape() {
        let err = ClientError::from(ApiError::new("Erreur serveur", 500));
        let json = serde_json::to_value(err.payload()).unwrap();
        assert_eq!(json["kind"], "network");
        assert_eq!(json["message"], "Erreur serveur");
        assert_eq!(json["code"], 500);

        let json = serde_json::to_value(ClientError::NotAuthenticated.payload()).unwrap();
        assert_eq!(json["kind"], "validation");
        assert!(json.get("code").is_none());
    }
}
