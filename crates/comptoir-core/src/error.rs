//! # Error Types
//!
//! Domain-specific error types for comptoir-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  comptoir-core errors (this file)                                      │
//! │  ├── CoreError        - Cart / sale rule violations                    │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  comptoir-store errors                                                 │
//! │  └── StoreError       - Key-value store failures                       │
//! │                                                                         │
//! │  comptoir-client errors                                                │
//! │  └── ClientError      - Storage | Network | Validation (what UI sees)  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError::Core → Screen        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and sale rule violations.
///
/// None of these mutate state: when a cart operation returns one of them the
/// cart is exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The requested quantity is larger than the stock on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart has R1 × 3, stock is 5
    ///      │
    ///      ▼
    /// add_to_cart(R1, 4) → 3 + 4 = 7 > 5
    ///      │
    ///      ▼
    /// InsufficientStock { reference: "R1", available: 5, requested: 7 }
    ///      │
    ///      ▼
    /// UI shows: "Only 5 R1 in stock", cart still holds R1 × 3
    /// ```
    #[error("Insufficient stock for {reference}: available {available}, requested {requested}")]
    InsufficientStock {
        reference: String,
        available: i64,
        requested: i64,
    },

    /// Cart has reached the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds the per-line maximum.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// A sale cannot be submitted without lines.
    #[error("Cannot submit a sale with an empty cart")]
    EmptyCart,

    /// Amount paid is not acceptable.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// The product and quantity lists of a sale payload do not line up.
    #[error("Sale payload lists are misaligned: {references} references, {quantities} quantities")]
    MisalignedPayload { references: usize, quantities: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic runs; their `Display` output is
/// shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
