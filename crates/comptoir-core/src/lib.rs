//! # comptoir-core: Pure Business Logic for Comptoir
//!
//! Cart arithmetic, sale formatting and the domain types shared by every
//! other crate. Nothing here touches the disk or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Comptoir Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Screens / CLI (external collaborators)             │   │
//! │  │     Login ──► Dashboard ──► Products ──► Cart ──► Checkout      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          comptoir-client (session, gateway, services)           │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────────┐  ┌────────────▼───────────────┐   │
//! │  │  ★ comptoir-core (THIS CRATE) ★ │  │  comptoir-store            │   │
//! │  │                                 │  │  token / user key-values   │   │
//! │  │  money · types · cart · sale    │  └────────────────────────────┘   │
//! │  │  listing · validation           │                                   │
//! │  │                                 │                                   │
//! │  │  NO I/O • NO NETWORK            │                                   │
//! │  └─────────────────────────────────┘                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer money in minor units
//! - [`types`] - Domain types (User, Product, Discount, PaymentMethod, ...)
//! - [`cart`] - Cart operations, summary, stock checks
//! - [`sale`] - Sale draft and the wire payload sent to `/ventes`
//! - [`listing`] - Client-side search and pagination
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use comptoir_core::{Cart, Discount, DiscountRate, Money, Product};
//!
//! let soap = Product {
//!     reference: "SAV-250".into(),
//!     designation: "Savon 250g".into(),
//!     unit_price: Money::from_minor(2_500),
//!     stock: 40,
//!     category: None,
//! };
//!
//! let mut cart = Cart::new();
//! cart.add_to_cart(&soap, 4).unwrap();
//!
//! let discount = Discount::Percent(DiscountRate::from_percent(10));
//! let summary = cart.calculate_summary(Some(&discount));
//! assert_eq!(summary.subtotal.minor(), 10_000);
//! assert_eq!(summary.net_amount.minor(), 9_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod listing;
pub mod money;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{
    Cart, CartItem, CartSummary, QuantityChange, StockAdjustment, StockCheck, StockLevels,
    StockValidation,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use listing::{filter_by_query, paginate, Page, Searchable};
pub use money::Money;
pub use sale::{format_for_submission, SaleDraft, SaleLine, SalePayload};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single cart line.
///
/// Catches typing 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Minimum password length accepted before calling the login endpoint.
pub const MIN_PASSWORD_LENGTH: usize = 6;
