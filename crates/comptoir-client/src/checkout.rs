//! # Checkout
//!
//! The I/O half of stock checking and sale submission. The arithmetic lives
//! in `comptoir_core::cart`; this module fetches live stock and talks to
//! `/ventes`.
//!
//! ## Submission Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  submit_sale(draft)                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  fetch_stock_levels ── one lookup per line, failure → unknown (0)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cart.adjust_quantities_by_stock                                       │
//! │       ├── something lowered? → Err(StockAdjusted), user confirms       │
//! │       ▼                                                                 │
//! │  format_for_submission(draft, now)                                     │
//! │       ▼                                                                 │
//! │  POST /ventes ── failed? → Err, cart kept                              │
//! │       ▼                                                                 │
//! │  cart.clear()                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;
use tracing::{info, warn};

use comptoir_core::{
    format_for_submission, Cart, SaleDraft, SalePayload, StockAdjustment, StockLevels,
    StockValidation,
};

use crate::error::{ClientError, ClientResult};
use crate::resources::SaleService;

/// Source of live stock figures.
#[async_trait]
pub trait StockLookup: Send + Sync {
    async fn available_stock(&self, reference: &str) -> ClientResult<i64>;
}

/// Looks up stock for every cart line.
///
/// A failed lookup is logged and recorded as unknown; it does not stop the
/// other lookups.
pub async fn fetch_stock_levels<L>(cart: &Cart, lookup: &L) -> StockLevels
where
    L: StockLookup + ?Sized,
{
    let mut levels = StockLevels::new();
    for item in cart.items() {
        let level = match lookup.available_stock(&item.reference).await {
            Ok(available) => Some(available),
            Err(e) => {
                warn!(
                    reference = %item.reference,
                    error = %e,
                    "Stock lookup failed, treating as unavailable"
                );
                None
            }
        };
        levels.insert(item.reference.clone(), level);
    }
    levels
}

/// Checks the cart against live stock without changing it.
pub async fn validate_stock<L>(cart: &Cart, lookup: &L) -> StockValidation
where
    L: StockLookup + ?Sized,
{
    let levels = fetch_stock_levels(cart, lookup).await;
    cart.validate_stock(&levels)
}

/// Lowers cart quantities to live stock.
pub async fn adjust_quantities_by_stock<L>(cart: &mut Cart, lookup: &L) -> StockAdjustment
where
    L: StockLookup + ?Sized,
{
    let levels = fetch_stock_levels(cart, lookup).await;
    let adjustment = cart.adjust_quantities_by_stock(&levels);
    if adjustment.adjusted {
        info!(changes = adjustment.changes.len(), "Cart adjusted to available stock");
    }
    adjustment
}

/// A sale accepted by the backend.
#[derive(Debug, Clone)]
pub struct SaleReceipt {
    pub payload: SalePayload,
    pub response: Value,
}

/// Re-checks stock, then posts the sale.
///
/// ## Errors
/// - `StockAdjusted` when quantities had to be lowered. The draft's cart now
///   holds the adjusted quantities and nothing was sent.
/// - `Core` when the draft cannot be formatted (empty cart, bad amount).
/// - `Api` when the backend refuses; the cart is left as it was.
pub async fn submit_sale<L>(
    draft: &mut SaleDraft,
    lookup: &L,
    sales: &SaleService,
) -> ClientResult<SaleReceipt>
where
    L: StockLookup + ?Sized,
{
    let adjustment = adjust_quantities_by_stock(&mut draft.items, lookup).await;
    if adjustment.adjusted {
        return Err(ClientError::StockAdjusted(adjustment));
    }

    let payload = format_for_submission(draft, Local::now().naive_local())?;
    let response = sales.submit(&payload).await?;

    info!(
        invoice = %payload.ref_facture,
        lines = draft.items.line_count(),
        "Sale submitted"
    );
    draft.items.clear();

    Ok(SaleReceipt { payload, response })
}

// =============================================================================
// Unit Tests
// =============================================================================
