//! # Sale
//!
//! A sale draft (cart + payment parameters) and the payload the backend
//! expects on `POST /ventes`.
//!
//! ## Wire Format
//! ```text
//! Cart                                  SalePayload
//! ────                                  ───────────
//! R1 × 2  @ 5 000          ┌──────────► ref_facture        "20240301143005"
//! R2 × 1  @ 10 000         │            ref_produit        "R1, R2"
//!                          │            qte_vendu          "2, 1"
//! discount 10%  ───────────┤            remise             "10%"
//! paid 20 000              │            montant_a_payer    18000
//! cash                     │            montant_paye       20000
//!                          └──────────► mode_paiement      "cash"
//! ```
//!
//! The product and quantity lists are positional: the i-th quantity belongs
//! to the i-th reference. Both are produced from one pass over the cart
//! lines, and [`SalePayload::lines`] re-pairs them to check alignment.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{Cart, CartSummary};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Discount, PaymentMethod};
use crate::validation::{validate_amount_paid, validate_discount_rate, validate_reference};

/// Separator between entries of `ref_produit` and `qte_vendu`.
const LIST_SEPARATOR: &str = ", ";

/// `ref_facture` timestamp layout (yyyyMMddHHmmss).
const INVOICE_REF_FORMAT: &str = "%Y%m%d%H%M%S";

// =============================================================================
// Sale Draft
// =============================================================================

/// A cart plus payment and discount parameters, not yet submitted.
///
/// Lives only in memory; nothing about a draft is stored locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleDraft {
    pub items: Cart,
    pub payment_method: PaymentMethod,
    pub amount_paid: Money,
    pub discount: Option<Discount>,
    /// Customer identifier sent as `identifiant` (empty for walk-in sales).
    pub client_identifier: String,
    /// Free-text payment terms sent as `condition_paiement`.
    pub payment_condition: String,
}

impl SaleDraft {
    /// Starts a draft from a cart with cash payment and no discount.
    pub fn new(items: Cart) -> Self {
        SaleDraft {
            items,
            ..Default::default()
        }
    }

    /// Totals for this draft (discount applied once to the subtotal).
    pub fn summary(&self) -> CartSummary {
        self.items.calculate_summary(self.discount.as_ref())
    }

    /// `max(0, net)`, the amount the customer owes.
    pub fn net_amount(&self) -> Money {
        self.summary().net_amount
    }

    /// Change to hand back: `max(0, amount_paid − net)`.
    pub fn change_due(&self) -> Money {
        (self.amount_paid - self.net_amount()).floor_zero()
    }

    /// Amount still owed: `max(0, net − amount_paid)`.
    pub fn balance_due(&self) -> Money {
        (self.net_amount() - self.amount_paid).floor_zero()
    }
}

// =============================================================================
// Sale Payload
// =============================================================================

/// The body of `POST /ventes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalePayload {
    /// Invoice reference, the submission time as `yyyyMMddHHmmss`.
    pub ref_facture: String,
    /// Comma-joined product references.
    pub ref_produit: String,
    /// Comma-joined quantities, index-aligned with `ref_produit`.
    pub qte_vendu: String,
    pub identifiant: String,
    /// `"<pct>%"`, `"ar<amount>"`, or `"ar0"` when there is no discount.
    pub remise: String,
    pub mode_paiement: PaymentMethod,
    /// Net amount after discount.
    pub montant_a_payer: Money,
    pub montant_paye: Money,
    pub condition_paiement: String,
}

/// One (reference, quantity) pair recovered from a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLine {
    pub reference: String,
    pub quantity: i64,
}

impl SalePayload {
    /// Splits `ref_produit` and `qte_vendu` and pairs them by position.
    ///
    /// ## Errors
    /// - `MisalignedPayload` if the two lists have different lengths
    /// - `Validation` if a quantity is not an integer
    pub fn lines(&self) -> CoreResult<Vec<SaleLine>> {
        let references = split_list(&self.ref_produit);
        let quantities = split_list(&self.qte_vendu);

        if references.len() != quantities.len() {
            return Err(CoreError::MisalignedPayload {
                references: references.len(),
                quantities: quantities.len(),
            });
        }

        references
            .into_iter()
            .zip(quantities)
            .map(|(reference, qty)| -> CoreResult<SaleLine> {
                let quantity = qty.parse::<i64>().map_err(|_| ValidationError::InvalidFormat {
                    field: "qte_vendu".to_string(),
                    reason: format!("'{}' is not a quantity", qty),
                })?;
                Ok(SaleLine {
                    reference: reference.to_string(),
                    quantity,
                })
            })
            .collect()
    }
}

fn split_list(list: &str) -> Vec<&str> {
    if list.trim().is_empty() {
        return Vec::new();
    }
    list.split(',').map(str::trim).collect()
}

// =============================================================================
// Formatting
// =============================================================================

/// Builds the submission payload for `draft` at time `at`.
///
/// ## Errors
/// - `EmptyCart` when the draft has no lines
/// - `InvalidPaymentAmount` when the amount paid is negative
/// - `Validation` for a reference that cannot be comma-joined safely or an
///   out-of-range discount rate
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use comptoir_core::{format_for_submission, Cart, Money, Product, SaleDraft};
///
/// let product = |r: &str| Product {
///     reference: r.into(),
///     designation: r.into(),
///     unit_price: Money::from_minor(100),
///     stock: 10,
///     category: None,
/// };
/// let mut cart = Cart::new();
/// cart.add_to_cart(&product("R1"), 2).unwrap();
/// cart.add_to_cart(&product("R2"), 1).unwrap();
///
/// let at = NaiveDate::from_ymd_opt(2024, 3, 1)
///     .unwrap()
///     .and_hms_opt(14, 30, 5)
///     .unwrap();
/// let payload = format_for_submission(&SaleDraft::new(cart), at).unwrap();
/// assert_eq!(payload.ref_produit, "R1, R2");
/// assert_eq!(payload.qte_vendu, "2, 1");
/// assert_eq!(payload.ref_facture, "20240301143005");
/// ```
pub fn format_for_submission(draft: &SaleDraft, at: NaiveDateTime) -> CoreResult<SalePayload> {
    if draft.items.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    validate_amount_paid(draft.amount_paid).map_err(|e| CoreError::InvalidPaymentAmount {
        reason: e.to_string(),
    })?;

    if let Some(Discount::Percent(rate)) = draft.discount {
        validate_discount_rate(rate)?;
    }

    let mut references = Vec::with_capacity(draft.items.line_count());
    let mut quantities = Vec::with_capacity(draft.items.line_count());
    for line in draft.items.items() {
        validate_reference(&line.reference)?;
        references.push(line.reference.as_str());
        quantities.push(line.quantity.to_string());
    }

    let remise = draft
        .discount
        .map(|d| d.to_wire())
        .unwrap_or_else(|| "ar0".to_string());

    Ok(SalePayload {
        ref_facture: at.format(INVOICE_REF_FORMAT).to_string(),
        ref_produit: references.join(LIST_SEPARATOR),
        qte_vendu: quantities.join(LIST_SEPARATOR),
        identifiant: draft.client_identifier.clone(),
        remise,
        mode_paiement: draft.payment_method,
        montant_a_payer: draft.net_amount(),
        montant_paye: draft.amount_paid,
        condition_paiement: draft.payment_condition.clone(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiscountRate, Product};
    use chrono::NaiveDate;

    fn product(reference: &str, price: i64) -> Product {
        Product {
            reference: reference.to_string(),
            designation: reference.to_string(),
            unit_price: Money::from_minor(price),
            stock: 100,
            category: None,
        }
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap()
    }

    fn two_line_draft() -> SaleDraft {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 5_000), 2).unwrap();
        cart.add_to_cart(&product("R2", 10_000), 1).unwrap();
        SaleDraft::new(cart)
    }

    #[test]
    fn test_format_joins_aligned_lists() {
        let payload = format_for_submission(&two_line_draft(), at()).unwrap();

        assert_eq!(payload.ref_produit, "R1, R2");
        assert_eq!(payload.qte_vendu, "2, 1");
        assert_eq!(payload.ref_facture, "20240301090507");
    }

    #[test]
    fn test_lines_reflect_cart_order() {
        let draft = two_line_draft();
        let payload = format_for_submission(&draft, at()).unwrap();

        let lines = payload.lines().unwrap();
        assert_eq!(lines.len(), draft.items.line_count());
        for (line, item) in lines.iter().zip(draft.items.items()) {
            assert_eq!(line.reference, item.reference);
            assert_eq!(line.quantity, item.quantity);
        }
    }

    #[test]
    fn test_lines_detects_misalignment() {
        let mut payload = format_for_submission(&two_line_draft(), at()).unwrap();
        payload.qte_vendu = "2".to_string();

        assert_eq!(
            payload.lines().unwrap_err(),
            CoreError::MisalignedPayload {
                references: 2,
                quantities: 1
            }
        );
    }

    #[test]
    fn test_lines_rejects_non_numeric_quantity() {
        let mut payload = format_for_submission(&two_line_draft(), at()).unwrap();
        payload.qte_vendu = "2, deux".to_string();
        assert!(matches!(payload.lines(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_remise_wire_values() {
        let mut draft = two_line_draft();

        let payload = format_for_submission(&draft, at()).unwrap();
        assert_eq!(payload.remise, "ar0");
        assert_eq!(payload.montant_a_payer, Money::from_minor(20_000));

        draft.discount = Some(Discount::Percent(DiscountRate::from_percent(10)));
        let payload = format_for_submission(&draft, at()).unwrap();
        assert_eq!(payload.remise, "10%");
        assert_eq!(payload.montant_a_payer, Money::from_minor(18_000));

        draft.discount = Some(Discount::Amount(Money::from_minor(2_500)));
        let payload = format_for_submission(&draft, at()).unwrap();
        assert_eq!(payload.remise, "ar2500");
        assert_eq!(payload.montant_a_payer, Money::from_minor(17_500));
    }

    #[test]
    fn test_payment_fields() {
        let mut draft = two_line_draft();
        draft.payment_method = PaymentMethod::Mobile;
        draft.amount_paid = Money::from_minor(25_000);
        draft.client_identifier = "CLI-042".to_string();
        draft.payment_condition = "comptant".to_string();

        let payload = format_for_submission(&draft, at()).unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["mode_paiement"], "mobile");
        assert_eq!(json["montant_paye"], 25_000);
        assert_eq!(json["montant_a_payer"], 20_000);
        assert_eq!(json["identifiant"], "CLI-042");
        assert_eq!(json["condition_paiement"], "comptant");
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let draft = SaleDraft::new(Cart::new());
        assert_eq!(
            format_for_submission(&draft, at()).unwrap_err(),
            CoreError::EmptyCart
        );
    }

    #[test]
    fn test_negative_amount_paid_is_rejected() {
        let mut draft = two_line_draft();
        draft.amount_paid = Money::from_minor(-1);
        assert!(matches!(
            format_for_submission(&draft, at()),
            Err(CoreError::InvalidPaymentAmount { .. })
        ));
    }

    #[test]
    fn test_change_and_balance() {
        let mut draft = two_line_draft();
        draft.discount = Some(Discount::Percent(DiscountRate::from_percent(10)));

        draft.amount_paid = Money::from_minor(20_000);
        assert_eq!(draft.change_due(), Money::from_minor(2_000));
        assert_eq!(draft.balance_due(), Money::zero());

        draft.amount_paid = Money::from_minor(15_000);
        assert_eq!(draft.change_due(), Money::zero());
        assert_eq!(draft.balance_due(), Money::from_minor(3_000));
    }
}
