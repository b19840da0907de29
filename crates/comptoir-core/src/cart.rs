//! # Cart
//!
//! The sales cart and the arithmetic around it.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Screen Action            Operation                  Cart Change        │
//! │  ─────────────            ─────────                  ───────────        │
//! │                                                                         │
//! │  Tap Product ───────────► add_to_cart() ───────────► merge or push     │
//! │                           (rejected if stock short)   (or unchanged)    │
//! │                                                                         │
//! │  Change Quantity ───────► update_quantity() ───────► qty = max(0, n)   │
//! │                                                       0 → line removed  │
//! │                                                                         │
//! │  Swipe Remove ──────────► remove_from_cart() ──────► line dropped      │
//! │                                                                         │
//! │  Go To Checkout ────────► adjust_quantities_by_stock() (client fetches │
//! │                           levels, this module applies them)             │
//! │                                                                         │
//! │  Sale Accepted ─────────► clear() ─────────────────► items.clear()     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by product reference
//! - Every line has `quantity > 0`
//! - A line's amount is always `unit_price × quantity`, computed on demand
//! - A rejected operation leaves the cart exactly as it was

use std::collections::HashMap;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Discount, Product};
use crate::validation::{validate_cart_size, validate_price, validate_quantity};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Item
// =============================================================================

/// One line of the cart.
///
/// The unit price is frozen when the product is first added; later price
/// changes on the backend do not affect a line already in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub reference: String,
    pub designation: String,
    pub unit_price: Money,
    /// Stock on hand the last time this line saw the product.
    pub available_stock: i64,
    pub quantity: i64,
    pub category: Option<String>,
}

impl CartItem {
    /// Creates a cart line from a product and quantity.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            reference: product.reference.clone(),
            designation: product.designation.clone(),
            unit_price: product.unit_price,
            available_stock: product.stock,
            quantity,
            category: product.category.clone(),
        }
    }

    /// Line amount (unit price × quantity).
    #[inline]
    pub fn amount(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Serialized with the computed `amount` so screens never recompute it.
impl Serialize for CartItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut line = serializer.serialize_struct("CartItem", 7)?;
        line.serialize_field("reference", &self.reference)?;
        line.serialize_field("designation", &self.designation)?;
        line.serialize_field("unitPrice", &self.unit_price)?;
        line.serialize_field("availableStock", &self.available_stock)?;
        line.serialize_field("quantity", &self.quantity)?;
        line.serialize_field("amount", &self.amount())?;
        line.serialize_field("category", &self.category)?;
        line.end()
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Cart totals for display and checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    /// Σ quantity over all lines.
    pub item_count: i64,
    /// Number of distinct lines.
    pub line_count: usize,
    /// Σ line amounts.
    pub subtotal: Money,
    /// Amount the discount removes (zero when there is none).
    pub discount_amount: Money,
    /// `max(0, subtotal − discount_amount)`.
    pub net_amount: Money,
}

// =============================================================================
// Stock Levels
// =============================================================================

/// Authoritative stock levels fetched for the lines of a cart.
///
/// `None` records a lookup that failed; it counts as nothing available
/// so the line is flagged rather than silently trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockLevels {
    levels: HashMap<String, Option<i64>>,
}

impl StockLevels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the result of one lookup.
    pub fn insert(&mut self, reference: impl Into<String>, level: Option<i64>) {
        self.levels.insert(reference.into(), level);
    }

    /// Units available for `reference`; unknown or failed lookups give 0.
    pub fn available(&self, reference: &str) -> i64 {
        self.levels
            .get(reference)
            .copied()
            .flatten()
            .unwrap_or(0)
            .max(0)
    }

    /// True if the lookup for `reference` failed or never happened.
    pub fn is_unknown(&self, reference: &str) -> bool {
        !matches!(self.levels.get(reference), Some(Some(_)))
    }
}

impl FromIterator<(String, Option<i64>)> for StockLevels {
    fn from_iter<I: IntoIterator<Item = (String, Option<i64>)>>(iter: I) -> Self {
        StockLevels {
            levels: iter.into_iter().collect(),
        }
    }
}

/// Stock check result for one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCheck {
    pub reference: String,
    pub requested: i64,
    pub available: i64,
    /// `requested <= available`.
    pub valid: bool,
}

/// Stock check result for a whole cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockValidation {
    pub lines: Vec<StockCheck>,
    pub all_valid: bool,
}

impl StockValidation {
    /// The lines that failed the check.
    pub fn invalid_lines(&self) -> impl Iterator<Item = &StockCheck> {
        self.lines.iter().filter(|line| !line.valid)
    }
}

/// A quantity downgrade applied by `adjust_quantities_by_stock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityChange {
    pub reference: String,
    pub from: i64,
    pub to: i64,
}

/// Outcome of `adjust_quantities_by_stock`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub adjusted: bool,
    pub changes: Vec<QuantityChange>,
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by `reference` (adding the same product merges)
/// - Quantity is always > 0 (setting it to 0 removes the line)
/// - Maximum lines: 100; maximum quantity per line: 999
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { items: Vec::new() }
    }

    /// Lines in insertion order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Looks up a line by product reference.
    pub fn get(&self, reference: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.reference == reference)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Σ quantity.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Σ line amounts.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::amount).sum()
    }

    /// Adds `quantity` units of `product`.
    ///
    /// ## Behavior
    /// - Reference already in cart: quantity increases, unless the new total
    ///   would exceed `product.stock`; then nothing changes and
    ///   `InsufficientStock` is returned (no partial increase)
    /// - New reference: appended, under the same stock rule
    ///
    /// ## Example
    /// ```rust
    /// use comptoir_core::{Cart, Money, Product};
    ///
    /// let product = Product {
    ///     reference: "R1".into(),
    ///     designation: "Riz 1kg".into(),
    ///     unit_price: Money::from_minor(10),
    ///     stock: 5,
    ///     category: None,
    /// };
    /// let mut cart = Cart::new();
    /// cart.add_to_cart(&product, 3).unwrap();
    /// assert!(cart.add_to_cart(&product, 4).is_err()); // 3 + 4 > 5
    /// assert_eq!(cart.get("R1").unwrap().quantity, 3);
    /// ```
    pub fn add_to_cart(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;
        validate_price(product.unit_price)?;

        if let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.reference == product.reference)
        {
            let new_qty = item.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            if !product.can_sell(new_qty) {
                return Err(CoreError::InsufficientStock {
                    reference: product.reference.clone(),
                    available: product.stock,
                    requested: new_qty,
                });
            }
            item.quantity = new_qty;
            item.available_stock = product.stock;
            return Ok(());
        }

        validate_cart_size(self.items.len()).map_err(|_| CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        })?;

        if !product.can_sell(quantity) {
            return Err(CoreError::InsufficientStock {
                reference: product.reference.clone(),
                available: product.stock,
                requested: quantity,
            });
        }

        self.items.push(CartItem::from_product(product, quantity));
        Ok(())
    }

    /// Removes every line matching `reference`.
    ///
    /// ## Returns
    /// `true` if a line was removed.
    pub fn remove_from_cart(&mut self, reference: &str) -> bool {
        let initial_len = self.items.len();
        self.items.retain(|i| i.reference != reference);
        self.items.len() != initial_len
    }

    /// Sets a line's quantity to `max(0, quantity)`.
    ///
    /// ## Behavior
    /// - Resulting quantity 0: the line is removed
    /// - Reference not in cart: no-op
    /// - Quantity above 999: `QuantityTooLarge`, cart unchanged
    pub fn update_quantity(&mut self, reference: &str, quantity: i64) -> CoreResult<()> {
        let quantity = quantity.max(0);

        if quantity == 0 {
            self.remove_from_cart(reference);
            return Ok(());
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        if let Some(item) = self.items.iter_mut().find(|i| i.reference == reference) {
            item.quantity = quantity;
        }
        Ok(())
    }

    /// Computes totals, applying an optional discount once to the subtotal.
    ///
    /// ## Example
    /// ```text
    /// Lines: 2 × 5 000 + 1 × 10 000        subtotal   20 000
    /// Discount: 10%                        discount    2 000
    ///                                      net        18 000
    /// ```
    pub fn calculate_summary(&self, discount: Option<&Discount>) -> CartSummary {
        let subtotal = self.subtotal();
        let discount_amount = discount
            .map(|d| d.amount_for(subtotal))
            .unwrap_or_default();

        CartSummary {
            item_count: self.total_quantity(),
            line_count: self.line_count(),
            subtotal,
            discount_amount,
            net_amount: (subtotal - discount_amount).floor_zero(),
        }
    }

    /// Checks every line against freshly fetched stock. Does not mutate.
    pub fn validate_stock(&self, levels: &StockLevels) -> StockValidation {
        let lines: Vec<StockCheck> = self
            .items
            .iter()
            .map(|item| {
                let available = levels.available(&item.reference);
                StockCheck {
                    reference: item.reference.clone(),
                    requested: item.quantity,
                    available,
                    valid: item.quantity <= available,
                }
            })
            .collect();

        let all_valid = lines.iter().all(|l| l.valid);
        StockValidation { lines, all_valid }
    }

    /// Lowers each line to `min(requested, available)` and drops lines that
    /// reach zero.
    ///
    /// Used right before checkout as a safety net against stale stock shown
    /// on screen.
    pub fn adjust_quantities_by_stock(&mut self, levels: &StockLevels) -> StockAdjustment {
        let mut changes = Vec::new();

        for item in &mut self.items {
            let available = levels.available(&item.reference);
            if item.quantity > available {
                changes.push(QuantityChange {
                    reference: item.reference.clone(),
                    from: item.quantity,
                    to: available,
                });
                item.quantity = available;
            }
            if !levels.is_unknown(&item.reference) {
                item.available_stock = available;
            }
        }

        self.items.retain(|i| i.quantity > 0);

        StockAdjustment {
            adjusted: !changes.is_empty(),
            changes,
        }
    }

    /// Clears all lines (after a sale is accepted by the backend).
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DiscountRate;

    fn product(reference: &str, price: i64, stock: i64) -> Product {
        Product {
            reference: reference.to_string(),
            designation: format!("Produit {}", reference),
            unit_price: Money::from_minor(price),
            stock,
            category: None,
        }
    }

    #[test]
    fn test_add_to_empty_cart() {
        let mut cart = Cart::new();
        let p = product("R1", 2_500, 10);

        cart.add_to_cart(&p, 4).unwrap();

        assert_eq!(cart.line_count(), 1);
        let line = cart.get("R1").unwrap();
        assert_eq!(line.quantity, 4);
        assert_eq!(line.amount(), Money::from_minor(10_000));
    }

    #[test]
    fn test_add_up_to_exact_stock() {
        let mut cart = Cart::new();
        let p = product("R1", 10, 5);

        cart.add_to_cart(&p, 5).unwrap();
        assert_eq!(cart.get("R1").unwrap().quantity, 5);
    }

    #[test]
    fn test_add_same_product_merges() {
        let mut cart = Cart::new();
        let p = product("R1", 10, 5);

        cart.add_to_cart(&p, 2).unwrap();
        cart.add_to_cart(&p, 3).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.get("R1").unwrap().amount(), Money::from_minor(50));
    }

    #[test]
    fn test_add_exceeding_stock_leaves_cart_unchanged() {
        let mut cart = Cart::new();
        let p = product("R1", 10, 5);
        cart.add_to_cart(&p, 3).unwrap();
        let before = cart.clone();

        let err = cart.add_to_cart(&p, 4).unwrap_err();

        assert_eq!(
            err,
            CoreError::InsufficientStock {
                reference: "R1".to_string(),
                available: 5,
                requested: 7,
            }
        );
        assert_eq!(cart, before);
        assert_eq!(cart.get("R1").unwrap().quantity, 3);
    }

    #[test]
    fn test_add_new_line_exceeding_stock_is_rejected() {
        let mut cart = Cart::new();
        let err = cart.add_to_cart(&product("R1", 10, 2), 3).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let mut cart = Cart::new();
        let err = cart.add_to_cart(&product("R1", 10, 5), 0).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_rejects_negative_price() {
        let mut cart = Cart::new();
        let err = cart.add_to_cart(&product("R1", -10, 5), 1).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_keeps_frozen_price() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 10, 50), 1).unwrap();
        cart.add_to_cart(&product("R1", 99, 50), 1).unwrap();

        let line = cart.get("R1").unwrap();
        assert_eq!(line.unit_price, Money::from_minor(10));
        assert_eq!(line.amount(), Money::from_minor(20));
    }

    #[test]
    fn test_cart_too_large() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            cart.add_to_cart(&product(&format!("R{}", i), 1, 10), 1)
                .unwrap();
        }
        let err = cart.add_to_cart(&product("EXTRA", 1, 10), 1).unwrap_err();
        assert_eq!(err, CoreError::CartTooLarge { max: MAX_CART_ITEMS });
        assert_eq!(cart.line_count(), MAX_CART_ITEMS);
    }

    #[test]
    fn test_remove_from_cart() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 10, 5), 1).unwrap();
        cart.add_to_cart(&product("R2", 20, 5), 1).unwrap();

        assert!(cart.remove_from_cart("R1"));
        assert!(!cart.remove_from_cart("R1"));
        assert_eq!(cart.line_count(), 1);
        assert!(cart.get("R2").is_some());
    }

    #[test]
    fn test_update_quantity_recomputes_amount() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 300, 5), 1).unwrap();

        cart.update_quantity("R1", 4).unwrap();

        assert_eq!(cart.get("R1").unwrap().amount(), Money::from_minor(1_200));
    }

    #[test]
    fn test_update_quantity_zero_or_negative_removes_line() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 10, 5), 2).unwrap();
        cart.add_to_cart(&product("R2", 10, 5), 2).unwrap();

        cart.update_quantity("R1", 0).unwrap();
        assert!(cart.get("R1").is_none());

        cart.update_quantity("R2", -3).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_absent_reference_is_idempotent() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 10, 5), 2).unwrap();
        let before = cart.clone();

        cart.update_quantity("NOPE", 0).unwrap();
        cart.update_quantity("NOPE", 3).unwrap();

        assert_eq!(cart, before);
    }

    #[test]
    fn test_update_quantity_too_large() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 10, 5), 2).unwrap();
        assert!(cart.update_quantity("R1", 1_000).is_err());
        assert_eq!(cart.get("R1").unwrap().quantity, 2);
    }

    #[test]
    fn test_summary_without_discount() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 5_000, 10), 2).unwrap();
        cart.add_to_cart(&product("R2", 10_000, 10), 1).unwrap();

        let summary = cart.calculate_summary(None);

        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.line_count, 2);
        assert_eq!(summary.subtotal, Money::from_minor(20_000));
        assert_eq!(summary.discount_amount, Money::zero());
        assert_eq!(summary.net_amount, Money::from_minor(20_000));
    }

    #[test]
    fn test_summary_subtotal_is_sum_of_amounts() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("A", 125, 100), 7).unwrap();
        cart.add_to_cart(&product("B", 990, 100), 3).unwrap();
        cart.add_to_cart(&product("C", 1, 100), 99).unwrap();

        let expected: Money = cart.items().iter().map(CartItem::amount).sum();
        assert_eq!(cart.calculate_summary(None).subtotal, expected);
    }

    #[test]
    fn test_summary_percent_discount() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 5_000, 10), 4).unwrap();

        let discount = Discount::Percent(DiscountRate::from_percent(25));
        let summary = cart.calculate_summary(Some(&discount));

        assert_eq!(summary.subtotal, Money::from_minor(20_000));
        assert_eq!(summary.discount_amount, Money::from_minor(5_000));
        assert_eq!(summary.net_amount, Money::from_minor(15_000));
    }

    #[test]
    fn test_summary_net_never_negative() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 1_000, 10), 1).unwrap();

        let discount = Discount::Amount(Money::from_minor(5_000));
        let summary = cart.calculate_summary(Some(&discount));

        assert_eq!(summary.net_amount, Money::zero());
    }

    #[test]
    fn test_validate_stock_does_not_mutate() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 10, 10), 4).unwrap();
        cart.add_to_cart(&product("R2", 10, 10), 2).unwrap();
        let before = cart.clone();

        let mut levels = StockLevels::new();
        levels.insert("R1", Some(3));
        levels.insert("R2", Some(8));

        let report = cart.validate_stock(&levels);

        assert!(!report.all_valid);
        let invalid: Vec<_> = report.invalid_lines().map(|l| l.reference.as_str()).collect();
        assert_eq!(invalid, vec!["R1"]);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_validate_stock_failed_lookup_is_invalid() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 10, 10), 1).unwrap();
        cart.add_to_cart(&product("R2", 10, 10), 1).unwrap();

        let mut levels = StockLevels::new();
        levels.insert("R1", None);
        levels.insert("R2", Some(1));

        let report = cart.validate_stock(&levels);
        assert!(!report.lines[0].valid);
        assert_eq!(report.lines[0].available, 0);
        assert!(report.lines[1].valid);
    }

    #[test]
    fn test_adjust_quantities_by_stock() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 10, 10), 5).unwrap();
        cart.add_to_cart(&product("R2", 10, 10), 2).unwrap();
        cart.add_to_cart(&product("R3", 10, 10), 1).unwrap();

        let levels: StockLevels = vec![
            ("R1".to_string(), Some(3)),
            ("R2".to_string(), Some(0)),
            ("R3".to_string(), Some(9)),
        ]
        .into_iter()
        .collect();

        let outcome = cart.adjust_quantities_by_stock(&levels);

        assert!(outcome.adjusted);
        assert_eq!(outcome.changes.len(), 2);
        assert_eq!(cart.get("R1").unwrap().quantity, 3);
        assert_eq!(cart.get("R1").unwrap().available_stock, 3);
        assert!(cart.get("R2").is_none());
        assert_eq!(cart.get("R3").unwrap().quantity, 1);
    }

    #[test]
    fn test_adjust_without_changes() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 10, 10), 2).unwrap();

        let mut levels = StockLevels::new();
        levels.insert("R1", Some(2));

        let outcome = cart.adjust_quantities_by_stock(&levels);
        assert!(!outcome.adjusted);
        assert!(outcome.changes.is_empty());
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn test_serialized_line_carries_amount() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 250, 10), 4).unwrap();

        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["items"][0]["amount"], 1000);
        assert_eq!(json["items"][0]["unitPrice"], 250);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("R1", 10, 10), 2).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.calculate_summary(None).subtotal, Money::zero());
    }
}
