//! # Domain Types
//!
//! Core domain types used throughout Comptoir.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │    Product      │   │   Discount      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  reference      │   │  Amount(Money)  │       │
//! │  │  name           │   │  designation    │   │  Percent(rate)  │       │
//! │  │  email          │   │  unit_price     │   └─────────────────┘       │
//! │  │  created_at     │   │  stock          │                              │
//! │  └─────────────────┘   └─────────────────┘   ┌─────────────────┐       │
//! │                                              │ PaymentMethod   │       │
//! │  ┌─────────────────┐   ┌─────────────────┐   │  cash | card    │       │
//! │  │    Expense      │   │ Client/Company  │   │  mobile |       │       │
//! │  └─────────────────┘   └─────────────────┘   │  transfer|check │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Names
//! The REST API speaks French field names (`ref_produit`, `prix_unitaire`,
//! ...). Rust fields stay English and serde renames them; English aliases are
//! accepted on input.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// User
// =============================================================================

/// The authenticated actor, as returned by `/auth/login` and stored under
/// the `user` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[ts(type = "number")]
    pub id: i64,

    #[serde(default)]
    #[serde(alias = "nom")]
    pub name: String,

    pub email: String,

    #[serde(default)]
    #[serde(alias = "created_at")]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Returns a copy of this user with the patch's present fields applied.
    ///
    /// Absent fields keep their current value; the id and creation
    /// timestamp never change.
    pub fn apply(&self, patch: &UserPatch) -> User {
        User {
            id: self.id,
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            email: patch.email.clone().unwrap_or_else(|| self.email.clone()),
            created_at: self.created_at,
        }
    }
}

/// Partial update of the stored user record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserPatch {
    /// Patch that only changes the email.
    pub fn email(email: impl Into<String>) -> Self {
        UserPatch {
            email: Some(email.into()),
            name: None,
        }
    }

    /// True when the patch carries no field.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product as served by the product endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Business reference - the unique key of a cart line.
    #[serde(rename = "ref_produit")]
    #[serde(alias = "reference")]
    pub reference: String,

    /// Display name shown to the cashier.
    pub designation: String,

    /// Unit price in minor units.
    #[serde(rename = "prix_unitaire")]
    #[serde(alias = "unit_price")]
    pub unit_price: Money,

    /// Quantity on hand according to the backend.
    #[serde(rename = "quantite", default)]
    #[serde(alias = "stock")]
    #[ts(type = "number")]
    pub stock: i64,

    #[serde(rename = "categorie", default, skip_serializing_if = "Option::is_none")]
    #[serde(alias = "category")]
    pub category: Option<String>,
}

impl Product {
    /// Checks whether `quantity` units can be taken from current stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Notes and coins.
    #[default]
    Cash,
    /// Bank card on an external terminal.
    Card,
    /// Mobile money.
    Mobile,
    /// Bank transfer.
    Transfer,
    /// Cheque.
    Check,
}

impl PaymentMethod {
    /// Wire value sent as `mode_paiement`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Mobile => "mobile",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Check => "check",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "especes" | "espèces" => Ok(PaymentMethod::Cash),
            "card" | "carte" => Ok(PaymentMethod::Card),
            "mobile" | "mobile_money" => Ok(PaymentMethod::Mobile),
            "transfer" | "virement" => Ok(PaymentMethod::Transfer),
            "check" | "cheque" | "chèque" => Ok(PaymentMethod::Check),
            other => Err(ValidationError::InvalidFormat {
                field: "payment method".to_string(),
                reason: format!(
                    "unknown value '{}', expected cash, card, mobile, transfer or check",
                    other
                ),
            }),
        }
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Discount rate in basis points.
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%, so 1250 bps = 12.5% stays an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a rate from a whole percentage. Saturates at `u32::MAX` bps.
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        DiscountRate(pct.saturating_mul(100))
    }

    /// Creates a rate from a percentage (for user input).
    pub fn from_percentage(pct: f64) -> Self {
        DiscountRate((pct * 100.0).round().max(0.0) as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// Percentage text without trailing zeros: 1000 → "10", 1250 → "12.5".
impl fmt::Display for DiscountRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}", whole, frac)
        }
    }
}

/// A sale-level discount. Amount and percent modes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// A fixed amount off the subtotal.
    Amount(Money),
    /// A percentage of the subtotal, applied once.
    Percent(DiscountRate),
}

impl Discount {
    /// The amount this discount removes from `subtotal`.
    ///
    /// Negative fixed amounts count as zero.
    pub fn amount_for(&self, subtotal: Money) -> Money {
        match self {
            Discount::Amount(amount) => amount.floor_zero(),
            Discount::Percent(rate) => subtotal.percentage(rate.bps()),
        }
    }

    /// Wire form used in the `remise` field: `"<pct>%"` or `"ar<amount>"`.
    pub fn to_wire(&self) -> String {
        match self {
            Discount::Amount(amount) => format!("ar{}", amount.floor_zero()),
            Discount::Percent(rate) => format!("{}%", rate),
        }
    }
}

// =============================================================================
// Other Resources
// =============================================================================

/// A recorded business expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Expense {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "number | null")]
    pub id: Option<i64>,

    #[serde(rename = "libelle")]
    #[serde(alias = "label")]
    pub label: String,

    #[serde(rename = "montant")]
    #[serde(alias = "amount")]
    pub amount: Money,

    #[serde(rename = "categorie", default)]
    #[serde(alias = "category")]
    pub category: Option<String>,

    #[serde(rename = "date_depense")]
    #[serde(alias = "spent_on")]
    #[ts(as = "String")]
    pub spent_on: NaiveDate,
}

/// A customer of the business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Client {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "number | null")]
    pub id: Option<i64>,

    #[serde(rename = "nom")]
    #[serde(alias = "name")]
    pub name: String,

    #[serde(rename = "telephone", default)]
    #[serde(alias = "phone")]
    pub phone: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(rename = "adresse", default)]
    #[serde(alias = "address")]
    pub address: Option<String>,
}

/// The company profile printed on invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Company {
    #[serde(rename = "nom")]
    #[serde(alias = "name")]
    pub name: String,

    #[serde(rename = "adresse", default)]
    #[serde(alias = "address")]
    pub address: Option<String>,

    #[serde(rename = "telephone", default)]
    #[serde(alias = "phone")]
    pub phone: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Tax identification number.
    #[serde(rename = "nif", default)]
    #[serde(alias = "tax_id")]
    pub tax_id: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_json_shape() {
        let json = r#"{"id":1,"email":"a@b.com","name":"Aina","createdAt":"2024-03-01T08:00:00Z"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.email, "a@b.com");
        assert!(user.created_at.is_some());

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back["createdAt"], "2024-03-01T08:00:00Z");
    }

    #[test]
    fn test_user_accepts_snake_case_and_missing_fields() {
        let json = r#"{"id":7,"email":"x@y.mg","created_at":null}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.name, "");
        assert_eq!(user.created_at, None);
    }

    #[test]
    fn test_discount_rate_from_percent_saturates() {
        assert_eq!(DiscountRate::from_percent(15).bps(), 1_500);
        assert_eq!(DiscountRate::from_percent(u32::MAX).bps(), u32::MAX);
        assert_eq!(
            Discount::Percent(DiscountRate::from_percent(u32::MAX)).amount_for(Money::from_minor(100)),
            Money::from_minor(42_949_673)
        );
    }

    #[test]
    fn test_user_apply_patch() {
        let user = User {
            id: 3,
            name: "Hery".to_string(),
            email: "old@shop.mg".to_string(),
            created_at: None,
        };
        let updated = user.apply(&UserPatch::email("new@shop.mg"));
        assert_eq!(updated.email, "new@shop.mg");
        assert_eq!(updated.name, "Hery");
        assert_eq!(updated.id, 3);
    }

    #[test]
    fn test_product_wire_names() {
        let json = r#"{"ref_produit":"R1","designation":"Riz 1kg","prix_unitaire":3500,"quantite":12}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.reference, "R1");
        assert_eq!(product.unit_price.minor(), 3500);
        assert_eq!(product.stock, 12);
        assert!(product.can_sell(12));
        assert!(!product.can_sell(13));
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("Virement".parse::<PaymentMethod>().unwrap(), PaymentMethod::Transfer);
        assert_eq!("cheque".parse::<PaymentMethod>().unwrap(), PaymentMethod::Check);
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Mobile).unwrap(),
            "\"mobile\""
        );
    }

    #[test]
    fn test_discount_rate_display() {
        assert_eq!(DiscountRate::from_percent(10).to_string(), "10");
        assert_eq!(DiscountRate::from_bps(1250).to_string(), "12.5");
        assert_eq!(DiscountRate::from_bps(1025).to_string(), "10.25");
        assert_eq!(DiscountRate::from_percentage(7.5).bps(), 750);
    }

    #[test]
    fn test_discount_amount_and_wire() {
        let subtotal = Money::from_minor(20_000);

        let pct = Discount::Percent(DiscountRate::from_percent(10));
        assert_eq!(pct.amount_for(subtotal).minor(), 2_000);
        assert_eq!(pct.to_wire(), "10%");

        let fixed = Discount::Amount(Money::from_minor(1_500));
        assert_eq!(fixed.amount_for(subtotal).minor(), 1_500);
        assert_eq!(fixed.to_wire(), "ar1500");

        let negative = Discount::Amount(Money::from_minor(-10));
        assert_eq!(negative.amount_for(subtotal), Money::zero());
    }

    #[test]
    fn test_typescript_bindings_use_wire_names() {
        let product = Product::decl();
        assert!(product.contains("ref_produit: string"), "{product}");
        assert!(product.contains("prix_unitaire: Money"), "{product}");
        assert!(product.contains("quantite: number"), "{product}");
        assert!(!product.contains("unit_price"), "{product}");

        let expense = Expense::decl();
        assert!(expense.contains("libelle: string"), "{expense}");
        assert!(expense.contains("montant: Money"), "{expense}");
        assert!(expense.contains("date_depense: string"), "{expense}");

        let client = Client::decl();
        assert!(client.contains("nom: string"), "{client}");
        assert!(client.contains("telephone"), "{client}");

        let company = Company::decl();
        assert!(company.contains("nif"), "{company}");
        assert!(company.contains("adresse"), "{company}");
    }

    #[test]
    fn test_typescript_bindings_use_plain_numbers() {
        assert_eq!(Money::inline(), "number");
        for decl in [User::decl(), Product::decl(), Expense::decl(), Client::decl()] {
            assert!(!decl.contains("bigint"), "{decl}");
        }
    }

    #[test]
    fn test_wire_names_and_aliases_both_deserialize() {
        let wire: Product = serde_json::from_str(
            r#"{"ref_produit":"R1","designation":"Riz","prix_unitaire":3000,"quantite":4}"#,
        )
        .unwrap();
        let english: Product = serde_json::from_str(
            r#"{"reference":"R1","designation":"Riz","unit_price":3000,"stock":4}"#,
        )
        .unwrap();
        assert_eq!(wire, english);

        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["ref_produit"], "R1");
        assert_eq!(json["quantite"], 4);
    }
}
