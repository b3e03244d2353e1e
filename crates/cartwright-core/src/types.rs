//! # Domain Types
//!
//! Boundary types shared by every stage of the checkout pipeline.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    CartLine     │   │   StockFact     │   │  CustomerInfo   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id  ┐  │   │  product_id     │   │  name, phone    │       │
//! │  │  variant_key ┘key│  │  variant_key?   │   │  address        │       │
//! │  │  quantity 1..3  │   │  available_qty  │   │  region,country │       │
//! │  │  unit_price     │   │  product_title  │   └─────────────────┘       │
//! │  │  currency       │   └─────────────────┘                             │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │  VariantKey     │   │ PaymentMethod   │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  None ("none")  │   │  cod            │                             │
//! │  │  Size("M")      │   │  mobile_wallet  │                             │
//! │  └─────────────────┘   │  pay_first      │                             │
//! │                        │  affiliate_...  │                             │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! A line is identified by `(product_id, variant_key)`. Two lines with the
//! same key are merged by the normalizer; nothing else is compared.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Variant Key
// =============================================================================

/// The size (or absence of one) that, with the product id, identifies a line.
///
/// Serialized as a plain string; `"none"` (any case) or an empty string
/// means the product has no size variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VariantKey {
    /// Product sold without sizes.
    #[default]
    None,
    /// A named size such as "M" or "42".
    Size(String),
}

impl VariantKey {
    /// Creates a size variant, mapping "none"/empty to [`VariantKey::None`].
    pub fn size(size: impl Into<String>) -> Self {
        VariantKey::from(size.into())
    }

    /// Returns the size name, if any.
    pub fn as_size(&self) -> Option<&str> {
        match self {
            VariantKey::None => None,
            VariantKey::Size(s) => Some(s),
        }
    }

    /// Returns true when the product has no size variants.
    pub fn is_none(&self) -> bool {
        matches!(self, VariantKey::None)
    }
}

impl From<String> for VariantKey {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            VariantKey::None
        } else {
            VariantKey::Size(trimmed.to_string())
        }
    }
}

impl From<&str> for VariantKey {
    fn from(value: &str) -> Self {
        VariantKey::from(value.to_string())
    }
}

impl From<VariantKey> for String {
    fn from(key: VariantKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKey::None => write!(f, "none"),
            VariantKey::Size(s) => write!(f, "{}", s),
        }
    }
}

// =============================================================================
// Line Key
// =============================================================================

/// Identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKey {
    pub product_id: String,
    pub variant_key: VariantKey,
}

impl LineKey {
    pub fn new(product_id: impl Into<String>, variant_key: VariantKey) -> Self {
        LineKey {
            product_id: product_id.into(),
            variant_key,
        }
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.product_id, self.variant_key)
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// One product + variant entry in the client-held cart.
///
/// ## Trust
/// Every field arrives from the client. Quantities are re-capped by the
/// normalizer and re-checked against stock before checkout; prices are
/// only as good as the storefront that wrote them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product identifier.
    pub product_id: String,

    /// Size, or "none".
    #[ts(type = "string")]
    pub variant_key: VariantKey,

    /// Requested quantity (1..=3 after normalization).
    pub quantity: u32,

    /// Unit price in minor units of `currency`.
    pub unit_price: Money,

    /// ISO 4217 code of `unit_price`.
    pub currency: String,
}

impl CartLine {
    /// Creates a new cart line.
    pub fn new(
        product_id: impl Into<String>,
        variant_key: VariantKey,
        quantity: u32,
        unit_price: Money,
        currency: impl Into<String>,
    ) -> Self {
        CartLine {
            product_id: product_id.into(),
            variant_key,
            quantity,
            unit_price,
            currency: currency.into(),
        }
    }

    /// Returns the identity key of this line.
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id.clone(), self.variant_key.clone())
    }

    /// Returns true when this line has the given identity.
    pub fn has_key(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.variant_key == key.variant_key
    }
}

// =============================================================================
// Stock Fact
// =============================================================================

/// Authoritative inventory snapshot for one product (and size).
///
/// Fetched per validation call and consumed once; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockFact {
    pub product_id: String,

    #[ts(type = "string | null")]
    #[serde(default)]
    pub variant_key: Option<VariantKey>,

    pub available_quantity: u32,

    pub product_title: String,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer pays.
///
/// ```text
///                       delivery?   proof of payment?
/// cod                      yes            no
/// mobile_wallet            yes            yes (sender number + trx id)
/// pay_first                yes            yes
/// affiliate_redirect       no             no
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    #[serde(rename = "cod")]
    CashOnDelivery,
    /// Prepaid through a mobile wallet before dispatch.
    MobileWallet,
    /// Full prepayment by transfer before dispatch.
    PayFirst,
    /// Purchase completed on a partner site; nothing ships from us.
    AffiliateRedirect,
}

impl PaymentMethod {
    /// Returns true when the order is physically delivered and may incur shipping.
    pub fn requires_delivery(&self) -> bool {
        matches!(
            self,
            PaymentMethod::CashOnDelivery | PaymentMethod::MobileWallet | PaymentMethod::PayFirst
        )
    }

    /// Returns true when submission needs sender number + transaction reference.
    pub fn requires_payment_proof(&self) -> bool {
        matches!(self, PaymentMethod::MobileWallet | PaymentMethod::PayFirst)
    }

    /// Wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cod",
            PaymentMethod::MobileWallet => "mobile_wallet",
            PaymentMethod::PayFirst => "pay_first",
            PaymentMethod::AffiliateRedirect => "affiliate_redirect",
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
            "cod" | "cash_on_delivery" => Ok(PaymentMethod::CashOnDelivery),
            "mobile_wallet" | "wallet" => Ok(PaymentMethod::MobileWallet),
            "pay_first" | "prepaid" => Ok(PaymentMethod::PayFirst),
            "affiliate_redirect" | "affiliate" => Ok(PaymentMethod::AffiliateRedirect),
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: ["cod", "mobile_wallet", "pay_first", "affiliate_redirect"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Payment Proof
// =============================================================================

/// Proof-of-payment fields captured for prepaid methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    /// Wallet number the money was sent from (fixed-length digits).
    pub sender_number: String,
    /// Transaction reference issued by the wallet/bank.
    pub transaction_ref: String,
}

// =============================================================================
// Customer Info
// =============================================================================

/// Delivery and contact details entered during checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
    /// District / city used for the metro-or-other shipping bucket.
    pub region: String,
    pub country: String,
}

impl CustomerInfo {
    /// Identity used when recording coupon usage: email when given, else phone.
    pub fn identity(&self) -> &str {
        match self.email.as_deref() {
            Some(email) if !email.trim().is_empty() => email.trim(),
            _ => self.phone.trim(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_key_parsing() {
        assert_eq!(VariantKey::from("none"), VariantKey::None);
        assert_eq!(VariantKey::from("NONE"), VariantKey::None);
        assert_eq!(VariantKey::from("  "), VariantKey::None);
        assert_eq!(VariantKey::from(" M "), VariantKey::Size("M".to_string()));
        assert_eq!(VariantKey::size("XL").as_size(), Some("XL"));
    }

    #[test]
    fn test_variant_key_serializes_as_string() {
        let json = serde_json::to_string(&VariantKey::Size("M".into())).unwrap();
        assert_eq!(json, "\"M\"");
        let none: VariantKey = serde_json::from_str("\"none\"").unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_cart_line_json_shape() {
        let line = CartLine::new("P1", VariantKey::size("M"), 2, Money::from_major(500), "BDT");
        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["productId"], "P1");
        assert_eq!(value["variantKey"], "M");
        assert_eq!(value["unitPrice"], 50_000);
    }

    #[test]
    fn test_payment_method_rules() {
        assert!(PaymentMethod::CashOnDelivery.requires_delivery());
        assert!(!PaymentMethod::CashOnDelivery.requires_payment_proof());
        assert!(PaymentMethod::MobileWallet.requires_payment_proof());
        assert!(PaymentMethod::PayFirst.requires_payment_proof());
        assert!(!PaymentMethod::AffiliateRedirect.requires_delivery());
    }

    #[test]
    fn test_payment_method_wire_names() {
        let json = serde_json::to_string(&PaymentMethod::CashOnDelivery).unwrap();
        assert_eq!(json, "\"cod\"");
        let parsed: PaymentMethod = serde_json::from_str("\"affiliate_redirect\"").unwrap();
        assert_eq!(parsed, PaymentMethod::AffiliateRedirect);
        assert_eq!("COD".parse::<PaymentMethod>().unwrap(), PaymentMethod::CashOnDelivery);
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_customer_identity_prefers_email() {
        let mut customer = CustomerInfo {
            phone: "01711000000".into(),
            ..Default::default()
        };
        assert_eq!(customer.identity(), "01711000000");
        customer.email = Some("a@b.com".into());
        assert_eq!(customer.identity(), "a@b.com");
    }
}
