//! # Order Payload
//!
//! The immutable record handed to the order service when a checkout is
//! submitted, and what comes back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cartwright_core::{
    Cart, ConversionRates, CoreResult, CustomerInfo, Money, PaymentMethod, PaymentProof,
    PricingResult, VariantKey,
};

use crate::session::CheckoutStatus;

/// One ordered line, priced in the base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: String,
    pub variant_key: VariantKey,
    pub quantity: u32,
    pub unit_price_base: Money,
    pub line_total_base: Money,
}

/// Everything the order service needs to create an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    /// Generated before the order service is called.
    pub order_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub customer: CustomerInfo,
    pub payment_method: PaymentMethod,
    pub payment_proof: Option<PaymentProof>,
    pub coupon_code: Option<String>,
    pub pricing: PricingResult,
    /// Base currency of every amount in the payload.
    pub currency: String,
    pub terms_accepted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Builds the priced order lines for a cart.
///
/// Line figures are rounded per line; `pricing` stays the authoritative total.
pub(crate) fn order_lines(cart: &Cart, rates: &ConversionRates) -> CoreResult<Vec<OrderLine>> {
    cart.lines()
        .iter()
        .map(|line| {
            let unit = rates.unit_price_in_base(line)?;
            Ok(OrderLine {
                product_id: line.product_id.clone(),
                variant_key: line.variant_key.clone(),
                quantity: line.quantity,
                unit_price_base: Money::from_decimal_minor(unit),
                line_total_base: Money::from_decimal_minor(unit * Decimal::from(line.quantity)),
            })
        })
        .collect()
}

/// Returned by the order service on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub order_id: Uuid,
}

/// What a submit attempt tells the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    /// Where the session stopped.
    pub status: CheckoutStatus,

    /// Set once an order id has been generated.
    pub order_id: Option<Uuid>,

    /// The caller must delete its persisted cart copy.
    pub clear_cart: bool,

    /// Why the session stopped short of an order, when it did.
    pub message: Option<String>,

    /// Non-fatal problems after a successful order.
    pub warnings: Vec<String>,
}

impl SubmitOutcome {
    pub(crate) fn stopped(status: CheckoutStatus, message: impl Into<String>) -> Self {
        SubmitOutcome {
            status,
            order_id: None,
            clear_cart: false,
            message: Some(message.into()),
            warnings: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CheckoutStatus::Succeeded
    }
}
