//! # Pricing Aggregator
//!
//! Turns a normalized cart plus an already-decided discount and shipping
//! charge into the final figures the customer sees.
//!
//! ## Calculation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each line:   unit_price × rate(currency→base) × quantity          │
//! │                   (Decimal, unrounded)                                  │
//! │                          │                                              │
//! │                          ▼  sum, then round ONCE                        │
//! │  subtotal  ─────────────────────────────────────────────┐               │
//! │  discount  = clamp(discount, 0, subtotal)               │               │
//! │  shipping  = max(shipping, 0)                           │               │
//! │  payable   = max(0, subtotal − discount) + shipping ◄───┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every amount is in base-currency minor units. None can be negative or
//! NaN, and a missing conversion rate is an error rather than a silent 1:1.
//! A unit price must be positive and at most [`MAX_UNIT_PRICE`] once
//! converted; anything else is rejected before it reaches a total.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::CartLine;
use crate::MAX_UNIT_PRICE;

// =============================================================================
// Conversion Rates
// =============================================================================

/// Currency conversion table into the base currency.
///
/// `rates["USD"] = 110` means one USD is worth 110 units of the base
/// currency. The base currency itself always converts at 1 and never needs
/// an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRates {
    pub base: String,
    #[serde(default)]
    pub rates: HashMap<String, Decimal>,
}

impl ConversionRates {
    /// A table that only knows the base currency.
    pub fn base_only(base: impl Into<String>) -> Self {
        ConversionRates {
            base: base.into(),
            rates: HashMap::new(),
        }
    }

    /// Adds (or replaces) a rate. Builder style.
    pub fn with_rate(mut self, currency: impl Into<String>, rate: Decimal) -> Self {
        self.rates.insert(currency.into().to_uppercase(), rate);
        self
    }

    /// Returns the multiplier from `currency` into the base currency.
    ///
    /// Currency codes compare case-insensitively. Non-positive rates are
    /// treated as missing.
    pub fn rate_for(&self, currency: &str) -> CoreResult<Decimal> {
        if currency.eq_ignore_ascii_case(&self.base) {
            return Ok(Decimal::ONE);
        }
        self.rates
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(currency))
            .map(|(_, rate)| *rate)
            .filter(|rate| *rate > Decimal::ZERO)
            .ok_or_else(|| CoreError::MissingConversionRate {
                currency: currency.to_string(),
                base: self.base.clone(),
            })
    }

    /// Unit price of a line in base minor units, unrounded.
    ///
    /// ## Errors
    /// - `CoreError::MissingConversionRate` for an unknown currency
    /// - `CoreError::InvalidUnitPrice` when the price is not positive or
    ///   converts to more than [`MAX_UNIT_PRICE`]
    pub fn unit_price_in_base(&self, line: &CartLine) -> CoreResult<Decimal> {
        let rate = self.rate_for(&line.currency)?;
        let invalid = || CoreError::InvalidUnitPrice {
            product_id: line.product_id.clone(),
            variant_key: line.variant_key.to_string(),
            unit_price: line.unit_price,
            max: MAX_UNIT_PRICE,
        };

        if line.unit_price <= Money::zero() {
            return Err(invalid());
        }
        line.unit_price
            .to_decimal()
            .checked_mul(rate)
            .filter(|base| *base <= MAX_UNIT_PRICE.to_decimal())
            .ok_or_else(invalid)
    }

    /// Sum of all lines in base minor units, rounded once.
    pub fn subtotal(&self, cart: &Cart) -> CoreResult<Money> {
        let mut total = Decimal::ZERO;
        for line in cart.lines() {
            total += self.unit_price_in_base(line)? * Decimal::from(line.quantity);
        }
        Ok(Money::from_decimal_minor(total).non_negative())
    }
}

// =============================================================================
// Pricing Result
// =============================================================================

/// Final figures for a cart, all in base-currency minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingResult {
    /// Base currency code the amounts are expressed in.
    pub currency: String,
    pub subtotal: Money,
    /// Discount actually applied (never above the subtotal).
    pub discount: Money,
    pub shipping_charge: Money,
    pub payable: Money,
}

/// Prices a cart.
///
/// `discount` and `shipping` come from the coupon resolver and shipping
/// calculator; out-of-range values are clamped here, not rejected.
///
/// ## Errors
/// - `CoreError::MissingConversionRate` when a line's currency has no rate
/// - `CoreError::InvalidUnitPrice` for a non-positive or oversized unit price
///
/// ## Example
/// ```rust
/// use cartwright_core::cart::Cart;
/// use cartwright_core::money::Money;
/// use cartwright_core::pricing::{price, ConversionRates};
/// use cartwright_core::types::{CartLine, VariantKey};
///
/// let cart = Cart::from_lines(vec![
///     CartLine::new("P1", VariantKey::None, 2, Money::from_major(500), "BDT"),
/// ]);
/// let rates = ConversionRates::base_only("BDT");
/// let result = price(&cart, Money::from_major(100), Money::from_major(60), &rates).unwrap();
/// assert_eq!(result.subtotal, Money::from_major(1000));
/// assert_eq!(result.payable, Money::from_major(960));
/// ```
pub fn price(
    cart: &Cart,
    discount: Money,
    shipping: Money,
    rates: &ConversionRates,
) -> CoreResult<PricingResult> {
    let subtotal = rates.subtotal(cart)?;
    let discount = discount.clamp_to(Money::zero(), subtotal);
    let shipping_charge = shipping.non_negative();
    let payable = subtotal
        .saturating_sub_to_zero(discount)
        .saturating_add(shipping_charge);

    debug!(
        subtotal = %subtotal,
        discount = %discount,
        shipping = %shipping_charge,
        payable = %payable,
        "Priced cart"
    );

    Ok(PricingResult {
        currency: rates.base.clone(),
        subtotal,
        discount,
        shipping_charge,
        payable,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VariantKey;
    use proptest::prelude::*;

    fn cart_of(lines: Vec<(i64, u32, &str)>) -> Cart {
        Cart::from_lines(
            lines
                .into_iter()
                .enumerate()
                .map(|(i, (minor, qty, cur))| {
                    CartLine::new(format!("P{}", i), VariantKey::None, qty, Money::from_minor(minor), cur)
                })
                .collect(),
        )
    }

    #[test]
    fn test_global_coupon_totals() {
        // subtotal 1000.00, flat 100 discount, 60 shipping
        let cart = cart_of(vec![(50_000, 2, "BDT")]);
        let result = price(
            &cart,
            Money::from_major(100),
            Money::from_major(60),
            &ConversionRates::base_only("BDT"),
        )
        .unwrap();
        assert_eq!(result.subtotal, Money::from_major(1000));
        assert_eq!(result.discount, Money::from_major(100));
        assert_eq!(result.shipping_charge, Money::from_major(60));
        assert_eq!(result.payable, Money::from_major(960));
        assert_eq!(result.currency, "BDT");
    }

    #[test]
    fn test_discount_is_clamped_to_subtotal() {
        let cart = cart_of(vec![(5_000, 1, "BDT")]);
        let result = price(
            &cart,
            Money::from_major(500),
            Money::from_major(60),
            &ConversionRates::base_only("BDT"),
        )
        .unwrap();
        assert_eq!(result.discount, Money::from_major(50));
        assert_eq!(result.payable, Money::from_major(60));
    }

    #[test]
    fn test_negative_inputs_are_clamped() {
        let cart = cart_of(vec![(5_000, 1, "BDT")]);
        let result = price(
            &cart,
            Money::from_minor(-100),
            Money::from_minor(-100),
            &ConversionRates::base_only("BDT"),
        )
        .unwrap();
        assert!(result.discount.is_zero());
        assert!(result.shipping_charge.is_zero());
        assert_eq!(result.payable, Money::from_major(50));
    }

    #[test]
    fn test_mixed_currencies_convert_then_round_once() {
        // 33.50 USD at 110 = 3685.00 BDT, plus 10.00 BDT
        let rates = ConversionRates::base_only("BDT").with_rate("USD", Decimal::new(110, 0));
        let cart = cart_of(vec![(3350, 1, "usd"), (1_000, 1, "BDT")]);
        let result = price(&cart, Money::zero(), Money::zero(), &rates).unwrap();
        assert_eq!(result.subtotal, Money::from_minor(368_500 + 1_000));

        // half a minor unit per line only rounds at the total
        let rates = ConversionRates::base_only("BDT").with_rate("EUR", Decimal::new(15, 1));
        let cart = cart_of(vec![(1, 3, "EUR")]);
        let result = price(&cart, Money::zero(), Money::zero(), &rates).unwrap();
        assert_eq!(result.subtotal, Money::from_minor(5)); // 4.5 → 5, not 3 × 2
    }

    #[test]
    fn test_missing_rate_is_an_error() {
        let cart = cart_of(vec![(1_000, 1, "USD")]);
        let err = price(&cart, Money::zero(), Money::zero(), &ConversionRates::base_only("BDT"))
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingConversionRate { .. }));

        let zero_rate = ConversionRates::base_only("BDT").with_rate("USD", Decimal::ZERO);
        assert!(zero_rate.rate_for("USD").is_err());
    }

    #[test]
    fn test_empty_cart() {
        let result = price(
            &Cart::new(),
            Money::from_major(10),
            Money::from_major(60),
            &ConversionRates::base_only("BDT"),
        )
        .unwrap();
        assert!(result.subtotal.is_zero());
        assert!(result.discount.is_zero());
        assert_eq!(result.payable, Money::from_major(60));
    }

    #[test]
    fn test_negative_unit_price_is_rejected() {
        // a tampered line must not cancel out the real one
        let cart = cart_of(vec![(100_000, 1, "BDT"), (-90_000, 1, "BDT")]);
        let err = price(&cart, Money::zero(), Money::from_major(60), &ConversionRates::base_only("BDT"))
            .unwrap_err();
        match err {
            CoreError::InvalidUnitPrice { product_id, unit_price, .. } => {
                assert_eq!(product_id, "P1");
                assert_eq!(unit_price, Money::from_minor(-90_000));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let free = cart_of(vec![(0, 1, "BDT")]);
        assert!(matches!(
            price(&free, Money::zero(), Money::zero(), &ConversionRates::base_only("BDT")),
            Err(CoreError::InvalidUnitPrice { .. })
        ));
    }

    #[test]
    fn test_oversized_unit_price_is_rejected_without_overflow() {
        let rates = ConversionRates::base_only("BDT");
        let cart = cart_of(vec![(i64::MAX, 3, "BDT")]);
        assert!(matches!(
            price(&cart, Money::zero(), Money::from_major(60), &rates),
            Err(CoreError::InvalidUnitPrice { .. })
        ));

        // the bound applies after conversion
        let rates = rates.with_rate("USD", Decimal::new(110, 0));
        let cart = cart_of(vec![(MAX_UNIT_PRICE.minor(), 1, "USD")]);
        assert!(price(&cart, Money::zero(), Money::zero(), &rates).is_err());

        // the largest accepted cart still prices
        let cart = cart_of(vec![(MAX_UNIT_PRICE.minor(), 3, "BDT")]);
        let result = price(&cart, Money::zero(), Money::from_major(60), &rates).unwrap();
        assert_eq!(result.subtotal.minor(), MAX_UNIT_PRICE.minor() * 3);
        assert_eq!(result.payable.minor(), MAX_UNIT_PRICE.minor() * 3 + 6_000);
    }

    proptest! {
        #[test]
        fn payable_is_never_negative_and_monotonic_in_discount(
            minor in 1i64..1_000_000,
            qty in 1u32..4,
            shipping in -10_000i64..20_000,
            d1 in -10_000i64..2_000_000,
            d2 in -10_000i64..2_000_000,
        ) {
            let cart = cart_of(vec![(minor, qty, "BDT")]);
            let rates = ConversionRates::base_only("BDT");
            let (lo, hi) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
            let a = price(&cart, Money::from_minor(lo), Money::from_minor(shipping), &rates).unwrap();
            let b = price(&cart, Money::from_minor(hi), Money::from_minor(shipping), &rates).unwrap();
            prop_assert!(!a.payable.is_negative());
            prop_assert!(a.discount <= a.subtotal);
            prop_assert!(b.payable <= a.payable);
        }

        #[test]
        fn payable_grows_with_shipping(minor in 1i64..1_000_000, s1 in 0i64..50_000, s2 in 0i64..50_000) {
            let cart = cart_of(vec![(minor, 1, "BDT")]);
            let rates = ConversionRates::base_only("BDT");
            let (lo, hi) = if s1 <= s2 { (s1, s2) } else { (s2, s1) };
            let a = price(&cart, Money::zero(), Money::from_minor(lo), &rates).unwrap();
            let b = price(&cart, Money::zero(), Money::from_minor(hi), &rates).unwrap();
            prop_assert!(a.payable <= b.payable);
        }

        #[test]
        fn payable_grows_with_line_quantity(
            lines in prop::collection::vec((1i64..1_000_000, 1u32..4), 1..5),
            pick in any::<prop::sample::Index>(),
            discount in 0i64..500_000,
            shipping in 0i64..20_000,
        ) {
            let rates = ConversionRates::base_only("BDT").with_rate("USD", Decimal::new(11_025, 2));
            let target = pick.index(lines.len());
            let with_qty = |qty: u32| {
                let lines = lines
                    .iter()
                    .enumerate()
                    .map(|(i, (minor, q))| {
                        let currency = if i % 2 == 0 { "BDT" } else { "USD" };
                        (*minor, if i == target { qty } else { *q }, currency)
                    })
                    .collect();
                price(&cart_of(lines), Money::from_minor(discount), Money::from_minor(shipping), &rates)
                    .unwrap()
            };

            let mut previous = with_qty(1);
            for qty in 2..=3 {
                let next = with_qty(qty);
                prop_assert!(next.subtotal >= previous.subtotal);
                prop_assert!(next.payable >= previous.payable);
                previous = next;
            }
        }
    }
}
