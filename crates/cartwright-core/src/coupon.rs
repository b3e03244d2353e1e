//! # Coupon Rules
//!
//! Eligibility and discount for the two coupon kinds. Fetching the coupon
//! and keeping the single applied slot are `cartwright-checkout` concerns.
//!
//! ## Evaluation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. expired?  ────────────────────────────────────► Rejected(EXPIRED)  │
//! │                                                                         │
//! │  2a. Product coupon                                                     │
//! │      product in cart? ──no──────────► Rejected(PRODUCT_NOT_IN_CART)     │
//! │      discount = unit price of first matching line × pct / 100          │
//! │                                                                         │
//! │  2b. Global coupon                                                      │
//! │      cart total ≥ minimum? ──no─────► Rejected(BELOW_MINIMUM)           │
//! │      discount = min(flat amount, cart total)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::ConversionRates;

// =============================================================================
// Coupon
// =============================================================================

/// A discount coupon as stored by the coupon service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Coupon {
    /// Percentage off one product.
    #[serde(rename_all = "camelCase")]
    Product {
        code: String,
        product_id: String,
        /// 0..=100
        #[ts(as = "String")]
        discount_percentage: Decimal,
        #[ts(as = "String")]
        expires_at: DateTime<Utc>,
    },

    /// Flat amount off the whole cart above a minimum total.
    #[serde(rename_all = "camelCase")]
    Global {
        code: String,
        /// Base-currency minor units.
        discount_amount: Money,
        /// Base-currency minor units.
        min_cart_total: Money,
        #[ts(as = "String")]
        expires_at: DateTime<Utc>,
    },
}

impl Coupon {
    pub fn code(&self) -> &str {
        match self {
            Coupon::Product { code, .. } | Coupon::Global { code, .. } => code,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        match self {
            Coupon::Product { expires_at, .. } | Coupon::Global { expires_at, .. } => *expires_at,
        }
    }

    /// A coupon is usable up to and including its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    /// Checks that the stored definition makes sense.
    ///
    /// ## Errors
    /// `CoreError::InvalidCoupon` for an empty code, a percentage outside
    /// 0..=100, or a negative amount.
    pub fn check_definition(&self) -> CoreResult<()> {
        let invalid = |reason: &str| CoreError::InvalidCoupon {
            code: self.code().to_string(),
            reason: reason.to_string(),
        };

        if self.code().trim().is_empty() {
            return Err(invalid("code is empty"));
        }

        match self {
            Coupon::Product {
                discount_percentage,
                product_id,
                ..
            } => {
                if product_id.trim().is_empty() {
                    return Err(invalid("product id is empty"));
                }
                if *discount_percentage < Decimal::ZERO || *discount_percentage > Decimal::ONE_HUNDRED {
                    return Err(invalid("discount percentage must be between 0 and 100"));
                }
            }
            Coupon::Global {
                discount_amount,
                min_cart_total,
                ..
            } => {
                if discount_amount.is_negative() || min_cart_total.is_negative() {
                    return Err(invalid("amounts must not be negative"));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Why a coupon was not applied (or was detached).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponRejection {
    NotFound,
    Expired,
    ProductNotInCart,
    BelowMinimum,
    /// The coupon service could not be reached.
    LookupFailed,
}

impl CouponRejection {
    /// Customer-facing sentence for this rejection.
    pub fn message(&self, code: &str) -> String {
        match self {
            CouponRejection::NotFound => format!("Coupon {} does not exist", code),
            CouponRejection::Expired => format!("Coupon {} has expired", code),
            CouponRejection::ProductNotInCart => {
                format!("Coupon {} only applies to a product that is not in your cart", code)
            }
            CouponRejection::BelowMinimum => {
                format!("Your cart total is below the minimum for coupon {}", code)
            }
            CouponRejection::LookupFailed => {
                format!("Coupon {} could not be verified right now and was removed", code)
            }
        }
    }
}

/// Result of evaluating a coupon against a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum CouponOutcome {
    Applied { coupon: Coupon, discount: Money },
    Rejected(CouponRejection),
}

impl CouponOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CouponOutcome::Applied { .. })
    }

    /// Discount granted, zero when rejected.
    pub fn discount(&self) -> Money {
        match self {
            CouponOutcome::Applied { discount, .. } => *discount,
            CouponOutcome::Rejected(_) => Money::zero(),
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluates an already-fetched coupon against the current cart.
///
/// `cart_total` is the base-currency subtotal; `now` is supplied by the
/// caller's clock.
///
/// ## Errors
/// `CoreError::MissingConversionRate` or `CoreError::InvalidUnitPrice` when
/// the matched line of a product coupon cannot be priced.
///
/// ## Example
/// ```rust
/// use chrono::{Duration, Utc};
/// use cartwright_core::cart::Cart;
/// use cartwright_core::coupon::{evaluate_coupon, Coupon, CouponOutcome, CouponRejection};
/// use cartwright_core::money::Money;
/// use cartwright_core::pricing::ConversionRates;
///
/// let now = Utc::now();
/// let coupon = Coupon::Global {
///     code: "FLAT200".into(),
///     discount_amount: Money::from_major(200),
///     min_cart_total: Money::from_major(1000),
///     expires_at: now + Duration::days(1),
/// };
/// let outcome = evaluate_coupon(
///     &coupon,
///     &Cart::new(),
///     Money::from_major(900),
///     now,
///     &ConversionRates::base_only("BDT"),
/// )
/// .unwrap();
/// assert_eq!(outcome, CouponOutcome::Rejected(CouponRejection::BelowMinimum));
/// ```
pub fn evaluate_coupon(
    coupon: &Coupon,
    cart: &Cart,
    cart_total: Money,
    now: DateTime<Utc>,
    rates: &ConversionRates,
) -> CoreResult<CouponOutcome> {
    if coupon.is_expired(now) {
        debug!(code = coupon.code(), "Coupon expired");
        return Ok(CouponOutcome::Rejected(CouponRejection::Expired));
    }

    let cart_total = cart_total.non_negative();

    let discount = match coupon {
        Coupon::Product {
            product_id,
            discount_percentage,
            ..
        } => {
            let Some(line) = cart.first_line_for_product(product_id) else {
                debug!(code = coupon.code(), %product_id, "Coupon product not in cart");
                return Ok(CouponOutcome::Rejected(CouponRejection::ProductNotInCart));
            };

            // Policy: the percentage applies to ONE unit of the first matching
            // line, not to the quantity-extended line total. Pending
            // confirmation from the business side before changing.
            let pct = (*discount_percentage).clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
            let unit_price = rates.unit_price_in_base(line)?;
            Money::from_decimal_minor(unit_price * pct / Decimal::ONE_HUNDRED)
        }
        Coupon::Global {
            discount_amount,
            min_cart_total,
            ..
        } => {
            if cart_total < *min_cart_total {
                debug!(
                    code = coupon.code(),
                    cart_total = %cart_total,
                    minimum = %min_cart_total,
                    "Cart below coupon minimum"
                );
                return Ok(CouponOutcome::Rejected(CouponRejection::BelowMinimum));
            }
            *discount_amount
        }
    };

    let discount = discount.clamp_to(Money::zero(), cart_total);
    debug!(code = coupon.code(), discount = %discount, "Coupon applies");

    Ok(CouponOutcome::Applied {
        coupon: coupon.clone(),
        discount,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
