//! # Coupon Resolver
//!
//! Fetches a coupon by code and evaluates it against the current cart.
//! The orchestrator owns the single applied-coupon slot and calls
//! [`CouponResolver::revalidate`] after every cart change.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cartwright_core::{evaluate_coupon, Cart, ConversionRates, Coupon, CouponOutcome, CouponRejection, Money};

use crate::collaborators::{Clock, CouponLookup};
use crate::error::CheckoutResult;

/// The coupon currently attached to a session, with the discount it grants
/// against the cart it was last evaluated on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    pub coupon: Coupon,
    pub discount: Money,
}

impl AppliedCoupon {
    pub fn code(&self) -> &str {
        self.coupon.code()
    }
}

/// Resolves coupon codes through a [`CouponLookup`].
#[derive(Clone)]
pub struct CouponResolver {
    lookup: Arc<dyn CouponLookup>,
    clock: Arc<dyn Clock>,
    rates: ConversionRates,
}

impl CouponResolver {
    pub fn new(lookup: Arc<dyn CouponLookup>, clock: Arc<dyn Clock>, rates: ConversionRates) -> Self {
        CouponResolver { lookup, clock, rates }
    }

    /// Fetches `code` and evaluates it against `cart`.
    ///
    /// A failed lookup is `Rejected(LOOKUP_FAILED)`: a coupon is never applied
    /// (or kept) without the coupon service confirming it.
    ///
    /// ## Errors
    /// Only pricing errors for the matched line (`MissingConversionRate`,
    /// `InvalidUnitPrice`).
    pub async fn resolve(&self, code: &str, cart: &Cart, cart_total: Money) -> CheckoutResult<CouponOutcome> {
        let coupon = match self.lookup.coupon(code).await {
            Ok(Some(coupon)) => coupon,
            Ok(None) => {
                debug!(%code, "Coupon not found");
                return Ok(CouponOutcome::Rejected(CouponRejection::NotFound));
            }
            Err(err) => {
                warn!(%code, error = %err, "Coupon lookup failed");
                return Ok(CouponOutcome::Rejected(CouponRejection::LookupFailed));
            }
        };

        Ok(evaluate_coupon(&coupon, cart, cart_total, self.clock.now(), &self.rates)?)
    }

    /// Re-runs resolution for an applied coupon against the current cart.
    pub async fn revalidate(
        &self,
        applied: &AppliedCoupon,
        cart: &Cart,
        cart_total: Money,
    ) -> CheckoutResult<CouponOutcome> {
        let code = applied.code().trim().to_uppercase();
        self.resolve(&code, cart, cart_total).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FixedClock, InMemoryCoupons};
    use cartwright_core::{CartLine, VariantKey};
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn clock() -> FixedClock {
        FixedClock::at(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap())
    }

    fn resolver(coupons: InMemoryCoupons) -> CouponResolver {
        CouponResolver::new(Arc::new(coupons), Arc::new(clock()), ConversionRates::base_only("BDT"))
    }

    fn cart() -> Cart {
        Cart::from_lines(vec![CartLine::new(
            "P1",
            VariantKey::None,
            1,
            Money::from_major(1000),
            "BDT",
        )])
    }

    #[tokio::test]
    async fn test_product_coupon_resolves() {
        let coupons = InMemoryCoupons::from_coupons(vec![Coupon::Product {
            code: "TEN".into(),
            product_id: "P1".into(),
            discount_percentage: Decimal::new(10, 0),
            expires_at: clock().now() + Duration::days(1),
        }])
        .unwrap();

        let outcome = resolver(coupons)
            .resolve("TEN", &cart(), Money::from_major(1000))
            .await
            .unwrap();
        assert_eq!(outcome.discount(), Money::from_major(100));
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let outcome = resolver(InMemoryCoupons::new())
            .resolve("NOPE", &cart(), Money::from_major(1000))
            .await
            .unwrap();
        assert_eq!(outcome, CouponOutcome::Rejected(CouponRejection::NotFound));
    }

    #[tokio::test]
    async fn test_lookup_failure_rejects() {
        let coupons = InMemoryCoupons::new();
        coupons.set_failing(true);
        let outcome = resolver(coupons)
            .resolve("ANY", &cart(), Money::from_major(1000))
            .await
            .unwrap();
        assert_eq!(outcome, CouponOutcome::Rejected(CouponRejection::LookupFailed));
    }
}
