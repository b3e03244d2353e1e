//! # In-Memory Collaborators
//!
//! Collaborator implementations backed by plain maps. Used by the tests and
//! by the `checkout-sim` binary; a real storefront plugs in HTTP clients.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use cartwright_core::{CoreResult, Coupon, StockFact, VariantKey};

use crate::collaborators::{Clock, CouponLookup, OrderGateway, StockLookup};
use crate::error::LookupError;
use crate::order::{OrderPayload, OrderReceipt};

// =============================================================================
// Stock
// =============================================================================

/// Stock facts keyed by product and size.
///
/// A fact stored without a size answers for every size of the product.
#[derive(Debug, Default)]
pub struct InMemoryStock {
    facts: Vec<StockFact>,
    failing: HashSet<String>,
    delay: Option<Duration>,
}

impl InMemoryStock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from a list of facts (e.g. a scenario file).
    pub fn from_facts(facts: Vec<StockFact>) -> Self {
        InMemoryStock {
            facts,
            ..Default::default()
        }
    }

    /// Adds a fact for one product size. Builder style.
    pub fn with_stock(mut self, product_id: &str, size: &str, available: u32, title: &str) -> Self {
        let variant = VariantKey::from(size);
        self.facts.push(StockFact {
            product_id: product_id.to_string(),
            variant_key: Some(variant),
            available_quantity: available,
            product_title: title.to_string(),
        });
        self
    }

    /// Makes every lookup for `product_id` fail.
    pub fn failing_for(mut self, product_id: &str) -> Self {
        self.failing.insert(product_id.to_string());
        self
    }

    /// Delays every lookup, for timeout tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl StockLookup for InMemoryStock {
    async fn stock(
        &self,
        product_id: &str,
        variant_key: &VariantKey,
    ) -> Result<Option<StockFact>, LookupError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(product_id) {
            return Err(LookupError::Unavailable(format!(
                "inventory service down for {}",
                product_id
            )));
        }

        let exact = self
            .facts
            .iter()
            .find(|f| f.product_id == product_id && f.variant_key.as_ref() == Some(variant_key));
        let product_wide = || {
            self.facts
                .iter()
                .find(|f| f.product_id == product_id && f.variant_key.is_none())
        };

        Ok(exact.or_else(product_wide).cloned())
    }
}

// =============================================================================
// Coupons
// =============================================================================

/// Coupon definitions keyed by upper-cased code.
#[derive(Debug, Default)]
pub struct InMemoryCoupons {
    coupons: HashMap<String, Coupon>,
    failing: AtomicBool,
}

impl InMemoryCoupons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from a list of definitions, rejecting malformed ones.
    pub fn from_coupons(coupons: Vec<Coupon>) -> CoreResult<Self> {
        let mut store = Self::new();
        for coupon in coupons {
            store.insert(coupon)?;
        }
        Ok(store)
    }

    /// Adds or replaces a definition.
    pub fn insert(&mut self, coupon: Coupon) -> CoreResult<()> {
        coupon.check_definition()?;
        self.coupons
            .insert(coupon.code().trim().to_uppercase(), coupon);
        Ok(())
    }

    /// Makes every lookup fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl CouponLookup for InMemoryCoupons {
    async fn coupon(&self, code: &str) -> Result<Option<Coupon>, LookupError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LookupError::Unavailable("coupon service down".into()));
        }
        Ok(self.coupons.get(&code.trim().to_uppercase()).cloned())
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Order gateway that records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingOrderGateway {
    orders: Mutex<Vec<OrderPayload>>,
    coupon_usages: Mutex<Vec<(String, String)>>,
    fail_orders: AtomicBool,
    fail_usage: AtomicBool,
}

impl RecordingOrderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create_order` fail (or succeed again).
    pub fn set_fail_orders(&self, fail: bool) {
        self.fail_orders.store(fail, Ordering::SeqCst);
    }

    /// Makes `record_coupon_usage` fail (or succeed again).
    pub fn set_fail_usage(&self, fail: bool) {
        self.fail_usage.store(fail, Ordering::SeqCst);
    }

    /// Payloads of every successfully created order.
    pub async fn orders(&self) -> Vec<OrderPayload> {
        self.orders.lock().await.clone()
    }

    /// `(code, customer identity)` pairs recorded so far.
    pub async fn coupon_usages(&self) -> Vec<(String, String)> {
        self.coupon_usages.lock().await.clone()
    }
}

#[async_trait]
impl OrderGateway for RecordingOrderGateway {
    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderReceipt, LookupError> {
        if self.fail_orders.load(Ordering::SeqCst) {
            return Err(LookupError::Unavailable("order service returned 503".into()));
        }
        debug!(order_id = %payload.order_id, "Recording order");
        self.orders.lock().await.push(payload.clone());
        Ok(OrderReceipt {
            order_id: payload.order_id,
        })
    }

    async fn record_coupon_usage(
        &self,
        code: &str,
        customer_identity: &str,
    ) -> Result<(), LookupError> {
        if self.fail_usage.load(Ordering::SeqCst) {
            return Err(LookupError::Unavailable("coupon usage service down".into()));
        }
        self.coupon_usages
            .lock()
            .await
            .push((code.to_string(), customer_identity.to_string()));
        Ok(())
    }
}

// =============================================================================
// Clock
// =============================================================================

/// A clock stopped at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        FixedClock { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stock_prefers_exact_size_then_product_wide() {
        let stock = InMemoryStock::from_facts(vec![StockFact {
            product_id: "P2".into(),
            variant_key: None,
            available_quantity: 4,
            product_title: "Mug".into(),
        }])
        .with_stock("P1", "M", 1, "Linen Shirt");

        let m = stock.stock("P1", &VariantKey::size("M")).await.unwrap();
        assert_eq!(m.unwrap().available_quantity, 1);
        assert!(stock.stock("P1", &VariantKey::size("L")).await.unwrap().is_none());
        assert!(stock.stock("P2", &VariantKey::None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_coupon_codes_are_case_insensitive() {
        let coupons = InMemoryCoupons::from_coupons(vec![Coupon::Global {
            code: "Flat50".into(),
            discount_amount: cartwright_core::Money::from_major(50),
            min_cart_total: cartwright_core::Money::zero(),
            expires_at: Utc::now(),
        }])
        .unwrap();
        assert!(coupons.coupon("flat50").await.unwrap().is_some());
        assert!(coupons.coupon("FLAT50").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_gateway_failure_switch() {
        let gateway = RecordingOrderGateway::new();
        gateway.set_fail_usage(true);
        assert!(gateway.record_coupon_usage("A", "b").await.is_err());
        gateway.set_fail_usage(false);
        assert!(gateway.record_coupon_usage("A", "b").await.is_ok());
        assert_eq!(gateway.coupon_usages().await.len(), 1);
    }
}
