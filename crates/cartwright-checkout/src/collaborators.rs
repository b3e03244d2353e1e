//! # Collaborators
//!
//! The engine's only doors to the outside world. Every network call the
//! checkout needs goes through one of these traits; nothing else does I/O.
//!
//! ```text
//! ┌──────────────┐   stock(product, size)        ┌───────────────────────┐
//! │              │ ─────────────────────────────►│ StockLookup           │
//! │              │   coupon(code)                ├───────────────────────┤
//! │   Checkout   │ ─────────────────────────────►│ CouponLookup          │
//! │              │   create_order / usage        ├───────────────────────┤
//! │              │ ─────────────────────────────►│ OrderGateway          │
//! │              │   now()                       ├───────────────────────┤
//! │              │ ─────────────────────────────►│ Clock                 │
//! │              │   on_change(cart)             ├───────────────────────┤
//! │              │ ─────────────────────────────►│ CartObserver          │
//! └──────────────┘                               └───────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cartwright_core::{Cart, Coupon, StockFact, VariantKey};

use crate::error::LookupError;
use crate::order::{OrderPayload, OrderReceipt};

/// Reads authoritative stock for one product (and size).
#[async_trait]
pub trait StockLookup: Send + Sync {
    /// `Ok(None)` means the product or size no longer exists.
    async fn stock(
        &self,
        product_id: &str,
        variant_key: &VariantKey,
    ) -> Result<Option<StockFact>, LookupError>;
}

/// Reads a coupon definition by code.
#[async_trait]
pub trait CouponLookup: Send + Sync {
    /// `Ok(None)` means no coupon has this code.
    ///
    /// `code` always arrives trimmed and upper-cased, both for codes the
    /// customer typed and for re-validation of an applied coupon. A service
    /// that stores codes case-sensitively must index them upper-cased.
    async fn coupon(&self, code: &str) -> Result<Option<Coupon>, LookupError>;
}

/// Order service.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Creates the order. Only `Ok` means an order exists.
    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderReceipt, LookupError>;

    /// Records that a customer used a coupon. Best-effort.
    async fn record_coupon_usage(&self, code: &str, customer_identity: &str)
        -> Result<(), LookupError>;
}

/// Source of the current time, for coupon expiry and timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Notified after every successful cart change (storage, UI badge, ...).
pub trait CartObserver: Send + Sync {
    fn on_change(&self, cart: &Cart);
}

/// Observer that ignores every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl CartObserver for NoOpObserver {
    fn on_change(&self, _cart: &Cart) {}
}
