//! # cartwright-checkout: Checkout Engine for the Storefront
//!
//! This crate turns a client-held cart into a placed order. It owns the
//! checkout state machine and every call to stock, coupon and order services.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Checkout Architecture                           │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 Checkout (Main Orchestrator)                     │  │
//! │  │                                                                  │  │
//! │  │  Drives CheckoutSession: Building → Validating → ... → Succeeded │  │
//! │  │  Returns an authoritative Quote from every mutating call         │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │InventoryValid. │  │ CouponResolver │  │  OrderGateway          │    │
//! │  │                │  │                │  │                        │    │
//! │  │ One stock      │  │ Lookup + rules │  │ create_order           │    │
//! │  │ lookup per line│  │ from core      │  │ record_coupon_usage    │    │
//! │  │ (concurrent)   │  │                │  │ (best-effort)          │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  Pricing, shipping and line rules come from cartwright-core.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`orchestrator`] - Main `Checkout` engine and its builder
//! - [`session`] - Session state, statuses and customer notices
//! - [`inventory`] - Concurrent stock validation of a cart
//! - [`coupon`] - Coupon lookup and re-validation
//! - [`order`] - Order payload, receipt and submit outcome
//! - [`collaborators`] - Traits for the outside services
//! - [`memory`] - In-memory collaborators (tests, simulator)
//! - [`config`] - Checkout configuration (currency, shipping, payment)
//! - [`error`] - Checkout error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cartwright_checkout::{CheckoutBuilder, CheckoutConfig};
//!
//! let checkout = CheckoutBuilder::new(CheckoutConfig::load_or_default(None))
//!     .with_stock(Arc::new(stock_client))
//!     .with_coupons(Arc::new(coupon_client))
//!     .with_orders(Arc::new(order_client))
//!     .build()?;
//!
//! let mut session = checkout.begin(cart)?;
//! checkout.update_customer(&mut session, customer)?;
//! checkout.accept_terms(&mut session, true)?;
//! let outcome = checkout.submit(&mut session).await?;
//! println!("Order: {:?}", outcome.order_id);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod collaborators;
pub mod config;
pub mod coupon;
pub mod error;
pub mod inventory;
pub mod memory;
pub mod order;
pub mod orchestrator;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use collaborators::{
    CartObserver, Clock, CouponLookup, NoOpObserver, OrderGateway, StockLookup, SystemClock,
};
pub use config::CheckoutConfig;
pub use coupon::{AppliedCoupon, CouponResolver};
pub use error::{CheckoutError, CheckoutResult, ErrorKind, LookupError};
pub use inventory::{CartValidation, InventoryValidator};
pub use order::{OrderLine, OrderPayload, OrderReceipt, SubmitOutcome};
pub use orchestrator::{Checkout, CheckoutBuilder, Quote};
pub use session::{CheckoutSession, CheckoutStatus, Failure, FailureReason, Notice};
