//! # cartwright-core: Pure Checkout Logic for the Storefront
//!
//! This crate holds every rule that decides what a customer actually pays.
//! It has zero I/O dependencies: stock facts, coupons and the current time
//! are handed in by the caller.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Checkout                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Storefront UI / HTTP layer (client-held cart)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         cartwright-checkout (lookups + state machine)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cartwright-core (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │  ┌────────┐ ┌───────────┐ ┌────────┐ ┌─────────┐ ┌──────────┐  │   │
//! │  │  │  cart  │ │ inventory │ │ coupon │ │ pricing │ │ shipping │  │   │
//! │  │  │ dedup  │ │  assess   │ │ rules  │ │ totals  │ │  metro/  │  │   │
//! │  │  │ + cap  │ │ stock fact│ │        │ │         │ │  other   │  │   │
//! │  │  └────────┘ └───────────┘ └────────┘ └─────────┘ └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCK • NO GLOBAL STATE • PURE FUNCTIONS          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Boundary types (CartLine, VariantKey, StockFact, PaymentMethod, ...)
//! - [`money`] - Money type with integer minor units
//! - [`cart`] - Cart value type, normalizer and user mutations
//! - [`inventory`] - Per-line assessment of a stock fact
//! - [`coupon`] - Product and global coupon rules
//! - [`pricing`] - Currency normalization and totals
//! - [`shipping`] - Destination-based shipping charge
//! - [`validation`] - Field-level input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use cartwright_core::cart::normalize;
//! use cartwright_core::money::Money;
//! use cartwright_core::types::{CartLine, VariantKey};
//!
//! let lines = vec![
//!     CartLine::new("P1", VariantKey::None, 2, Money::from_major(500), "BDT"),
//!     CartLine::new("P1", VariantKey::None, 2, Money::from_major(500), "BDT"),
//! ];
//!
//! let normalized = normalize(lines);
//! assert_eq!(normalized.len(), 1);
//! assert_eq!(normalized[0].quantity, 3); // 4 clamped to the per-line maximum
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod coupon;
pub mod error;
pub mod inventory;
pub mod money;
pub mod pricing;
pub mod shipping;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{normalize, Cart};
pub use coupon::{evaluate_coupon, Coupon, CouponOutcome, CouponRejection};
pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::{assess_line, LineAssessment, LineIssue, StockReading};
pub use money::Money;
pub use pricing::{price, ConversionRates, PricingResult};
pub use shipping::{
    shipping_charge, DistrictClassifier, MetroClassifier, RegionBucket, ShippingRateTable,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single line (product + variant).
///
/// ## Business Reason
/// Limits hoarding of limited-stock items; enforced by the normalizer and
/// again by the inventory validator.
pub const MAX_LINE_QUANTITY: u32 = 3;

/// Largest unit price the engine accepts, after conversion to the base
/// currency (10,000,000.00).
///
/// Carts are client-held, so the bound keeps a tampered price from
/// overflowing the totals.
pub const MAX_UNIT_PRICE: money::Money = money::Money::from_major(10_000_000);

/// Base currency when no configuration overrides it.
pub const DEFAULT_BASE_CURRENCY: &str = "BDT";
