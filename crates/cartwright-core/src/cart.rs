//! # Cart
//!
//! The client-held cart as a value type, plus the normalizer that every
//! mutation runs through.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  User Action              Operation                Result               │
//! │  ───────────              ─────────                ──────               │
//! │                                                                         │
//! │  Add to cart ────────────► add_line() ───────────► merge + clamp       │
//! │                                                                         │
//! │  Change quantity ────────► set_quantity() ───────► clamp / 0 removes   │
//! │                                                                         │
//! │  Change size ────────────► change_variant() ─────► rekey + merge       │
//! │                                                                         │
//! │  Click remove ───────────► remove_line() ────────► line dropped        │
//! │                                                                         │
//! │  Page load ──────────────► Cart::from_lines() ───► normalize(stored)   │
//! │                                                                         │
//! │  NOTE: every operation ends in normalize(); a Cart never holds two     │
//! │        lines with the same key or a quantity outside 1..=3.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::types::{CartLine, LineKey, VariantKey};
use crate::MAX_LINE_QUANTITY;

// =============================================================================
// Normalizer
// =============================================================================

/// Deduplicates and caps cart lines.
///
/// ## Rules
/// - Lines sharing `(product_id, variant_key)` are merged; quantities are
///   summed and the sum clamped to [`MAX_LINE_QUANTITY`]
/// - Single lines are clamped to the same maximum
/// - Zero-quantity lines are dropped
/// - The first-seen line of each key keeps its position, price and currency
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
///
/// ## Example
/// ```rust
/// use cartwright_core::cart::normalize;
/// use cartwright_core::money::Money;
/// use cartwright_core::types::{CartLine, VariantKey};
///
/// let lines = vec![
///     CartLine::new("P1", VariantKey::size("M"), 1, Money::from_major(500), "BDT"),
///     CartLine::new("P2", VariantKey::None, 9, Money::from_major(80), "BDT"),
///     CartLine::new("P1", VariantKey::size("M"), 1, Money::from_major(500), "BDT"),
/// ];
/// let out = normalize(lines);
/// assert_eq!(out.len(), 2);
/// assert_eq!(out[0].quantity, 2);
/// assert_eq!(out[1].quantity, 3);
/// ```
pub fn normalize(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut out: Vec<CartLine> = Vec::with_capacity(lines.len());
    let mut positions: HashMap<LineKey, usize> = HashMap::with_capacity(lines.len());

    for line in lines {
        if line.quantity == 0 {
            debug!(product_id = %line.product_id, variant = %line.variant_key, "Dropping zero-quantity line");
            continue;
        }

        let key = line.key();
        if let Some(existing) = positions.get(&key).copied().and_then(|idx| out.get_mut(idx)) {
            let summed = existing.quantity.saturating_add(line.quantity);
            existing.quantity = summed.min(MAX_LINE_QUANTITY);
            debug!(line = %key, summed, kept = existing.quantity, "Merged duplicate cart line");
            continue;
        }

        let mut line = line;
        if line.quantity > MAX_LINE_QUANTITY {
            debug!(line = %key, requested = line.quantity, "Clamped line quantity");
            line.quantity = MAX_LINE_QUANTITY;
        }
        positions.insert(key, out.len());
        out.push(line);
    }

    out
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart, rebuilt from client-persisted lines on every read.
///
/// ## Invariants
/// - Lines are unique by `(product_id, variant_key)`
/// - `1 <= quantity <= 3` for every line
/// - No server-only fields (stock, discount); those are derived
///
/// Serialized as a plain array of lines. Deserializing normalizes, so a
/// tampered client payload can never break the invariants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        Cart::from_lines(lines)
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Builds a cart from raw (untrusted) lines.
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Cart {
            lines: normalize(lines),
        }
    }

    /// Lines in display order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consumes the cart, returning its lines.
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// Looks up a line by key.
    pub fn line(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.has_key(key))
    }

    /// First line (in cart order) for a product, regardless of size.
    pub fn first_line_for_product(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Returns true when any line holds the product.
    pub fn contains_product(&self, product_id: &str) -> bool {
        self.first_line_for_product(product_id).is_some()
    }

    /// Adds a line or increases the quantity of a matching one.
    ///
    /// ## Behavior
    /// - Same key already in cart: quantities merge, capped at 3
    /// - Otherwise: appended at the end
    pub fn add_line(&mut self, line: CartLine) {
        let mut lines = std::mem::take(&mut self.lines);
        lines.push(line);
        self.lines = normalize(lines);
    }

    /// Sets the quantity of a line.
    ///
    /// ## Behavior
    /// - Quantity 0: removes the line
    /// - Quantity above 3: clamped
    /// - Key not in cart: `CoreError::LineNotFound`
    pub fn set_quantity(&mut self, key: &LineKey, quantity: u32) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_line(key);
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.has_key(key))
            .ok_or_else(|| line_not_found(key))?;
        line.quantity = quantity.min(MAX_LINE_QUANTITY);
        Ok(())
    }

    /// Removes a line by key.
    pub fn remove_line(&mut self, key: &LineKey) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| !l.has_key(key));

        if self.lines.len() == initial_len {
            Err(line_not_found(key))
        } else {
            Ok(())
        }
    }

    /// Swaps the size of a line.
    ///
    /// If the new size is already in the cart the two lines merge (quantities
    /// summed and capped) at the position of the earlier one.
    pub fn change_variant(&mut self, key: &LineKey, variant_key: VariantKey) -> CoreResult<()> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.has_key(key))
            .ok_or_else(|| line_not_found(key))?;
        line.variant_key = variant_key;

        let lines = std::mem::take(&mut self.lines);
        self.lines = normalize(lines);
        Ok(())
    }

    /// Clears all lines (after a successful order).
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

fn line_not_found(key: &LineKey) -> CoreError {
    CoreError::LineNotFound {
        product_id: key.product_id.clone(),
        variant_key: key.variant_key.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
