//! # Inventory Assessment
//!
//! Decides, for one cart line and one stock reading, whether the line is
//! still valid and what its corrected quantity is. The lookup itself lives
//! in `cartwright-checkout`; this module only judges the result.
//!
//! ## Decision Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reading              requested        issue               corrected    │
//! │  ───────              ─────────        ─────               ─────────    │
//! │  (any)                > 3              MAX_EXCEEDED        min(3, avail)│
//! │  not found            any              UNAVAILABLE         0            │
//! │  wrong size / 0 left  any              UNAVAILABLE         0            │
//! │  found                > available      INSUFFICIENT_STOCK  available    │
//! │  found                <= available     (valid)             requested    │
//! │  lookup failed        <= 3             LOOKUP_FAILED       requested    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A corrected quantity of 0 means "remove the line".

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{CartLine, StockFact, VariantKey};
use crate::MAX_LINE_QUANTITY;

// =============================================================================
// Line Issue
// =============================================================================

/// Why a line failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineIssue {
    /// More than the per-line maximum was requested.
    MaxExceeded,
    /// Product deleted, size discontinued, or nothing left.
    Unavailable,
    /// Fewer units in stock than requested.
    InsufficientStock,
    /// The stock lookup failed or timed out.
    LookupFailed,
}

// =============================================================================
// Stock Reading
// =============================================================================

/// Outcome of one stock lookup, as seen by the assessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockReading {
    /// The inventory service answered with a fact.
    Found(StockFact),
    /// The product (or size) does not exist anymore.
    NotFound,
    /// Transport failure or timeout.
    Failed { reason: String },
}

// =============================================================================
// Line Assessment
// =============================================================================

/// Per-line validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineAssessment {
    pub product_id: String,

    #[ts(type = "string")]
    pub variant_key: VariantKey,

    pub valid: bool,

    pub requested_quantity: u32,

    /// Quantity the line should have now; 0 removes it.
    pub corrected_quantity: u32,

    pub issue: Option<LineIssue>,

    /// Title reported by the inventory service, when it answered.
    pub product_title: Option<String>,

    /// User-facing explanation of what changed. Present for every invalid line.
    pub message: Option<String>,
}

impl LineAssessment {
    /// Returns true when applying this assessment changes the cart.
    pub fn changes_cart(&self) -> bool {
        self.corrected_quantity != self.requested_quantity
    }

    fn valid(line: &CartLine, title: Option<String>) -> Self {
        LineAssessment {
            product_id: line.product_id.clone(),
            variant_key: line.variant_key.clone(),
            valid: true,
            requested_quantity: line.quantity,
            corrected_quantity: line.quantity,
            issue: None,
            product_title: title,
            message: None,
        }
    }

    fn invalid(line: &CartLine, issue: LineIssue, corrected: u32, title: Option<String>) -> Self {
        let message = describe(line, issue, corrected, title.as_deref());
        LineAssessment {
            product_id: line.product_id.clone(),
            variant_key: line.variant_key.clone(),
            valid: false,
            requested_quantity: line.quantity,
            corrected_quantity: corrected,
            issue: Some(issue),
            product_title: title,
            message: Some(message),
        }
    }
}

// =============================================================================
// Assessment
// =============================================================================

/// Judges one line against one stock reading. See the module table.
///
/// ## Example
/// ```rust
/// use cartwright_core::inventory::{assess_line, LineIssue, StockReading};
/// use cartwright_core::money::Money;
/// use cartwright_core::types::{CartLine, StockFact, VariantKey};
///
/// let line = CartLine::new("P1", VariantKey::size("M"), 2, Money::from_major(500), "BDT");
/// let fact = StockFact {
///     product_id: "P1".into(),
///     variant_key: Some(VariantKey::size("M")),
///     available_quantity: 1,
///     product_title: "Linen Shirt".into(),
/// };
/// let result = assess_line(&line, StockReading::Found(fact));
/// assert!(!result.valid);
/// assert_eq!(result.corrected_quantity, 1);
/// assert_eq!(result.issue, Some(LineIssue::InsufficientStock));
/// ```
pub fn assess_line(line: &CartLine, reading: StockReading) -> LineAssessment {
    let over_cap = line.quantity > MAX_LINE_QUANTITY;

    let fact = match reading {
        StockReading::Found(fact) => fact,
        StockReading::NotFound => {
            return LineAssessment::invalid(line, LineIssue::Unavailable, 0, None);
        }
        StockReading::Failed { .. } if over_cap => {
            return LineAssessment::invalid(line, LineIssue::MaxExceeded, MAX_LINE_QUANTITY, None);
        }
        StockReading::Failed { .. } => {
            return LineAssessment::invalid(line, LineIssue::LookupFailed, line.quantity, None);
        }
    };

    let title = Some(fact.product_title.clone());

    let size_matches = match &fact.variant_key {
        Some(variant) => *variant == line.variant_key,
        None => true,
    };
    if !size_matches || fact.available_quantity == 0 {
        return LineAssessment::invalid(line, LineIssue::Unavailable, 0, title);
    }

    let allowed = fact.available_quantity.min(MAX_LINE_QUANTITY);
    if over_cap {
        return LineAssessment::invalid(line, LineIssue::MaxExceeded, allowed, title);
    }
    if line.quantity > fact.available_quantity {
        return LineAssessment::invalid(
            line,
            LineIssue::InsufficientStock,
            fact.available_quantity,
            title,
        );
    }

    LineAssessment::valid(line, title)
}

fn describe(line: &CartLine, issue: LineIssue, corrected: u32, title: Option<&str>) -> String {
    let name = match (title, line.variant_key.as_size()) {
        (Some(t), Some(size)) => format!("{} (size {})", t, size),
        (Some(t), None) => t.to_string(),
        (None, Some(size)) => format!("Product {} (size {})", line.product_id, size),
        (None, None) => format!("Product {}", line.product_id),
    };

    match issue {
        LineIssue::MaxExceeded => format!(
            "{}: at most {} per order, quantity reduced from {} to {}",
            name, MAX_LINE_QUANTITY, line.quantity, corrected
        ),
        LineIssue::Unavailable => format!(
            "{} is no longer available and was removed from your cart",
            name
        ),
        LineIssue::InsufficientStock => format!(
            "Only {} of {} left in stock, quantity reduced from {} to {}",
            corrected, name, line.quantity, corrected
        ),
        LineIssue::LookupFailed => format!(
            "Could not confirm stock for {}, please try again",
            name
        ),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
