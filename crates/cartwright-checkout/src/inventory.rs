//! # Inventory Validator
//!
//! Checks every cart line against live stock and returns one corrected cart.
//!
//! ## Validation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cart lines ──► one lookup per line (concurrent, each with timeout)    │
//! │                  │        │        │                                    │
//! │                  ▼        ▼        ▼                                    │
//! │               assess   assess   assess     (cartwright_core::inventory) │
//! │                  │        │        │                                    │
//! │                  └────────┴────────┘                                    │
//! │                           │  join_all: every line, no short-circuit    │
//! │                           ▼                                             │
//! │        CartValidation { all_valid, corrected_cart, results }           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed or timed-out lookup only marks its own line `LOOKUP_FAILED`;
//! whether that blocks checkout is the orchestrator's call.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use cartwright_core::{assess_line, Cart, CartLine, LineAssessment, LineIssue, StockReading};

use crate::collaborators::StockLookup;
use crate::error::LookupError;

// =============================================================================
// Cart Validation Result
// =============================================================================

/// Outcome of validating a whole cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartValidation {
    /// True when no line needed correction and every lookup answered.
    pub all_valid: bool,
    /// The cart with every correction applied.
    pub corrected_cart: Cart,
    /// One result per input line, in cart order.
    pub results: Vec<LineAssessment>,
}

impl CartValidation {
    /// Results whose correction changed the cart.
    pub fn corrections(&self) -> impl Iterator<Item = &LineAssessment> {
        self.results.iter().filter(|r| r.changes_cart())
    }

    /// Returns true when at least one line was corrected.
    pub fn has_corrections(&self) -> bool {
        self.corrections().next().is_some()
    }

    /// Number of lines whose stock could not be confirmed.
    pub fn lookup_failures(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.issue == Some(LineIssue::LookupFailed))
            .count()
    }
}

// =============================================================================
// Inventory Validator
// =============================================================================

/// Validates cart lines against a [`StockLookup`].
#[derive(Clone)]
pub struct InventoryValidator {
    stock: Arc<dyn StockLookup>,
    timeout: Option<Duration>,
}

impl InventoryValidator {
    /// Creates a validator. `timeout` of `None` waits as long as the lookup does.
    pub fn new(stock: Arc<dyn StockLookup>, timeout: Option<Duration>) -> Self {
        InventoryValidator { stock, timeout }
    }

    /// Validates a single line.
    ///
    /// A line over the per-line cap is `MAX_EXCEEDED` whatever the stock says;
    /// the lookup still runs so the correction never exceeds what is available.
    pub async fn validate_line(&self, line: &CartLine) -> LineAssessment {
        let reading = self.read_stock(line).await;

        if let StockReading::Failed { reason } = &reading {
            warn!(
                product_id = %line.product_id,
                variant = %line.variant_key,
                %reason,
                "Stock lookup failed"
            );
        }

        let assessment = assess_line(line, reading);
        if assessment.changes_cart() {
            info!(
                product_id = %line.product_id,
                variant = %line.variant_key,
                requested = assessment.requested_quantity,
                corrected = assessment.corrected_quantity,
                issue = ?assessment.issue,
                "Correcting cart line"
            );
        }
        assessment
    }

    /// Validates every line of the cart concurrently and applies all corrections.
    pub async fn validate_cart(&self, cart: &Cart) -> CartValidation {
        let results = join_all(cart.lines().iter().map(|line| self.validate_line(line))).await;

        let corrected_lines: Vec<CartLine> = cart
            .lines()
            .iter()
            .zip(&results)
            .map(|(line, result)| {
                let mut line = line.clone();
                line.quantity = result.corrected_quantity;
                line
            })
            .collect();

        let all_valid = results.iter().all(|r| r.valid);
        debug!(
            lines = results.len(),
            all_valid,
            "Cart validation complete"
        );

        CartValidation {
            all_valid,
            corrected_cart: Cart::from_lines(corrected_lines),
            results,
        }
    }

    async fn read_stock(&self, line: &CartLine) -> StockReading {
        let lookup = self.stock.stock(&line.product_id, &line.variant_key);

        let answer = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, lookup).await {
                Ok(answer) => answer,
                Err(_) => Err(LookupError::Timeout {
                    millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                }),
            },
            None => lookup.await,
        };

        match answer {
            Ok(Some(fact)) => StockReading::Found(fact),
            Ok(None) => StockReading::NotFound,
            Err(err) => StockReading::Failed {
                reason: err.to_string(),
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
