//! # Error Types
//!
//! Domain-specific error types for cartwright-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cartwright-core errors (this file)                                    │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cartwright-checkout errors (separate crate)                           │
//! │  ├── LookupError      - Collaborator transport failures                │
//! │  └── CheckoutError    - What the storefront layer sees                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → JSON              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What is NOT an error here
//! Stock drift and coupon ineligibility are outcomes, not errors. They come
//! back as `LineAssessment` / `CouponOutcome` values with a corrected state.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A mutation referenced a line that is not in the cart.
    #[error("Cart line not found: {product_id}/{variant_key}")]
    LineNotFound {
        product_id: String,
        variant_key: String,
    },

    /// A line is priced in a currency with no configured conversion rate.
    ///
    /// ## When This Occurs
    /// - Storefront added a currency before operations configured its rate
    /// - A stale client cart carries a retired currency
    #[error("No conversion rate from {currency} to base currency {base}")]
    MissingConversionRate { currency: String, base: String },

    /// A line carries a unit price that is zero, negative or absurdly large.
    ///
    /// Carts come from the client, so a tampered price must not cancel out
    /// other lines or overflow the totals.
    #[error("Unit price {unit_price} of {product_id}/{variant_key} is not between 0.01 and {max}")]
    InvalidUnitPrice {
        product_id: String,
        variant_key: String,
        unit_price: Money,
        max: Money,
    },

    /// A coupon definition is malformed (e.g. percentage above 100).
    #[error("Coupon {code} is invalid: {reason}")]
    InvalidCoupon { code: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements and are
/// always fixable by the caller before retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Field value must have an exact length.
    #[error("{field} must be exactly {len} characters")]
    WrongLength { field: String, len: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::WrongLength { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::MissingConversionRate {
            currency: "USD".to_string(),
            base: "BDT".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No conversion rate from USD to base currency BDT"
        );

        let err = CoreError::LineNotFound {
            product_id: "P1".to_string(),
            variant_key: "M".to_string(),
        };
        assert_eq!(err.to_string(), "Cart line not found: P1/M");

        let err = CoreError::InvalidUnitPrice {
            product_id: "P2".to_string(),
            variant_key: "none".to_string(),
            unit_price: Money::from_minor(-90_000),
            max: Money::from_major(10),
        };
        assert_eq!(
            err.to_string(),
            "Unit price -900.00 of P2/none is not between 0.01 and 10.00"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "phone".to_string(),
        };
        assert_eq!(err.to_string(), "phone is required");
        assert_eq!(err.field(), "phone");

        let err = ValidationError::WrongLength {
            field: "sender number".to_string(),
            len: 11,
        };
        assert_eq!(err.to_string(), "sender number must be exactly 11 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
