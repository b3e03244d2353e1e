//! # Checkout Error Types
//!
//! Error types for lookups and checkout operations.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Checkout Error Categories                          │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Structural    │  │ Lookup Failure  │  │ Submission Failure      │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  Unavailable    │  │  createOrder failed     │ │
//! │  │  InvalidState   │  │  Timeout        │  │  (session → Failed,     │ │
//! │  │  Config errors  │  │  Rejected       │  │   state kept for retry) │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Stock drift and coupon invalidity are NOT errors: they are corrected  │
//! │  in place and reported as notices on the session.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cartwright_core::{CoreError, ValidationError};

/// Result type alias for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Lookup Error
// =============================================================================

/// Failure reported by an external collaborator (stock, coupon, order service).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The service could not be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete in time.
    #[error("Lookup timed out after {millis} ms")]
    Timeout { millis: u64 },

    /// The service answered with a refusal.
    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl LookupError {
    /// Returns true if the same call may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LookupError::Unavailable(_) | LookupError::Timeout { .. })
    }
}

// =============================================================================
// Error Kind
// =============================================================================

/// The category an error belongs to, which decides how it is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller-fixable input or sequencing problem.
    Structural,
    /// The applied coupon stopped qualifying; dropped automatically.
    CouponInvalidity,
    /// A collaborator lookup failed; caller policy decides whether to block.
    LookupFailure,
    /// Order creation failed; fatal for this attempt.
    SubmissionFailure,
}

// =============================================================================
// Checkout Error
// =============================================================================

/// Checkout error type covering everything that can cross the engine boundary.
///
/// ## Design Principles
/// - Each variant includes enough context for a user-facing message
/// - [`CheckoutError::kind`] maps every variant onto one handling category
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum CheckoutError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid checkout configuration.
    #[error("Invalid checkout configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Flow Errors
    // =========================================================================
    /// An operation was attempted in a status that does not allow it.
    #[error("Cannot {action} while checkout is {status}")]
    InvalidState { status: String, action: String },

    /// Stock could not be confirmed and configuration says to block.
    #[error("Stock could not be confirmed for {lines} line(s)")]
    StockUnconfirmed { lines: usize },

    /// A collaborator lookup failed outside of per-line validation.
    #[error("Lookup failed: {0}")]
    Lookup(#[from] LookupError),

    /// Order creation failed.
    #[error("Order submission failed: {0}")]
    SubmissionFailed(String),

    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// Domain rule violation (includes field validation).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// JSON (de)serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::Core(CoreError::Validation(err))
    }
}

impl From<serde_json::Error> for CheckoutError {
    fn from(err: serde_json::Error) -> Self {
        CheckoutError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CheckoutError {
    fn from(err: std::io::Error) -> Self {
        CheckoutError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for CheckoutError {
    fn from(err: toml::de::Error) -> Self {
        CheckoutError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for CheckoutError {
    fn from(err: toml::ser::Error) -> Self {
        CheckoutError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl CheckoutError {
    /// Maps the error onto its handling category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Lookup(_) | CheckoutError::StockUnconfirmed { .. } => {
                ErrorKind::LookupFailure
            }
            CheckoutError::SubmissionFailed(_) => ErrorKind::SubmissionFailure,
            CheckoutError::Core(CoreError::InvalidCoupon { .. }) => ErrorKind::CouponInvalidity,
            CheckoutError::InvalidConfig(_)
            | CheckoutError::ConfigLoadFailed(_)
            | CheckoutError::ConfigSaveFailed(_)
            | CheckoutError::InvalidState { .. }
            | CheckoutError::Core(_)
            | CheckoutError::Serialization(_) => ErrorKind::Structural,
        }
    }

    /// Returns true if the operation can be retried unchanged.
    ///
    /// ## Retryable Errors
    /// - Unreachable or slow collaborators
    /// - Failed order submission (session state is preserved)
    /// - Stock that could not be confirmed
    pub fn is_retryable(&self) -> bool {
        match self {
            CheckoutError::Lookup(err) => err.is_retryable(),
            CheckoutError::SubmissionFailed(_) | CheckoutError::StockUnconfirmed { .. } => true,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CheckoutError::InvalidConfig(_)
                | CheckoutError::ConfigLoadFailed(_)
                | CheckoutError::ConfigSaveFailed(_)
        )
    }

    /// Field name when the error is a field validation failure.
    pub fn invalid_field(&self) -> Option<&str> {
        match self {
            CheckoutError::Core(CoreError::Validation(err)) => Some(err.field()),
            _ => None,
        }
    }
}
