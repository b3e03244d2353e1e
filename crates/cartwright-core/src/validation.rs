//! # Validation Module
//!
//! Field-level checks for what the customer types at checkout.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront form                                              │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Checkout orchestrator                                        │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: before leaving Building / before Submitting          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Order service                                                │
//! │  └── Its own rules; a rejection there is a submission failure          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cartwright_core::validation::{validate_phone, validate_sender_number};
//!
//! assert!(validate_phone("+8801711000000").is_ok());
//! assert!(validate_sender_number("01711000000", 11).is_ok());
//! ```

use crate::error::ValidationError;
use crate::types::{CustomerInfo, PaymentProof};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted coupon code.
pub const MAX_COUPON_CODE_LENGTH: usize = 32;

fn required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Customer Info
// =============================================================================

/// Validates a phone number.
///
/// ## Rules
/// - Optional leading `+`
/// - Spaces and hyphens are ignored
/// - 7 to 15 digits
///
/// ## Example
/// ```rust
/// use cartwright_core::validation::validate_phone;
///
/// assert!(validate_phone("01711-000000").is_ok());
/// assert!(validate_phone("12345").is_err());
/// assert!(validate_phone("017ABC00000").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    required("phone", phone)?;

    let trimmed = phone.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = body.chars().filter(|c| *c != ' ' && *c != '-').collect();

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    if !(7..=15).contains(&digits.len()) {
        return Err(ValidationError::OutOfRange {
            field: "phone digits".to_string(),
            min: 7,
            max: 15,
        });
    }

    Ok(())
}

/// Validates an email address (shape only, no deliverability).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(invalid("must contain exactly one @")),
    };

    if local.is_empty() {
        return Err(invalid("missing name before @"));
    }
    if domain.is_empty() || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("missing domain after @"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    Ok(())
}

/// Validates delivery and contact details.
///
/// Returns the first failing field; the storefront re-submits after fixing it.
pub fn validate_customer_info(customer: &CustomerInfo) -> ValidationResult<()> {
    required("name", &customer.name)?;
    validate_phone(&customer.phone)?;
    if let Some(email) = customer.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    required("address", &customer.address)?;
    required("region", &customer.region)?;
    required("country", &customer.country)?;
    Ok(())
}

// =============================================================================
// Payment Proof
// =============================================================================

/// Validates the wallet number money was sent from.
///
/// ## Rules
/// - Exactly `length` ASCII digits
///
/// ## Example
/// ```rust
/// use cartwright_core::validation::validate_sender_number;
///
/// assert!(validate_sender_number("01711000000", 11).is_ok());
/// assert!(validate_sender_number("0171100000", 11).is_err());
/// ```
pub fn validate_sender_number(sender: &str, length: usize) -> ValidationResult<()> {
    let sender = sender.trim();
    required("sender number", sender)?;

    if !sender.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "sender number".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    if sender.len() != length {
        return Err(ValidationError::WrongLength {
            field: "sender number".to_string(),
            len: length,
        });
    }

    Ok(())
}

/// Validates a payment transaction reference.
///
/// ## Rules
/// - Not empty
/// - ASCII letters and digits only
/// - At most `max_length` characters
pub fn validate_transaction_reference(reference: &str, max_length: usize) -> ValidationResult<()> {
    let reference = reference.trim();
    required("transaction reference", reference)?;

    if reference.len() > max_length {
        return Err(ValidationError::TooLong {
            field: "transaction reference".to_string(),
            max: max_length,
        });
    }

    if !reference.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "transaction reference".to_string(),
            reason: "must contain only letters and numbers".to_string(),
        });
    }

    Ok(())
}

/// Validates both proof fields.
pub fn validate_payment_proof(
    proof: &PaymentProof,
    sender_length: usize,
    reference_max_length: usize,
) -> ValidationResult<()> {
    validate_sender_number(&proof.sender_number, sender_length)?;
    validate_transaction_reference(&proof.transaction_ref, reference_max_length)
}

// =============================================================================
// Cart Inputs
// =============================================================================

/// Validates and normalizes a coupon code typed by the customer.
///
/// ## Returns
/// The trimmed, upper-cased code.
pub fn validate_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();
    required("coupon code", code)?;

    if code.len() > MAX_COUPON_CODE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "coupon code".to_string(),
            max: MAX_COUPON_CODE_LENGTH,
        });
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: "coupon code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code.to_uppercase())
}

// =============================================================================
// Unit Tests
// =============================================================================
