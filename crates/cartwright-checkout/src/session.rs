//! # Checkout Session
//!
//! One checkout attempt, from "proceed to checkout" to an order or a failure.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌──────────┐ submit ┌────────────┐ all lines valid                    │
//! │   │ Building │───────►│ Validating │──────────────┐                     │
//! │   └──────────┘        └─────┬──────┘              │                     │
//! │     ▲   ▲  ▲                │ any correction      ▼                     │
//! │     │   │  └────────────────┘        ┌─────────────────────────┐        │
//! │     │   │      edit                  │ AwaitingPaymentDetails  │        │
//! │     │   └────────────────────────────│ (proof missing/invalid) │        │
//! │     │          edit                  └───────────┬─────────────┘        │
//! │     │                                            ▼                      │
//! │     │   edit   ┌─────────────────────────┐  proof ok                    │
//! │     ├──────────│ AwaitingTermsAcceptance │◄──────┘                      │
//! │     │          └───────────┬─────────────┘                              │
//! │     │                      │ terms accepted (timestamp stamped here)    │
//! │     │                      ▼                                            │
//! │     │  edit  ┌────────┐  ┌────────────┐  ok   ┌───────────┐            │
//! │     └────────│ Failed │◄─│ Submitting │──────►│ Succeeded │            │
//! │              └────────┘  └────────────┘       └───────────┘            │
//! │           (cart + customer kept for retry)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cartwright_core::{
    Cart, CouponRejection, CustomerInfo, LineAssessment, LineIssue, PaymentMethod, PaymentProof,
    VariantKey,
};

use crate::coupon::AppliedCoupon;
use crate::error::LookupError;

// =============================================================================
// Status
// =============================================================================

/// Where a checkout session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    #[default]
    Building,
    Validating,
    AwaitingPaymentDetails,
    AwaitingTermsAcceptance,
    Submitting,
    Succeeded,
    Failed,
}

impl CheckoutStatus {
    /// Returns true when the customer may still change the cart or details.
    pub fn is_editable(&self) -> bool {
        !matches!(self, CheckoutStatus::Submitting | CheckoutStatus::Succeeded)
    }
}

impl fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutStatus::Building => "building",
            CheckoutStatus::Validating => "validating",
            CheckoutStatus::AwaitingPaymentDetails => "awaiting payment details",
            CheckoutStatus::AwaitingTermsAcceptance => "awaiting terms acceptance",
            CheckoutStatus::Submitting => "submitting",
            CheckoutStatus::Succeeded => "succeeded",
            CheckoutStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Failure
// =============================================================================

/// Why order submission failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// The order service could not be reached.
    ServiceUnavailable,
    /// The order service did not answer in time.
    Timeout,
    /// The order service refused the order.
    OrderRejected,
}

impl From<&LookupError> for FailureReason {
    fn from(err: &LookupError) -> Self {
        match err {
            LookupError::Unavailable(_) => FailureReason::ServiceUnavailable,
            LookupError::Timeout { .. } => FailureReason::Timeout,
            LookupError::Rejected(_) => FailureReason::OrderRejected,
        }
    }
}

/// Details of the last failed submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub reason: FailureReason,
    pub message: String,
}

// =============================================================================
// Notices
// =============================================================================

/// A line the engine changed on the customer's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionNotice {
    pub product_id: String,
    pub variant_key: VariantKey,
    pub product_title: Option<String>,
    pub previous_quantity: u32,
    pub corrected_quantity: u32,
    pub issue: LineIssue,
    pub message: String,
}

impl CorrectionNotice {
    /// Notice for an invalid line; `None` for a valid one.
    pub fn from_assessment(assessment: &LineAssessment) -> Option<Self> {
        let issue = assessment.issue?;
        Some(CorrectionNotice {
            product_id: assessment.product_id.clone(),
            variant_key: assessment.variant_key.clone(),
            product_title: assessment.product_title.clone(),
            previous_quantity: assessment.requested_quantity,
            corrected_quantity: assessment.corrected_quantity,
            issue,
            message: assessment.message.clone().unwrap_or_default(),
        })
    }
}

/// A coupon that was rejected or detached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponNotice {
    pub code: String,
    pub reason: CouponRejection,
    pub message: String,
}

impl CouponNotice {
    pub fn new(code: impl Into<String>, reason: CouponRejection) -> Self {
        let code = code.into();
        let message = reason.message(&code);
        CouponNotice {
            code,
            reason,
            message,
        }
    }
}

/// Something the customer must be told about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    Correction(CorrectionNotice),
    Coupon(CouponNotice),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Correction(n) => &n.message,
            Notice::Coupon(n) => &n.message,
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// Transient state of one checkout attempt.
///
/// Only the orchestrator mutates a session; callers read it through the
/// accessors and hand it back on the next call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub(crate) cart: Cart,
    pub(crate) customer: CustomerInfo,
    pub(crate) payment_method: PaymentMethod,
    pub(crate) payment_proof: Option<PaymentProof>,
    pub(crate) applied_coupon: Option<AppliedCoupon>,
    pub(crate) accepted_terms: bool,
    pub(crate) terms_accepted_at: Option<DateTime<Utc>>,
    pub(crate) status: CheckoutStatus,
    /// Notices produced by the most recent operation.
    pub(crate) notices: Vec<Notice>,
    pub(crate) failure: Option<Failure>,
    pub(crate) order_id: Option<Uuid>,
}

impl CheckoutSession {
    pub(crate) fn new(cart: Cart) -> Self {
        CheckoutSession {
            cart,
            ..Default::default()
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_proof(&self) -> Option<&PaymentProof> {
        self.payment_proof.as_ref()
    }

    pub fn applied_coupon(&self) -> Option<&AppliedCoupon> {
        self.applied_coupon.as_ref()
    }

    pub fn accepted_terms(&self) -> bool {
        self.accepted_terms
    }

    pub fn terms_accepted_at(&self) -> Option<DateTime<Utc>> {
        self.terms_accepted_at
    }

    pub fn status(&self) -> CheckoutStatus {
        self.status
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn order_id(&self) -> Option<Uuid> {
        self.order_id
    }
}
