//! # Checkout Orchestrator
//!
//! Drives a [`CheckoutSession`] through the checkout state machine.
//!
//! Every mutating call returns a [`Quote`]: the corrected cart, the coupon
//! still attached and the recomputed totals. Callers must render that, never
//! their own copy of what they sent.
//!
//! ## Submit Pipeline
//! ```text
//! submit ─► customer info ok? ──no──► Err (stays Building)
//!              │ yes
//!              ▼
//!          Validating ── corrections ──► Building + notices
//!              │         unconfirmed ──► Err(StockUnconfirmed) when blocking
//!              ▼
//!          coupon still valid? ──no──► detached + notice (not blocking)
//!              ▼
//!          proof needed and bad? ──► AwaitingPaymentDetails
//!              ▼
//!          terms accepted? ──no──► AwaitingTermsAcceptance
//!              ▼
//!          Submitting ─► create_order ─► Succeeded | Failed
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use cartwright_core::validation::{
    validate_coupon_code, validate_customer_info, validate_payment_proof,
};
use cartwright_core::{
    price, shipping_charge, Cart, CartLine, ConversionRates, CoreResult, CouponOutcome,
    CustomerInfo, DistrictClassifier, LineKey, MetroClassifier, Money, PaymentMethod,
    PaymentProof, PricingResult, RegionBucket, ShippingRateTable, ValidationError, VariantKey,
};

use crate::collaborators::{
    CartObserver, Clock, CouponLookup, NoOpObserver, OrderGateway, StockLookup, SystemClock,
};
use crate::config::CheckoutConfig;
use crate::coupon::{AppliedCoupon, CouponResolver};
use crate::error::{CheckoutError, CheckoutResult};
use crate::inventory::InventoryValidator;
use crate::order::{order_lines, OrderPayload, SubmitOutcome};
use crate::session::{
    CheckoutSession, CheckoutStatus, CorrectionNotice, CouponNotice, Failure, FailureReason,
    Notice,
};

// =============================================================================
// Quote
// =============================================================================

/// Authoritative state returned by every mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub cart: Cart,
    pub applied_coupon: Option<AppliedCoupon>,
    pub pricing: PricingResult,
    /// `None` when nothing ships (no delivery country or no-delivery method).
    pub shipping_bucket: Option<RegionBucket>,
    pub notices: Vec<Notice>,
}

// =============================================================================
// Checkout
// =============================================================================

/// The checkout engine. Holds collaborators and configuration; all
/// per-customer state lives in the [`CheckoutSession`] passed to each call.
pub struct Checkout {
    /// Checkout configuration.
    config: Arc<CheckoutConfig>,

    /// Stock validation over the stock collaborator.
    inventory: InventoryValidator,

    /// Coupon resolution over the coupon collaborator.
    coupons: CouponResolver,

    /// Order service.
    orders: Arc<dyn OrderGateway>,

    /// Time source for terms and order timestamps.
    clock: Arc<dyn Clock>,

    /// Notified after every cart change.
    observer: Arc<dyn CartObserver>,

    rates: ConversionRates,
    classifier: MetroClassifier,
    rate_table: ShippingRateTable,
}

impl Checkout {
    /// Configuration the engine was built with.
    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Starts a session from a (client-held, untrusted) cart.
    ///
    /// ## Errors
    /// - `MissingConversionRate` when a line's currency cannot be priced
    /// - `InvalidUnitPrice` when a line's price is not positive or too large
    pub fn begin(&self, cart: Cart) -> CheckoutResult<CheckoutSession> {
        self.rates.subtotal(&cart)?;
        debug!(lines = cart.len(), "Checkout session started");
        Ok(CheckoutSession::new(cart))
    }

    /// Prices the session as it stands.
    pub fn quote(&self, session: &CheckoutSession) -> CheckoutResult<Quote> {
        let (shipping, shipping_bucket) = self.shipping_for(session);
        let discount = session
            .applied_coupon
            .as_ref()
            .map(|c| c.discount)
            .unwrap_or_else(Money::zero);
        let pricing = price(&session.cart, discount, shipping, &self.rates)?;

        Ok(Quote {
            cart: session.cart.clone(),
            applied_coupon: session.applied_coupon.clone(),
            pricing,
            shipping_bucket,
            notices: session.notices.clone(),
        })
    }

    // =========================================================================
    // Cart Edits
    // =========================================================================

    /// Adds a line, merging with an existing line of the same product and size.
    pub async fn add_line(&self, session: &mut CheckoutSession, line: CartLine) -> CheckoutResult<Quote> {
        // Rate and price are checked before the line can reach the cart.
        self.rates.unit_price_in_base(&line)?;
        self.edit_cart(session, "add a line", |cart| {
            cart.add_line(line);
            Ok(())
        })
        .await
    }

    /// Sets a line's quantity. Zero removes the line.
    pub async fn set_quantity(
        &self,
        session: &mut CheckoutSession,
        key: &LineKey,
        quantity: u32,
    ) -> CheckoutResult<Quote> {
        self.edit_cart(session, "change a quantity", |cart| cart.set_quantity(key, quantity))
            .await
    }

    pub async fn remove_line(&self, session: &mut CheckoutSession, key: &LineKey) -> CheckoutResult<Quote> {
        self.edit_cart(session, "remove a line", |cart| cart.remove_line(key))
            .await
    }

    /// Swaps a line's size.
    pub async fn change_variant(
        &self,
        session: &mut CheckoutSession,
        key: &LineKey,
        variant_key: VariantKey,
    ) -> CheckoutResult<Quote> {
        self.edit_cart(session, "change a size", |cart| cart.change_variant(key, variant_key))
            .await
    }

    async fn edit_cart<F>(
        &self,
        session: &mut CheckoutSession,
        action: &str,
        edit: F,
    ) -> CheckoutResult<Quote>
    where
        F: FnOnce(&mut Cart) -> CoreResult<()>,
    {
        self.ensure_editable(session, action)?;

        let mut cart = session.cart.clone();
        edit(&mut cart)?;
        self.rates.subtotal(&cart)?;

        self.reset_to_building(session);
        session.cart = cart;
        self.refresh_coupon(session).await?;
        self.observer.on_change(&session.cart);

        debug!(action, lines = session.cart.len(), "Cart edited");
        self.quote(session)
    }

    // =========================================================================
    // Details
    // =========================================================================

    /// Replaces delivery and contact details. Checked at submit, not here.
    pub fn update_customer(&self, session: &mut CheckoutSession, customer: CustomerInfo) -> CheckoutResult<Quote> {
        self.ensure_editable(session, "update customer details")?;
        self.reset_to_building(session);
        session.customer = customer;
        self.quote(session)
    }

    /// Changes the payment method; shipping may change with it.
    pub fn set_payment_method(&self, session: &mut CheckoutSession, method: PaymentMethod) -> CheckoutResult<Quote> {
        self.ensure_editable(session, "change the payment method")?;
        self.reset_to_building(session);
        session.payment_method = method;
        self.quote(session)
    }

    pub fn set_payment_proof(
        &self,
        session: &mut CheckoutSession,
        proof: Option<PaymentProof>,
    ) -> CheckoutResult<Quote> {
        self.ensure_editable(session, "change payment details")?;
        self.reset_to_building(session);
        session.payment_proof = proof;
        self.quote(session)
    }

    /// Sets the terms flag. The acceptance time is stamped at submission.
    pub fn accept_terms(&self, session: &mut CheckoutSession, accepted: bool) -> CheckoutResult<Quote> {
        self.ensure_editable(session, "change terms acceptance")?;
        self.reset_to_building(session);
        session.accepted_terms = accepted;
        session.terms_accepted_at = None;
        self.quote(session)
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// Applies a coupon code, replacing any coupon already attached.
    ///
    /// A rejected code leaves the current coupon in place and adds a notice.
    pub async fn apply_coupon(&self, session: &mut CheckoutSession, code: &str) -> CheckoutResult<Quote> {
        self.ensure_editable(session, "apply a coupon")?;
        let code = validate_coupon_code(code)?;
        self.reset_to_building(session);

        let cart_total = self.rates.subtotal(&session.cart)?;
        match self.coupons.resolve(&code, &session.cart, cart_total).await? {
            CouponOutcome::Applied { coupon, discount } => {
                if let Some(previous) = &session.applied_coupon {
                    debug!(previous = previous.code(), %code, "Replacing applied coupon");
                }
                info!(%code, discount = %discount, "Coupon applied");
                session.applied_coupon = Some(AppliedCoupon { coupon, discount });
            }
            CouponOutcome::Rejected(reason) => {
                info!(%code, ?reason, "Coupon rejected");
                session
                    .notices
                    .push(Notice::Coupon(CouponNotice::new(code, reason)));
            }
        }

        self.quote(session)
    }

    pub fn remove_coupon(&self, session: &mut CheckoutSession) -> CheckoutResult<Quote> {
        self.ensure_editable(session, "remove a coupon")?;
        self.reset_to_building(session);
        session.applied_coupon = None;
        self.quote(session)
    }

    /// Re-evaluates the applied coupon against the current cart.
    async fn refresh_coupon(&self, session: &mut CheckoutSession) -> CheckoutResult<()> {
        let Some(applied) = session.applied_coupon.take() else {
            return Ok(());
        };

        let cart_total = self.rates.subtotal(&session.cart)?;
        match self.coupons.revalidate(&applied, &session.cart, cart_total).await? {
            CouponOutcome::Applied { coupon, discount } => {
                session.applied_coupon = Some(AppliedCoupon { coupon, discount });
            }
            CouponOutcome::Rejected(reason) => {
                info!(code = applied.code(), ?reason, "Coupon detached");
                session
                    .notices
                    .push(Notice::Coupon(CouponNotice::new(applied.code(), reason)));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Submit
    // =========================================================================

    /// Runs the checkout pipeline as far as it can go.
    ///
    /// ## Returns
    /// - `Ok` with `Succeeded` once the order service confirmed the order
    /// - `Ok` with `Building` when lines were corrected (see the notices)
    /// - `Ok` with `AwaitingPaymentDetails` / `AwaitingTermsAcceptance`
    ///
    /// ## Errors
    /// - Empty cart or bad customer details (session stays `Building`)
    /// - `StockUnconfirmed` when lookups failed and policy blocks
    /// - `SubmissionFailed` when the order service failed (session is `Failed`,
    ///   cart and details kept for a retry)
    pub async fn submit(&self, session: &mut CheckoutSession) -> CheckoutResult<SubmitOutcome> {
        self.ensure_editable(session, "submit")?;
        session.notices.clear();

        if session.cart.is_empty() {
            return Err(ValidationError::Required {
                field: "cart".to_string(),
            }
            .into());
        }
        if let Err(err) = validate_customer_info(&session.customer) {
            self.transition(session, CheckoutStatus::Building);
            return Err(err.into());
        }

        // Validating
        self.transition(session, CheckoutStatus::Validating);
        let validation = self.inventory.validate_cart(&session.cart).await;

        if validation.has_corrections() {
            session.notices.extend(
                validation
                    .corrections()
                    .filter_map(CorrectionNotice::from_assessment)
                    .map(Notice::Correction),
            );
            let corrected = session.notices.len();
            session.cart = validation.corrected_cart;
            session.order_id = None;
            self.refresh_coupon(session).await?;
            self.observer.on_change(&session.cart);
            self.transition(session, CheckoutStatus::Building);

            info!(corrected, "Cart corrected during validation");
            return Ok(SubmitOutcome::stopped(
                CheckoutStatus::Building,
                "Some items in your cart changed. Please review them before placing the order.",
            ));
        }

        let unconfirmed = validation.lookup_failures();
        if unconfirmed > 0 {
            if self.config.validation.block_on_lookup_failure {
                self.transition(session, CheckoutStatus::Building);
                return Err(CheckoutError::StockUnconfirmed { lines: unconfirmed });
            }
            warn!(unconfirmed, "Proceeding without confirmed stock");
        }

        self.refresh_coupon(session).await?;

        // Payment details
        if session.payment_method.requires_payment_proof() {
            let message = match &session.payment_proof {
                None => Some("Sender number and transaction reference are required".to_string()),
                Some(proof) => validate_payment_proof(
                    proof,
                    self.config.payment.sender_id_length,
                    self.config.payment.reference_max_length,
                )
                .err()
                .map(|e| e.to_string()),
            };
            if let Some(message) = message {
                self.transition(session, CheckoutStatus::AwaitingPaymentDetails);
                return Ok(SubmitOutcome::stopped(
                    CheckoutStatus::AwaitingPaymentDetails,
                    message,
                ));
            }
        }

        // Terms
        if !session.accepted_terms {
            self.transition(session, CheckoutStatus::AwaitingTermsAcceptance);
            return Ok(SubmitOutcome::stopped(
                CheckoutStatus::AwaitingTermsAcceptance,
                "Please accept the terms and conditions to place the order",
            ));
        }

        self.place_order(session).await
    }

    async fn place_order(&self, session: &mut CheckoutSession) -> CheckoutResult<SubmitOutcome> {
        let now = self.clock.now();
        session.terms_accepted_at = Some(now);
        self.transition(session, CheckoutStatus::Submitting);

        // A retry after a failed submission keeps its order id.
        let order_id = *session.order_id.get_or_insert_with(Uuid::new_v4);
        let payload = match self.build_payload(session, order_id) {
            Ok(payload) => payload,
            Err(err) => {
                self.transition(session, CheckoutStatus::Building);
                return Err(err);
            }
        };

        info!(%order_id, payable = %payload.pricing.payable, "Submitting order");

        if let Err(err) = self.orders.create_order(&payload).await {
            warn!(%order_id, error = %err, "Order submission failed");
            session.failure = Some(Failure {
                reason: FailureReason::from(&err),
                message: err.to_string(),
            });
            self.transition(session, CheckoutStatus::Failed);
            return Err(CheckoutError::SubmissionFailed(err.to_string()));
        }

        let mut warnings = Vec::new();
        if let Some(code) = &payload.coupon_code {
            if let Err(err) = self
                .orders
                .record_coupon_usage(code, session.customer.identity())
                .await
            {
                warn!(%order_id, %code, error = %err, "Coupon usage not recorded");
                warnings.push(format!("Coupon usage for {} was not recorded", code));
            }
        }

        session.failure = None;
        session.applied_coupon = None;
        session.cart.clear();
        self.observer.on_change(&session.cart);
        self.transition(session, CheckoutStatus::Succeeded);
        info!(%order_id, "Order placed");

        Ok(SubmitOutcome {
            status: CheckoutStatus::Succeeded,
            order_id: Some(order_id),
            clear_cart: true,
            message: None,
            warnings,
        })
    }

    fn build_payload(&self, session: &CheckoutSession, order_id: Uuid) -> CheckoutResult<OrderPayload> {
        let quote = self.quote(session)?;
        let terms_accepted_at = session
            .terms_accepted_at
            .ok_or_else(|| CheckoutError::InvalidState {
                status: session.status.to_string(),
                action: "submit without accepted terms".to_string(),
            })?;

        Ok(OrderPayload {
            order_id,
            lines: order_lines(&session.cart, &self.rates)?,
            customer: session.customer.clone(),
            payment_method: session.payment_method,
            payment_proof: session
                .payment_method
                .requires_payment_proof()
                .then(|| session.payment_proof.clone())
                .flatten(),
            coupon_code: quote.applied_coupon.map(|c| c.code().to_string()),
            currency: quote.pricing.currency.clone(),
            pricing: quote.pricing,
            terms_accepted_at,
            created_at: self.clock.now(),
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn shipping_for(&self, session: &CheckoutSession) -> (Money, Option<RegionBucket>) {
        let customer = &session.customer;
        let delivers = self.config.shipping.delivers_to(&customer.country);
        let charge = shipping_charge(
            &customer.region,
            session.payment_method,
            delivers,
            &self.classifier,
            &self.rate_table,
        );
        let bucket = (delivers && session.payment_method.requires_delivery())
            .then(|| self.classifier.classify(&customer.region));
        (charge, bucket)
    }

    fn ensure_editable(&self, session: &CheckoutSession, action: &str) -> CheckoutResult<()> {
        if session.status.is_editable() {
            Ok(())
        } else {
            Err(CheckoutError::InvalidState {
                status: session.status.to_string(),
                action: action.to_string(),
            })
        }
    }

    /// Any edit sends the session back to `Building` and forgets the
    /// previous attempt's order id and failure.
    fn reset_to_building(&self, session: &mut CheckoutSession) {
        session.notices.clear();
        session.order_id = None;
        session.failure = None;
        self.transition(session, CheckoutStatus::Building);
    }

    fn transition(&self, session: &mut CheckoutSession, to: CheckoutStatus) {
        if session.status != to {
            debug!(from = %session.status, to = %to, "Checkout status changed");
            session.status = to;
        }
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for creating a [`Checkout`] with its collaborators.
pub struct CheckoutBuilder {
    config: CheckoutConfig,
    stock: Option<Arc<dyn StockLookup>>,
    coupons: Option<Arc<dyn CouponLookup>>,
    orders: Option<Arc<dyn OrderGateway>>,
    clock: Option<Arc<dyn Clock>>,
    observer: Option<Arc<dyn CartObserver>>,
}

impl CheckoutBuilder {
    /// Creates a new builder with the given config.
    pub fn new(config: CheckoutConfig) -> Self {
        CheckoutBuilder {
            config,
            stock: None,
            coupons: None,
            orders: None,
            clock: None,
            observer: None,
        }
    }

    /// Sets the stock collaborator.
    pub fn with_stock(mut self, stock: Arc<dyn StockLookup>) -> Self {
        self.stock = Some(stock);
        self
    }

    /// Sets the coupon collaborator.
    pub fn with_coupons(mut self, coupons: Arc<dyn CouponLookup>) -> Self {
        self.coupons = Some(coupons);
        self
    }

    /// Sets the order service.
    pub fn with_orders(mut self, orders: Arc<dyn OrderGateway>) -> Self {
        self.orders = Some(orders);
        self
    }

    /// Sets the clock. Defaults to the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the cart observer. Defaults to no-op.
    pub fn with_observer(mut self, observer: Arc<dyn CartObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Builds the Checkout.
    pub fn build(self) -> CheckoutResult<Checkout> {
        self.config.validate()?;

        let stock = self
            .stock
            .ok_or_else(|| CheckoutError::InvalidConfig("Stock lookup required".into()))?;
        let coupons = self
            .coupons
            .ok_or_else(|| CheckoutError::InvalidConfig("Coupon lookup required".into()))?;
        let orders = self
            .orders
            .ok_or_else(|| CheckoutError::InvalidConfig("Order gateway required".into()))?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let observer = self.observer.unwrap_or_else(|| Arc::new(NoOpObserver));

        let rates = self.config.conversion_rates();
        let inventory = InventoryValidator::new(stock, self.config.validation.lookup_timeout());
        let coupons = CouponResolver::new(coupons, Arc::clone(&clock), rates.clone());

        Ok(Checkout {
            classifier: self.config.classifier(),
            rate_table: self.config.rate_table(),
            config: Arc::new(self.config),
            inventory,
            coupons,
            orders,
            clock,
            observer,
            rates,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, LookupError};
    use crate::memory::{FixedClock, InMemoryCoupons, InMemoryStock, RecordingOrderGateway};
    use cartwright_core::{CoreError, Coupon, CouponRejection, LineIssue};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn coupons() -> InMemoryCoupons {
        InMemoryCoupons::from_coupons(vec![
            Coupon::Product {
                code: "SHIRT10".into(),
                product_id: "P1".into(),
                discount_percentage: Decimal::new(10, 0),
                expires_at: now() + Duration::days(7),
            },
            Coupon::Global {
                code: "FLAT200".into(),
                discount_amount: Money::from_major(200),
                min_cart_total: Money::from_major(1000),
                expires_at: now() + Duration::days(7),
            },
        ])
        .unwrap()
    }

    fn stock() -> InMemoryStock {
        InMemoryStock::new()
            .with_stock("P1", "M", 5, "Linen Shirt")
            .with_stock("P2", "none", 5, "Tote Bag")
    }

    struct Harness {
        checkout: Checkout,
        orders: Arc<RecordingOrderGateway>,
        coupons: Arc<InMemoryCoupons>,
        changes: Arc<CountingObserver>,
    }

    #[derive(Default)]
    struct CountingObserver(AtomicUsize);

    impl CartObserver for CountingObserver {
        fn on_change(&self, _cart: &Cart) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn harness(stock: InMemoryStock) -> Harness {
        let orders = Arc::new(RecordingOrderGateway::new());
        let coupons = Arc::new(coupons());
        let changes = Arc::new(CountingObserver::default());
        let checkout = CheckoutBuilder::new(CheckoutConfig::default())
            .with_stock(Arc::new(stock))
            .with_coupons(coupons.clone())
            .with_orders(orders.clone())
            .with_clock(Arc::new(FixedClock::at(now())))
            .with_observer(changes.clone())
            .build()
            .unwrap();
        Harness {
            checkout,
            orders,
            coupons,
            changes,
        }
    }

    fn shirt(qty: u32) -> CartLine {
        CartLine::new("P1", VariantKey::size("M"), qty, Money::from_major(1000), "BDT")
    }

    fn bag(qty: u32) -> CartLine {
        CartLine::new("P2", VariantKey::None, qty, Money::from_major(500), "BDT")
    }

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Rahim Uddin".into(),
            phone: "+8801712345678".into(),
            email: Some("rahim@example.com".into()),
            address: "House 12, Road 5".into(),
            region: "Dhaka North".into(),
            country: "Bangladesh".into(),
        }
    }

    fn ready_session(h: &Harness, lines: Vec<CartLine>) -> CheckoutSession {
        let mut session = h.checkout.begin(Cart::from_lines(lines)).unwrap();
        h.checkout.update_customer(&mut session, customer()).unwrap();
        session
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let err = CheckoutBuilder::new(CheckoutConfig::default())
            .build()
            .err()
            .unwrap();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn test_quote_includes_metro_shipping() {
        let h = harness(stock());
        let session = ready_session(&h, vec![shirt(1)]);
        let quote = h.checkout.quote(&session).unwrap();
        assert_eq!(quote.shipping_bucket, Some(RegionBucket::Metro));
        assert_eq!(quote.pricing.payable, Money::from_major(1060));
    }

    #[tokio::test]
    async fn test_affiliate_redirect_ships_free() {
        let h = harness(stock());
        let mut session = ready_session(&h, vec![shirt(1)]);
        let quote = h
            .checkout
            .set_payment_method(&mut session, PaymentMethod::AffiliateRedirect)
            .unwrap();
        assert_eq!(quote.shipping_bucket, None);
        assert_eq!(quote.pricing.shipping_charge, Money::zero());
    }

    #[tokio::test]
    async fn test_applying_second_coupon_replaces_first() {
        let h = harness(stock());
        let mut session = ready_session(&h, vec![shirt(2)]);

        let quote = h.checkout.apply_coupon(&mut session, "shirt10").await.unwrap();
        assert_eq!(quote.pricing.discount, Money::from_major(100));

        let quote = h.checkout.apply_coupon(&mut session, "FLAT200").await.unwrap();
        assert_eq!(quote.applied_coupon.unwrap().code(), "FLAT200");
        assert_eq!(quote.pricing.discount, Money::from_major(200));
    }

    #[tokio::test]
    async fn test_rejected_code_keeps_current_coupon() {
        let h = harness(stock());
        let mut session = ready_session(&h, vec![shirt(1)]);
        h.checkout.apply_coupon(&mut session, "SHIRT10").await.unwrap();

        let quote = h.checkout.apply_coupon(&mut session, "NOPE").await.unwrap();
        assert_eq!(quote.applied_coupon.unwrap().code(), "SHIRT10");
        assert!(matches!(
            &quote.notices[..],
            [Notice::Coupon(n)] if n.reason == CouponRejection::NotFound
        ));
    }

    #[tokio::test]
    async fn test_cart_change_detaches_coupon_below_minimum() {
        let h = harness(stock());
        let mut session = ready_session(&h, vec![shirt(1), bag(1)]);
        h.checkout.apply_coupon(&mut session, "FLAT200").await.unwrap();

        let quote = h
            .checkout
            .remove_line(&mut session, &LineKey::new("P1", VariantKey::size("M")))
            .await
            .unwrap();

        assert!(quote.applied_coupon.is_none());
        assert_eq!(quote.pricing.discount, Money::zero());
        assert!(matches!(
            &quote.notices[..],
            [Notice::Coupon(n)] if n.reason == CouponRejection::BelowMinimum
        ));
        assert_eq!(h.changes.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_coupon_service_outage_detaches_on_change() {
        let h = harness(stock());
        let mut session = ready_session(&h, vec![shirt(1)]);
        h.checkout.apply_coupon(&mut session, "SHIRT10").await.unwrap();

        h.coupons.set_failing(true);
        let quote = h.checkout.add_line(&mut session, bag(1)).await.unwrap();
        assert!(quote.applied_coupon.is_none());
    }

    #[tokio::test]
    async fn test_add_line_with_unknown_currency_is_rejected() {
        let h = harness(stock());
        let mut session = ready_session(&h, vec![shirt(1)]);
        let line = CartLine::new("P9", VariantKey::None, 1, Money::from_major(5), "EUR");

        let err = h.checkout.add_line(&mut session, line).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Core(CoreError::MissingConversionRate { .. })
        ));
        assert_eq!(session.cart().len(), 1);
        assert_eq!(h.changes.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tampered_unit_price_is_rejected() {
        let h = harness(stock());
        let negative = CartLine::new("P2", VariantKey::None, 1, Money::from_major(-900), "BDT");

        let err = h
            .checkout
            .begin(Cart::from_lines(vec![shirt(1), negative.clone()]))
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Core(CoreError::InvalidUnitPrice { .. })));
        assert_eq!(err.kind(), ErrorKind::Structural);

        let mut session = ready_session(&h, vec![shirt(1)]);
        let err = h.checkout.add_line(&mut session, negative).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Core(CoreError::InvalidUnitPrice { .. })));

        let huge = CartLine::new("P3", VariantKey::None, 3, Money::from_minor(i64::MAX), "BDT");
        assert!(h.checkout.add_line(&mut session, huge).await.is_err());

        assert_eq!(session.cart().len(), 1);
        assert_eq!(h.changes.0.load(Ordering::SeqCst), 0);
        let quote = h.checkout.quote(&session).unwrap();
        assert_eq!(quote.pricing.payable, Money::from_major(1060));
    }

    struct ExactCaseCoupons(Coupon);

    #[async_trait::async_trait]
    impl CouponLookup for ExactCaseCoupons {
        async fn coupon(&self, code: &str) -> Result<Option<Coupon>, LookupError> {
            Ok((code == self.0.code()).then(|| self.0.clone()))
        }
    }

    #[tokio::test]
    async fn test_coupon_service_sees_upper_cased_code() {
        let lookup = ExactCaseCoupons(Coupon::Product {
            code: "SHIRT10".into(),
            product_id: "P1".into(),
            discount_percentage: Decimal::new(10, 0),
            expires_at: now() + Duration::days(7),
        });
        let checkout = CheckoutBuilder::new(CheckoutConfig::default())
            .with_stock(Arc::new(stock()))
            .with_coupons(Arc::new(lookup))
            .with_orders(Arc::new(RecordingOrderGateway::new()))
            .with_clock(Arc::new(FixedClock::at(now())))
            .build()
            .unwrap();

        let mut session = checkout.begin(Cart::from_lines(vec![shirt(1)])).unwrap();
        let quote = checkout.apply_coupon(&mut session, "  shirt10 ").await.unwrap();
        assert_eq!(quote.applied_coupon.unwrap().code(), "SHIRT10");

        // re-validation after an edit goes through the same lookup
        let quote = checkout.add_line(&mut session, bag(1)).await.unwrap();
        assert!(quote.applied_coupon.is_some());
        assert_eq!(quote.pricing.discount, Money::from_major(100));
    }

    #[tokio::test]
    async fn test_submit_without_terms_never_creates_order() {
        let h = harness(stock());
        let mut session = ready_session(&h, vec![shirt(1)]);

        let outcome = h.checkout.submit(&mut session).await.unwrap();

        assert_eq!(outcome.status, CheckoutStatus::AwaitingTermsAcceptance);
        assert_eq!(session.status(), CheckoutStatus::AwaitingTermsAcceptance);
        assert!(session.terms_accepted_at().is_none());
        assert!(h.orders.orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_correction_returns_to_building() {
        let h = harness(InMemoryStock::new().with_stock("P1", "M", 1, "Linen Shirt"));
        let mut session = ready_session(&h, vec![shirt(2)]);
        h.checkout.accept_terms(&mut session, true).unwrap();

        let outcome = h.checkout.submit(&mut session).await.unwrap();

        assert_eq!(outcome.status, CheckoutStatus::Building);
        assert_eq!(session.cart().lines()[0].quantity, 1);
        match &session.notices()[0] {
            Notice::Correction(n) => {
                assert_eq!(n.issue, LineIssue::InsufficientStock);
                assert_eq!(n.previous_quantity, 2);
                assert_eq!(n.corrected_quantity, 1);
            }
            other => panic!("unexpected notice {:?}", other),
        }
        assert!(h.orders.orders().await.is_empty());

        // Second attempt against the same stock goes through.
        let outcome = h.checkout.submit(&mut session).await.unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_wallet_payment_waits_for_proof() {
        let h = harness(stock());
        let mut session = ready_session(&h, vec![shirt(1)]);
        h.checkout
            .set_payment_method(&mut session, PaymentMethod::MobileWallet)
            .unwrap();
        h.checkout.accept_terms(&mut session, true).unwrap();

        let outcome = h.checkout.submit(&mut session).await.unwrap();
        assert_eq!(outcome.status, CheckoutStatus::AwaitingPaymentDetails);

        h.checkout
            .set_payment_proof(
                &mut session,
                Some(PaymentProof {
                    sender_number: "01712345678".into(),
                    transaction_ref: "8N7A6XK2".into(),
                }),
            )
            .unwrap();
        let outcome = h.checkout.submit(&mut session).await.unwrap();
        assert!(outcome.is_success());

        let orders = h.orders.orders().await;
        assert_eq!(orders[0].payment_proof.as_ref().unwrap().transaction_ref, "8N7A6XK2");
    }

    #[tokio::test]
    async fn test_invalid_customer_keeps_building() {
        let h = harness(stock());
        let mut session = h.checkout.begin(Cart::from_lines(vec![shirt(1)])).unwrap();

        let err = h.checkout.submit(&mut session).await.unwrap_err();
        assert_eq!(err.invalid_field(), Some("name"));
        assert_eq!(session.status(), CheckoutStatus::Building);
    }

    #[tokio::test]
    async fn test_unconfirmed_stock_blocks_by_default() {
        let h = harness(stock().failing_for("P2"));
        let mut session = ready_session(&h, vec![shirt(1), bag(1)]);
        h.checkout.accept_terms(&mut session, true).unwrap();

        let err = h.checkout.submit(&mut session).await.unwrap_err();
        assert!(matches!(err, CheckoutError::StockUnconfirmed { lines: 1 }));
        assert_eq!(session.status(), CheckoutStatus::Building);
    }

    #[tokio::test]
    async fn test_failed_submission_keeps_state_and_order_id() {
        let h = harness(stock());
        let mut session = ready_session(&h, vec![shirt(1)]);
        h.checkout.apply_coupon(&mut session, "SHIRT10").await.unwrap();
        h.checkout.accept_terms(&mut session, true).unwrap();
        h.orders.set_fail_orders(true);

        let err = h.checkout.submit(&mut session).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(session.status(), CheckoutStatus::Failed);
        assert_eq!(
            session.failure().unwrap().reason,
            FailureReason::ServiceUnavailable
        );
        assert_eq!(session.cart().len(), 1);
        assert_eq!(session.customer(), &customer());
        assert_eq!(session.applied_coupon().unwrap().code(), "SHIRT10");
        let first_id = session.order_id().unwrap();

        h.orders.set_fail_orders(false);
        let outcome = h.checkout.submit(&mut session).await.unwrap();
        assert_eq!(outcome.order_id, Some(first_id));
    }

    #[tokio::test]
    async fn test_successful_order_records_coupon_usage() {
        let h = harness(stock());
        let mut session = ready_session(&h, vec![shirt(2)]);
        h.checkout.apply_coupon(&mut session, "SHIRT10").await.unwrap();
        h.checkout.accept_terms(&mut session, true).unwrap();

        let outcome = h.checkout.submit(&mut session).await.unwrap();

        assert!(outcome.clear_cart);
        assert!(outcome.warnings.is_empty());
        assert_eq!(session.terms_accepted_at(), Some(now()));

        let orders = h.orders.orders().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id, outcome.order_id.unwrap());
        assert_eq!(orders[0].coupon_code.as_deref(), Some("SHIRT10"));
        assert_eq!(orders[0].pricing.payable, Money::from_major(1960));
        assert_eq!(
            h.orders.coupon_usages().await,
            vec![("SHIRT10".to_string(), "rahim@example.com".to_string())]
        );
        assert!(h.checkout.add_line(&mut session, bag(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_usage_failure_is_only_a_warning() {
        let h = harness(stock());
        let mut session = ready_session(&h, vec![shirt(1)]);
        h.checkout.apply_coupon(&mut session, "SHIRT10").await.unwrap();
        h.checkout.accept_terms(&mut session, true).unwrap();
        h.orders.set_fail_usage(true);

        let outcome = h.checkout.submit(&mut session).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.warnings.len(), 1);
    }
}
