//! # checkout-sim
//!
//! Plays one customer's checkout from a JSON scenario file.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  scenario.json ──► in-memory stock / coupons / order gateway            │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  begin(cart) ─► customer ─► payment ─► coupon ─► terms ─► submit       │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  stdout: { status, quote, notices, outcome, order, error }              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Logs go to stderr so stdout stays machine-readable.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cartwright_checkout::memory::{InMemoryCoupons, InMemoryStock, RecordingOrderGateway};
use cartwright_checkout::{
    CheckoutBuilder, CheckoutConfig, CheckoutStatus, Notice, OrderPayload, Quote, SubmitOutcome,
};
use cartwright_core::{Cart, Coupon, CustomerInfo, PaymentMethod, PaymentProof, StockFact};

const USAGE: &str = "usage: checkout-sim <scenario.json> [--config <checkout.toml>]";

/// One scripted checkout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    cart: Cart,
    customer: CustomerInfo,
    #[serde(default)]
    payment_method: PaymentMethod,
    #[serde(default)]
    payment_proof: Option<PaymentProof>,
    #[serde(default)]
    coupon_code: Option<String>,
    #[serde(default)]
    accept_terms: bool,
    #[serde(default)]
    stock: Vec<StockFact>,
    #[serde(default)]
    coupons: Vec<Coupon>,
    /// Makes the order service refuse every order.
    #[serde(default)]
    fail_order: bool,
}

/// What the run prints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    status: CheckoutStatus,
    /// Session state after the run (empty cart once an order is placed).
    quote: Quote,
    notices: Vec<Notice>,
    outcome: Option<SubmitOutcome>,
    /// The payload the order service accepted, if any.
    order: Option<OrderPayload>,
    error: Option<String>,
}

struct Args {
    scenario: PathBuf,
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}\n{}", message, USAGE);
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(report) => {
            let code = match report.status {
                CheckoutStatus::Succeeded => 0,
                CheckoutStatus::Failed => 1,
                _ => 2,
            };
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => error!(error = %e, "Failed to serialize report"),
            }
            ExitCode::from(code)
        }
        Err(e) => {
            error!(error = %e, "Scenario could not be run");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<Report, Box<dyn std::error::Error>> {
    let config = CheckoutConfig::load(args.config)?;
    let scenario: Scenario = serde_json::from_str(&std::fs::read_to_string(&args.scenario)?)?;
    info!(path = ?args.scenario, lines = scenario.cart.len(), "Scenario loaded");

    let orders = Arc::new(RecordingOrderGateway::new());
    orders.set_fail_orders(scenario.fail_order);

    let checkout = CheckoutBuilder::new(config)
        .with_stock(Arc::new(InMemoryStock::from_facts(scenario.stock)))
        .with_coupons(Arc::new(InMemoryCoupons::from_coupons(scenario.coupons)?))
        .with_orders(orders.clone())
        .build()?;

    let mut session = checkout.begin(scenario.cart)?;
    checkout.update_customer(&mut session, scenario.customer)?;
    checkout.set_payment_method(&mut session, scenario.payment_method)?;
    checkout.set_payment_proof(&mut session, scenario.payment_proof)?;

    // Coupon notices are reset by the next edit, so keep them for the report.
    let mut notices = Vec::new();
    if let Some(code) = &scenario.coupon_code {
        let quote = checkout.apply_coupon(&mut session, code).await?;
        notices.extend(quote.notices);
    }
    checkout.accept_terms(&mut session, scenario.accept_terms)?;

    let (outcome, error) = match checkout.submit(&mut session).await {
        Ok(outcome) => (Some(outcome), None),
        Err(e) => (None, Some(e.to_string())),
    };
    notices.extend(session.notices().iter().cloned());

    info!(status = %session.status(), "Scenario finished");

    Ok(Report {
        status: session.status(),
        quote: checkout.quote(&session)?,
        notices,
        outcome,
        order: orders.orders().await.pop(),
        error,
    })
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut scenario = None;
    let mut config = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => return Err("checkout-sim: run one checkout scenario".into()),
            other if scenario.is_none() => scenario = Some(PathBuf::from(other)),
            other => return Err(format!("unexpected argument: {}", other)),
        }
    }

    Ok(Args {
        scenario: scenario.ok_or("missing scenario file")?,
        config,
    })
}

/// Initializes the tracing subscriber on stderr.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=cartwright_checkout=trace` - Trace the engine only
/// - Default: INFO, DEBUG for cartwright crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cartwright=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["s.json", "--config", "c.toml"]).unwrap();
        assert_eq!(parsed.scenario, PathBuf::from("s.json"));
        assert_eq!(parsed.config, Some(PathBuf::from("c.toml")));

        assert!(args(&[]).is_err());
        assert!(args(&["s.json", "--config"]).is_err());
        assert!(args(&["a.json", "b.json"]).is_err());
    }

    #[test]
    fn test_sample_scenario_parses() {
        let json = include_str!("../scenarios/sample.json");
        let scenario: Scenario = serde_json::from_str(json).unwrap();
        assert_eq!(scenario.cart.len(), 2);
        assert_eq!(scenario.coupons.len(), 2);
        assert!(scenario.accept_terms);
    }
}
