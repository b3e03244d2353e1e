//! # Checkout Configuration
//!
//! Configuration management for the checkout engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CARTWRIGHT_BASE_CURRENCY=BDT                                       │
//! │     CARTWRIGHT_METRO_RATE=60                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/cartwright/checkout.toml (Linux)                         │
//! │     ~/Library/Application Support/com.cartwright.cartwright/... (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     BDT, Dhaka metro 60 / other 120, 11-digit sender numbers           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # checkout.toml
//! [currency]
//! base = "BDT"
//!
//! [currency.rates]
//! USD = "110.5"
//!
//! [shipping]
//! metro_region = "dhaka"
//! metro_rate = 60.0
//! other_rate = 120.0
//! delivery_countries = ["Bangladesh"]
//!
//! [payment]
//! sender_id_length = 11
//! reference_max_length = 32
//!
//! [validation]
//! block_on_lookup_failure = true
//! lookup_timeout_ms = 5000
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cartwright_core::{ConversionRates, MetroClassifier, ShippingRateTable, DEFAULT_BASE_CURRENCY};

use crate::error::{CheckoutError, CheckoutResult};

// =============================================================================
// Currency Settings
// =============================================================================

/// Base currency and conversion rates into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencySettings {
    /// ISO 4217 code every total is expressed in.
    #[serde(default = "default_base_currency")]
    pub base: String,

    /// Units of base currency per one unit of the keyed currency.
    #[serde(default)]
    pub rates: HashMap<String, Decimal>,
}

fn default_base_currency() -> String {
    DEFAULT_BASE_CURRENCY.to_string()
}

impl Default for CurrencySettings {
    fn default() -> Self {
        CurrencySettings {
            base: default_base_currency(),
            rates: HashMap::new(),
        }
    }
}

// =============================================================================
// Shipping Settings
// =============================================================================

/// Metro/other shipping buckets and the countries that get delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingSettings {
    /// Region name that marks a destination as metro (substring, any case).
    #[serde(default = "default_metro_region")]
    pub metro_region: String,

    /// Flat charge inside the metro region, major units.
    #[serde(default = "default_metro_rate")]
    pub metro_rate: f64,

    /// Flat charge everywhere else, major units.
    #[serde(default = "default_other_rate")]
    pub other_rate: f64,

    /// Countries with physical delivery. Compared case-insensitively.
    #[serde(default = "default_delivery_countries")]
    pub delivery_countries: Vec<String>,
}

fn default_metro_region() -> String {
    "dhaka".to_string()
}

fn default_metro_rate() -> f64 {
    60.0
}

fn default_other_rate() -> f64 {
    120.0
}

fn default_delivery_countries() -> Vec<String> {
    vec!["Bangladesh".to_string()]
}

impl Default for ShippingSettings {
    fn default() -> Self {
        ShippingSettings {
            metro_region: default_metro_region(),
            metro_rate: default_metro_rate(),
            other_rate: default_other_rate(),
            delivery_countries: default_delivery_countries(),
        }
    }
}

impl ShippingSettings {
    /// Returns true when orders to `country` are physically delivered.
    pub fn delivers_to(&self, country: &str) -> bool {
        let country = country.trim();
        self.delivery_countries
            .iter()
            .any(|c| c.trim().eq_ignore_ascii_case(country))
    }
}

// =============================================================================
// Payment Settings
// =============================================================================

/// Proof-of-payment field rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettings {
    /// Exact digit count of a wallet sender number.
    #[serde(default = "default_sender_id_length")]
    pub sender_id_length: usize,

    /// Longest accepted transaction reference.
    #[serde(default = "default_reference_max_length")]
    pub reference_max_length: usize,
}

fn default_sender_id_length() -> usize {
    11
}

fn default_reference_max_length() -> usize {
    32
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            sender_id_length: default_sender_id_length(),
            reference_max_length: default_reference_max_length(),
        }
    }
}

// =============================================================================
// Validation Settings
// =============================================================================

/// Stock validation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// Refuse to leave Validating while any line's stock is unconfirmed.
    #[serde(default = "default_true")]
    pub block_on_lookup_failure: bool,

    /// Per-lookup timeout in milliseconds. 0 disables the timeout.
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_lookup_timeout() -> u64 {
    5000
}

impl Default for ValidationSettings {
    fn default() -> Self {
        ValidationSettings {
            block_on_lookup_failure: true,
            lookup_timeout_ms: default_lookup_timeout(),
        }
    }
}

impl ValidationSettings {
    /// Lookup timeout, or `None` when disabled.
    pub fn lookup_timeout(&self) -> Option<Duration> {
        (self.lookup_timeout_ms > 0).then(|| Duration::from_millis(self.lookup_timeout_ms))
    }
}

// =============================================================================
// Main Checkout Configuration
// =============================================================================

/// Complete checkout configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default)]
    pub currency: CurrencySettings,

    #[serde(default)]
    pub shipping: ShippingSettings,

    #[serde(default)]
    pub payment: PaymentSettings,

    #[serde(default)]
    pub validation: ValidationSettings,
}

impl CheckoutConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (checkout.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CheckoutResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading checkout config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load checkout config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> CheckoutResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CheckoutError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CheckoutError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| CheckoutError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Checkout config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CheckoutResult<()> {
        let base = self.currency.base.trim();
        if base.len() != 3 || !base.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CheckoutError::InvalidConfig(format!(
                "base currency must be a 3-letter ISO code, got: '{}'",
                self.currency.base
            )));
        }

        if let Some((code, rate)) = self.currency.rates.iter().find(|(_, r)| **r <= Decimal::ZERO) {
            return Err(CheckoutError::InvalidConfig(format!(
                "conversion rate for {} must be positive, got {}",
                code, rate
            )));
        }

        if self.shipping.metro_region.trim().is_empty() {
            return Err(CheckoutError::InvalidConfig(
                "shipping.metro_region must not be empty".into(),
            ));
        }

        if self.payment.sender_id_length == 0 || self.payment.reference_max_length == 0 {
            return Err(CheckoutError::InvalidConfig(
                "payment field lengths must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(base) = std::env::var("CARTWRIGHT_BASE_CURRENCY") {
            debug!(base = %base, "Overriding base currency from environment");
            self.currency.base = base.trim().to_uppercase();
        }

        if let Ok(region) = std::env::var("CARTWRIGHT_METRO_REGION") {
            self.shipping.metro_region = region;
        }

        if let Ok(rate) = std::env::var("CARTWRIGHT_METRO_RATE") {
            match rate.parse::<f64>() {
                Ok(r) => self.shipping.metro_rate = r,
                Err(_) => warn!(rate = %rate, "Ignoring unparseable CARTWRIGHT_METRO_RATE"),
            }
        }

        if let Ok(rate) = std::env::var("CARTWRIGHT_OTHER_RATE") {
            match rate.parse::<f64>() {
                Ok(r) => self.shipping.other_rate = r,
                Err(_) => warn!(rate = %rate, "Ignoring unparseable CARTWRIGHT_OTHER_RATE"),
            }
        }

        if let Ok(timeout) = std::env::var("CARTWRIGHT_LOOKUP_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse::<u64>() {
                debug!(ms, "Overriding lookup timeout from environment");
                self.validation.lookup_timeout_ms = ms;
            }
        }

        if let Ok(block) = std::env::var("CARTWRIGHT_BLOCK_ON_LOOKUP_FAILURE") {
            match block.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.validation.block_on_lookup_failure = true,
                "0" | "false" | "no" => self.validation.block_on_lookup_failure = false,
                _ => warn!(value = %block, "Unknown CARTWRIGHT_BLOCK_ON_LOOKUP_FAILURE value"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "cartwright", "cartwright")
            .map(|dirs| dirs.config_dir().join("checkout.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Conversion table for the pricing aggregator.
    pub fn conversion_rates(&self) -> ConversionRates {
        self.currency.rates.iter().fold(
            ConversionRates::base_only(self.currency.base.trim().to_uppercase()),
            |rates, (code, rate)| rates.with_rate(code.clone(), *rate),
        )
    }

    /// Shipping rate table; sanitized into money at lookup time.
    pub fn rate_table(&self) -> ShippingRateTable {
        ShippingRateTable {
            metro: self.shipping.metro_rate,
            other: self.shipping.other_rate,
        }
    }

    /// District classifier for the configured metro region.
    pub fn classifier(&self) -> MetroClassifier {
        MetroClassifier::new(self.shipping.metro_region.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartwright_core::{DistrictClassifier, Money, RegionBucket};

    #[test]
    fn test_default_config() {
        let config = CheckoutConfig::default();
        assert_eq!(config.currency.base, "BDT");
        assert_eq!(config.shipping.metro_rate, 60.0);
        assert_eq!(config.payment.sender_id_length, 11);
        assert!(config.validation.block_on_lookup_failure);
        assert_eq!(config.validation.lookup_timeout(), Some(Duration::from_millis(5000)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = CheckoutConfig::default();
        config.currency.base = "TAKA".into();
        assert!(config.validate().unwrap_err().is_config_error());

        let mut config = CheckoutConfig::default();
        config.currency.rates.insert("USD".into(), Decimal::ZERO);
        assert!(config.validate().is_err());

        let mut config = CheckoutConfig::default();
        config.payment.sender_id_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: CheckoutConfig = toml::from_str(
            r#"
            [currency]
            base = "BDT"

            [currency.rates]
            USD = "110"

            [shipping]
            metro_rate = 80.0
            "#,
        )
        .unwrap();
        assert_eq!(config.shipping.metro_rate, 80.0);
        assert_eq!(config.shipping.other_rate, 120.0);
        assert_eq!(config.payment.reference_max_length, 32);

        let rates = config.conversion_rates();
        assert_eq!(rates.rate_for("usd").unwrap(), Decimal::new(110, 0));
        assert_eq!(rates.rate_for("BDT").unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_shipping_helpers() {
        let config = CheckoutConfig::default();
        assert!(config.shipping.delivers_to(" bangladesh "));
        assert!(!config.shipping.delivers_to("Nepal"));
        assert_eq!(config.classifier().classify("Dhaka South"), RegionBucket::Metro);
        assert_eq!(config.rate_table().rate_for(RegionBucket::Other), Money::from_major(120));
    }

    #[test]
    fn test_timeout_can_be_disabled() {
        let settings = ValidationSettings {
            block_on_lookup_failure: false,
            lookup_timeout_ms: 0,
        };
        assert_eq!(settings.lookup_timeout(), None);
    }

    #[test]
    fn test_toml_serialization() {
        let config = CheckoutConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[currency]"));
        assert!(toml_str.contains("[shipping]"));
        assert!(toml_str.contains("[validation]"));
    }
}
