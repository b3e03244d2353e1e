//! # Shipping Calculator
//!
//! Two-bucket, destination-based shipping charge.
//!
//! ```text
//!   country delivers? ──no──► 0
//!         │yes
//!   method ships?     ──no──► 0   (affiliate_redirect)
//!         │yes
//!   region ∋ metro name? ──yes──► rate.metro
//!         │no
//!         └─────────────────────► rate.other
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::money::Money;
use crate::types::PaymentMethod;

/// Which rate applies to a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RegionBucket {
    Metro,
    Other,
}

/// Maps a free-text destination region onto a [`RegionBucket`].
pub trait DistrictClassifier {
    fn classify(&self, region: &str) -> RegionBucket;
}

/// Classifies by case-insensitive substring match on one metro name.
///
/// `"Dhaka North"` and `"dhaka"` are metro for `MetroClassifier::new("Dhaka")`.
#[derive(Debug, Clone)]
pub struct MetroClassifier {
    metro_name: String,
}

impl MetroClassifier {
    pub fn new(metro_name: impl Into<String>) -> Self {
        MetroClassifier {
            metro_name: metro_name.into().trim().to_lowercase(),
        }
    }
}

impl DistrictClassifier for MetroClassifier {
    fn classify(&self, region: &str) -> RegionBucket {
        if !self.metro_name.is_empty() && region.to_lowercase().contains(&self.metro_name) {
            RegionBucket::Metro
        } else {
            RegionBucket::Other
        }
    }
}

/// Flat rates per bucket, in major units of the base currency.
///
/// Kept as floats because they come straight from configuration; they are
/// sanitized into [`Money`] on every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShippingRateTable {
    pub metro: f64,
    pub other: f64,
}

impl ShippingRateTable {
    /// Rate for a bucket. Missing, non-finite or negative rates read as zero.
    pub fn rate_for(&self, bucket: RegionBucket) -> Money {
        match bucket {
            RegionBucket::Metro => Money::from_major_f64(self.metro),
            RegionBucket::Other => Money::from_major_f64(self.other),
        }
    }
}

/// Shipping charge for a destination and payment method.
///
/// ## Example
/// ```rust
/// use cartwright_core::money::Money;
/// use cartwright_core::shipping::{shipping_charge, MetroClassifier, ShippingRateTable};
/// use cartwright_core::types::PaymentMethod;
///
/// let table = ShippingRateTable { metro: 60.0, other: 120.0 };
/// let dhaka = MetroClassifier::new("dhaka");
/// let charge = shipping_charge("Dhaka North", PaymentMethod::CashOnDelivery, true, &dhaka, &table);
/// assert_eq!(charge, Money::from_major(60));
/// ```
pub fn shipping_charge(
    destination_region: &str,
    payment_method: PaymentMethod,
    country_supports_delivery: bool,
    classifier: &impl DistrictClassifier,
    rate_table: &ShippingRateTable,
) -> Money {
    if !country_supports_delivery || !payment_method.requires_delivery() {
        return Money::zero();
    }

    let bucket = classifier.classify(destination_region);
    let charge = rate_table.rate_for(bucket);
    debug!(region = destination_region, ?bucket, charge = %charge, "Shipping charge resolved");
    charge
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: ShippingRateTable = ShippingRateTable {
        metro: 60.0,
        other: 120.0,
    };

    #[test]
    fn test_metro_destination_by_method() {
        let dhaka = MetroClassifier::new("dhaka");
        assert_eq!(
            shipping_charge("Dhaka North", PaymentMethod::CashOnDelivery, true, &dhaka, &TABLE),
            Money::from_major(60)
        );
        assert_eq!(
            shipping_charge("Dhaka North", PaymentMethod::AffiliateRedirect, true, &dhaka, &TABLE),
            Money::zero()
        );
    }

    #[test]
    fn test_other_region_and_prepaid_methods() {
        let dhaka = MetroClassifier::new("Dhaka");
        assert_eq!(
            shipping_charge("Chattogram", PaymentMethod::MobileWallet, true, &dhaka, &TABLE),
            Money::from_major(120)
        );
        assert_eq!(
            shipping_charge("DHAKA", PaymentMethod::PayFirst, true, &dhaka, &TABLE),
            Money::from_major(60)
        );
    }

    #[test]
    fn test_no_delivery_country_is_free() {
        let dhaka = MetroClassifier::new("dhaka");
        assert!(shipping_charge("Dhaka", PaymentMethod::CashOnDelivery, false, &dhaka, &TABLE).is_zero());
    }

    #[test]
    fn test_bad_rates_read_as_zero() {
        let table = ShippingRateTable {
            metro: f64::NAN,
            other: -5.0,
        };
        let dhaka = MetroClassifier::new("dhaka");
        assert!(shipping_charge("Dhaka", PaymentMethod::CashOnDelivery, true, &dhaka, &table).is_zero());
        assert!(shipping_charge("Sylhet", PaymentMethod::CashOnDelivery, true, &dhaka, &table).is_zero());
    }

    #[test]
    fn test_empty_metro_name_never_matches() {
        assert_eq!(MetroClassifier::new("  ").classify("Dhaka"), RegionBucket::Other);
    }
}
