//! # Pricing Configuration
//!
//! Settings for the built-in modifiers, loaded from `config/pricing.toml`
//! (or the file named by `PRICING_CONFIG`).
//!
//! The config only parameterizes modifiers. Which modifiers are installed and
//! in which order is decided by the application assembling the pipeline.

use pricing_core::{Currency, Money, PricingError, PricingResult, Rate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Env var naming an explicit config file
pub const CONFIG_PATH_VAR: &str = "PRICING_CONFIG";

const CONFIG_PATHS: [&str; 3] = [
    "config/pricing.toml",
    "../config/pricing.toml",
    "../../config/pricing.toml",
];

/// Top-level pricing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Currency fees and thresholds are expressed in
    pub currency: Currency,

    pub tax: Option<TaxConfig>,

    pub shipping: ShippingConfig,

    pub payment: PaymentConfig,
}

/// Tax settings shared by the included and excluded tax modifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxConfig {
    /// Default rate in percent (e.g., 19.0)
    pub rate_percent: f64,

    /// Row label
    #[serde(default = "default_tax_label")]
    pub label: String,

    /// Prices already contain tax
    #[serde(default)]
    pub included: bool,

    /// Per-country overrides, keyed by lower-case country code
    #[serde(default)]
    pub regional: HashMap<String, f64>,
}

fn default_tax_label() -> String {
    "Tax".to_string()
}

impl TaxConfig {
    pub fn rate(&self) -> PricingResult<Rate> {
        Rate::from_percent(self.rate_percent)
    }

    pub fn regional_rates(&self) -> PricingResult<HashMap<String, Rate>> {
        self.regional
            .iter()
            .map(|(country, percent)| Ok((country.to_lowercase(), Rate::from_percent(*percent)?)))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingConfig {
    pub flat_rate: Option<FlatRateConfig>,
    pub self_collection: Option<SelfCollectionConfig>,
}

/// Fixed-fee shipping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatRateConfig {
    /// Identifier override (defaults to the type name)
    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default = "default_flat_rate_label")]
    pub label: String,

    /// Fee in decimal currency units
    pub fee: f64,

    /// Subtotal from which shipping is free
    #[serde(default)]
    pub free_above: Option<f64>,

    /// Deliverable countries; empty means everywhere
    #[serde(default)]
    pub countries: Vec<String>,
}

fn default_flat_rate_label() -> String {
    "Standard shipping".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfCollectionConfig {
    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default = "default_self_collection_label")]
    pub label: String,
}

fn default_self_collection_label() -> String {
    "Self-collection".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub surcharge: Option<SurchargeConfig>,
    pub pay_in_advance: Option<PayInAdvanceConfig>,
}

/// Percentage surcharge payment method (e.g., credit card)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurchargeConfig {
    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default = "default_surcharge_label")]
    pub label: String,

    pub rate_percent: f64,

    /// Subtotal below which the method is disabled
    #[serde(default)]
    pub minimum_order: Option<f64>,
}

fn default_surcharge_label() -> String {
    "Card payment".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayInAdvanceConfig {
    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default = "default_pay_in_advance_label")]
    pub label: String,
}

fn default_pay_in_advance_label() -> String {
    "Pay in advance".to_string()
}

fn check_amount(name: &str, amount: f64) -> PricingResult<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(PricingError::Configuration(format!(
            "{name} must be a non-negative amount, got {amount}"
        )));
    }
    Ok(())
}

impl PricingConfig {
    /// Parse and validate configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> PricingResult<Self> {
        let config: PricingConfig =
            toml::from_str(toml_str).map_err(|e| PricingError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a file
    pub fn from_path(path: impl AsRef<Path>) -> PricingResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PricingError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), "Loaded pricing config");
        Ok(config)
    }

    /// Load configuration from `PRICING_CONFIG` or the default locations.
    ///
    /// An explicitly named file must exist. Without one, the first default
    /// location found is used, else built-in defaults.
    pub fn load() -> PricingResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        if let Ok(path) = env::var(CONFIG_PATH_VAR) {
            return Self::from_path(path);
        }

        for path in CONFIG_PATHS {
            if Path::new(path).exists() {
                return Self::from_path(path);
            }
        }

        tracing::warn!("No pricing config found, using defaults");
        Ok(Self::default())
    }

    /// Reject values no modifier could work with
    pub fn validate(&self) -> PricingResult<()> {
        if let Some(tax) = &self.tax {
            tax.rate()?;
            tax.regional_rates()?;
        }
        if let Some(flat_rate) = &self.shipping.flat_rate {
            check_amount("shipping.flat_rate.fee", flat_rate.fee)?;
            if let Some(free_above) = flat_rate.free_above {
                check_amount("shipping.flat_rate.free_above", free_above)?;
            }
        }
        if let Some(surcharge) = &self.payment.surcharge {
            Rate::from_percent(surcharge.rate_percent)?;
            if let Some(minimum) = surcharge.minimum_order {
                check_amount("payment.surcharge.minimum_order", minimum)?;
            }
        }
        Ok(())
    }

    /// Convert a configured decimal amount into the configured currency
    pub fn money(&self, amount: f64) -> Money {
        Money::new(amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        currency = "eur"

        [tax]
        rate_percent = 19.0
        label = "VAT"
        [tax.regional]
        AT = 20.0

        [shipping.flat_rate]
        identifier = "standard"
        fee = 4.90
        free_above = 50.0
        countries = ["de", "at"]

        [shipping.self_collection]

        [payment.surcharge]
        identifier = "credit-card"
        rate_percent = 2.5
        minimum_order = 5.0

        [payment.pay_in_advance]
        label = "Bank transfer"
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = PricingConfig::from_toml(FULL).unwrap();

        assert_eq!(config.currency, Currency::EUR);

        let tax = config.tax.as_ref().unwrap();
        assert_eq!(tax.rate().unwrap().bps(), 1900);
        assert_eq!(tax.label, "VAT");
        assert!(!tax.included);
        assert_eq!(tax.regional_rates().unwrap()["at"].bps(), 2000);

        let flat_rate = config.shipping.flat_rate.as_ref().unwrap();
        assert_eq!(flat_rate.identifier.as_deref(), Some("standard"));
        assert_eq!(flat_rate.label, "Standard shipping");
        assert_eq!(config.money(flat_rate.fee).amount, 490);

        let self_collection = config.shipping.self_collection.as_ref().unwrap();
        assert_eq!(self_collection.label, "Self-collection");
        assert!(self_collection.identifier.is_none());

        assert_eq!(config.payment.surcharge.as_ref().unwrap().label, "Card payment");
        assert_eq!(config.payment.pay_in_advance.as_ref().unwrap().label, "Bank transfer");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = PricingConfig::from_toml("").unwrap();

        assert_eq!(config.currency, Currency::USD);
        assert!(config.tax.is_none());
        assert!(config.shipping.flat_rate.is_none());
        assert!(config.payment.surcharge.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let negative_fee = r#"
            [shipping.flat_rate]
            fee = -1.0
        "#;
        let err = PricingConfig::from_toml(negative_fee).unwrap_err();
        assert!(err.is_configuration_error());

        let negative_rate = r#"
            [tax]
            rate_percent = -5.0
        "#;
        assert!(PricingConfig::from_toml(negative_rate).is_err());

        let malformed = "currency = ";
        assert!(matches!(
            PricingConfig::from_toml(malformed),
            Err(PricingError::Serialization(_))
        ));
    }

    #[test]
    fn test_sample_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/pricing.toml");
        let config = PricingConfig::from_path(path).unwrap();

        assert_eq!(config.currency, Currency::USD);
        assert_eq!(config.tax.unwrap().regional_rates().unwrap()["ca"].bps(), 1300);
        assert_eq!(
            config.payment.surcharge.unwrap().identifier.as_deref(),
            Some("credit-card")
        );
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = PricingConfig::from_path("/nonexistent/pricing.toml");
        assert!(matches!(result, Err(PricingError::Configuration(_))));
    }
}
