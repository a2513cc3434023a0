//! # pricing-modifiers
//!
//! Built-in modifiers for the lightning-pricing pipeline:
//!
//! 1. **DefaultCartModifier** - seeds line totals and the cart total
//!    - Install first
//!
//! 2. **ExcludedTaxModifier / IncludedTaxModifier** - tax on net or gross prices
//!    - Per-country rates from the request context
//!
//! 3. **FlatRateShippingModifier / SelfCollectionModifier** - shipping methods
//!    - Free-shipping threshold, deliverable countries
//!
//! 4. **SurchargePaymentModifier / PayInAdvanceModifier** - payment methods
//!    - Percentage surcharge, minimum order value
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pricing_core::{Pipeline, RequestContext};
//! use pricing_modifiers::{config::PricingConfig, DefaultCartModifier, ExcludedTaxModifier};
//!
//! let config = PricingConfig::load()?;
//!
//! let pipeline = Pipeline::builder()
//!     .with_modifier(DefaultCartModifier::new())
//!     .with_modifier(ExcludedTaxModifier::from_config(config.tax.as_ref().unwrap())?)
//!     .build()?;
//!
//! pipeline.run(&mut cart, &RequestContext::new().with_country("de")).await?;
//! ```

pub mod config;
pub mod default;
pub mod payment;
pub mod shipping;
pub mod tax;

// Re-exports
pub use config::PricingConfig;
pub use default::DefaultCartModifier;
pub use payment::{PayInAdvanceModifier, SurchargePaymentModifier};
pub use shipping::{FlatRateShippingModifier, SelfCollectionModifier};
pub use tax::{tax_modifier, ExcludedTaxModifier, IncludedTaxModifier, TaxRates};
