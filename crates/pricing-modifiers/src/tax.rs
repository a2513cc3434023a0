//! # Tax Modifiers
//!
//! Two ways of presenting tax on the cart:
//! - [`ExcludedTaxModifier`]: prices are net, tax is added to the total
//! - [`IncludedTaxModifier`]: prices are gross, the contained tax is shown
//!
//! Both pick the rate for the destination country in the request context,
//! falling back to the default rate.

use crate::config::TaxConfig;
use async_trait::async_trait;
use pricing_core::{
    default_identifier, BoxedModifier, Cart, ExtraRow, Modifier, Money, PricingResult, Rate,
    RequestContext,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Default rate plus per-country overrides
#[derive(Debug, Clone, Default)]
pub struct TaxRates {
    default: Rate,
    regional: HashMap<String, Rate>,
}

impl TaxRates {
    pub fn new(default: Rate) -> Self {
        Self {
            default,
            regional: HashMap::new(),
        }
    }

    /// Builder: override the rate for a country
    pub fn with_regional(mut self, country: impl Into<String>, rate: Rate) -> Self {
        self.regional.insert(country.into().to_lowercase(), rate);
        self
    }

    pub fn from_config(config: &TaxConfig) -> PricingResult<Self> {
        Ok(Self {
            default: config.rate()?,
            regional: config.regional_rates()?,
        })
    }

    /// Rate applying to the destination in `ctx`
    pub fn rate_for(&self, ctx: &RequestContext) -> Rate {
        ctx.country
            .as_deref()
            .and_then(|country| self.regional.get(country))
            .copied()
            .unwrap_or(self.default)
    }
}

/// The tax modifier matching `config.included`
pub fn tax_modifier(config: &TaxConfig) -> PricingResult<BoxedModifier> {
    if config.included {
        Ok(Arc::new(IncludedTaxModifier::from_config(config)?))
    } else {
        Ok(Arc::new(ExcludedTaxModifier::from_config(config)?))
    }
}

fn tax_row(label: &str, amount: Money, rate: Rate, included: bool) -> ExtraRow {
    ExtraRow::new(label, amount)
        .with_data("rate_bps", rate.bps())
        .with_data("included", included)
}

/// Adds tax on top of the subtotal
pub struct ExcludedTaxModifier {
    identifier: String,
    label: String,
    rates: TaxRates,
}

impl ExcludedTaxModifier {
    pub fn new(rates: TaxRates) -> Self {
        Self {
            identifier: default_identifier::<Self>(),
            label: "Tax".to_string(),
            rates,
        }
    }

    pub fn from_config(config: &TaxConfig) -> PricingResult<Self> {
        Ok(Self::new(TaxRates::from_config(config)?).with_label(&config.label))
    }

    /// Builder: override the identifier
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Builder: set the row label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    fn tax(&self, cart: &Cart, ctx: &RequestContext) -> PricingResult<Option<(Rate, Money)>> {
        let rate = self.rates.rate_for(ctx);
        cart.subtotal
            .map(|subtotal| subtotal.apply_rate(rate).map(|tax| (rate, tax)))
            .transpose()
    }
}

#[async_trait]
impl Modifier for ExcludedTaxModifier {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn process_cart(&self, cart: &mut Cart, ctx: &RequestContext) -> PricingResult<()> {
        if let (Some((rate, tax)), Some(total)) = (self.tax(cart, ctx)?, cart.running_total()) {
            debug!(rate = %rate, tax = %tax, "Adding tax to total");
            cart.total = Some(total.checked_add(&tax)?);
        }
        self.add_extra_cart_row(cart, ctx).await
    }

    async fn add_extra_cart_row(&self, cart: &mut Cart, ctx: &RequestContext) -> PricingResult<()> {
        if let Some((rate, tax)) = self.tax(cart, ctx)? {
            cart.add_extra_row(tax_row(&self.label, tax, rate, false));
        }
        Ok(())
    }
}

/// Shows the tax contained in tax-inclusive prices; the total is unchanged
pub struct IncludedTaxModifier {
    identifier: String,
    label: String,
    rates: TaxRates,
}

impl IncludedTaxModifier {
    pub fn new(rates: TaxRates) -> Self {
        Self {
            identifier: default_identifier::<Self>(),
            label: "Tax included".to_string(),
            rates,
        }
    }

    pub fn from_config(config: &TaxConfig) -> PricingResult<Self> {
        Ok(Self::new(TaxRates::from_config(config)?).with_label(&config.label))
    }

    /// Builder: override the identifier
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Builder: set the row label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[async_trait]
impl Modifier for IncludedTaxModifier {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn add_extra_cart_row(&self, cart: &mut Cart, ctx: &RequestContext) -> PricingResult<()> {
        let rate = self.rates.rate_for(ctx);
        if let Some(subtotal) = cart.subtotal {
            let contained = subtotal.contained_rate(rate);
            cart.add_extra_row(tax_row(&self.label, contained, rate, true));
        }
        Ok(())
    }
}
