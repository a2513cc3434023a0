//! # Payment Modifiers
//!
//! Selectable payment methods. Gateway integration lives elsewhere; these
//! only express what a method costs and when it may be offered.

use crate::config::{PayInAdvanceConfig, SurchargeConfig};
use async_trait::async_trait;
use pricing_core::{
    default_identifier, Cart, Choice, Currency, ExtraRow, Modifier, Money, PaymentModifier,
    PricingResult, Rate, RequestContext,
};
use serde_json::{json, Value};
use std::cmp::Ordering;
use tracing::debug;

/// Bank transfer before shipment; no extra cost
pub struct PayInAdvanceModifier {
    identifier: String,
    label: String,
}

impl PayInAdvanceModifier {
    pub fn new() -> Self {
        Self {
            identifier: default_identifier::<Self>(),
            label: "Pay in advance".to_string(),
        }
    }

    pub fn from_config(config: &PayInAdvanceConfig) -> Self {
        let modifier = Self::new().with_label(&config.label);
        match &config.identifier {
            Some(identifier) => modifier.with_identifier(identifier),
            None => modifier,
        }
    }

    /// Builder: override the identifier
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Builder: set the choice and row label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl Default for PayInAdvanceModifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Modifier for PayInAdvanceModifier {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn add_extra_cart_row(
        &self,
        cart: &mut Cart,
        _ctx: &RequestContext,
    ) -> PricingResult<()> {
        if self.is_active(cart) {
            cart.add_extra_row(ExtraRow::new(&self.label, Money::zero(cart.currency)));
        }
        Ok(())
    }
}

impl PaymentModifier for PayInAdvanceModifier {
    fn choice(&self) -> Choice {
        Choice::new(&self.identifier, &self.label)
    }
}

/// Percentage surcharge on the running total (e.g., card fees), only offered
/// from a minimum subtotal on
pub struct SurchargePaymentModifier {
    identifier: String,
    label: String,
    rate: Rate,
    minimum_order: Option<Money>,
}

impl SurchargePaymentModifier {
    pub fn new(rate: Rate) -> Self {
        Self {
            identifier: default_identifier::<Self>(),
            label: "Card payment".to_string(),
            rate,
            minimum_order: None,
        }
    }

    pub fn from_config(config: &SurchargeConfig, currency: Currency) -> PricingResult<Self> {
        let mut modifier =
            Self::new(Rate::from_percent(config.rate_percent)?).with_label(&config.label);
        if let Some(minimum) = config.minimum_order {
            modifier = modifier.with_minimum_order(Money::new(minimum, currency));
        }
        if let Some(identifier) = &config.identifier {
            modifier = modifier.with_identifier(identifier);
        }
        Ok(modifier)
    }

    /// Builder: override the identifier
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Builder: set the choice and row label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Builder: disable the method below this subtotal
    pub fn with_minimum_order(mut self, minimum: Money) -> Self {
        self.minimum_order = Some(minimum);
        self
    }

    fn surcharge(&self, cart: &Cart) -> PricingResult<Option<Money>> {
        cart.running_total()
            .map(|total| total.apply_rate(self.rate))
            .transpose()
    }
}

#[async_trait]
impl Modifier for SurchargePaymentModifier {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn process_cart(&self, cart: &mut Cart, ctx: &RequestContext) -> PricingResult<()> {
        // The row is computed from the total before the surcharge lands on it
        let surcharge = if self.is_active(cart) {
            self.surcharge(cart)?
        } else {
            None
        };
        self.add_extra_cart_row(cart, ctx).await?;

        if let (Some(surcharge), Some(total)) = (surcharge, cart.running_total()) {
            debug!(modifier = %self.identifier, surcharge = %surcharge, "Adding payment surcharge");
            cart.total = Some(total.checked_add(&surcharge)?);
        }
        Ok(())
    }

    async fn add_extra_cart_row(
        &self,
        cart: &mut Cart,
        _ctx: &RequestContext,
    ) -> PricingResult<()> {
        if !self.is_active(cart) {
            return Ok(());
        }
        if let Some(surcharge) = self.surcharge(cart)? {
            cart.add_extra_row(
                ExtraRow::new(&self.label, surcharge).with_data("rate_bps", self.rate.bps()),
            );
        }
        Ok(())
    }
}

impl PaymentModifier for SurchargePaymentModifier {
    fn choice(&self) -> Choice {
        Choice::new(&self.identifier, format!("{} (+{})", self.label, self.rate))
    }

    /// Disabled while the known subtotal is below the minimum order value
    fn is_disabled(&self, cart: &Cart) -> bool {
        match (self.minimum_order, cart.subtotal) {
            (Some(minimum), Some(subtotal)) => subtotal
                .compare(&minimum)
                .map(|ordering| ordering == Ordering::Less)
                .unwrap_or(true),
            _ => false,
        }
    }

    fn render_data(&self) -> Option<Value> {
        Some(json!({
            "rate_bps": self.rate.bps(),
            "minimum_order": self.minimum_order.map(|m| m.display()),
        }))
    }
}
