//! # Shipping Modifiers
//!
//! Selectable shipping methods. Each only touches the cart when it is the
//! active shipping modifier (`cart.extra["shipping_modifier"]`).

use crate::config::{FlatRateConfig, SelfCollectionConfig};
use async_trait::async_trait;
use pricing_core::{
    default_identifier, Cart, Choice, Currency, ExtraRow, Modifier, Money, PricingResult,
    RequestContext, ShippingModifier,
};
use serde_json::{json, Value};
use std::cmp::Ordering;
use tracing::debug;

/// Customer picks the goods up; costs nothing
pub struct SelfCollectionModifier {
    identifier: String,
    label: String,
}

impl SelfCollectionModifier {
    pub fn new() -> Self {
        Self {
            identifier: default_identifier::<Self>(),
            label: "Self-collection".to_string(),
        }
    }

    pub fn from_config(config: &SelfCollectionConfig) -> Self {
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

impl Default for SelfCollectionModifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Modifier for SelfCollectionModifier {
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

impl ShippingModifier for SelfCollectionModifier {
    fn choice(&self) -> Choice {
        Choice::new(&self.identifier, &self.label)
    }
}

/// Fixed fee, optionally free above a subtotal and limited to some countries.
///
/// The destination country is taken from the request context during
/// `pre_process_cart` and kept in `cart.extra["<identifier>:destination"]`,
/// so `is_disabled` can answer from the cart alone.
pub struct FlatRateShippingModifier {
    identifier: String,
    label: String,
    fee: Money,
    free_above: Option<Money>,
    countries: Vec<String>,
}

impl FlatRateShippingModifier {
    pub fn new(fee: Money) -> Self {
        Self {
            identifier: default_identifier::<Self>(),
            label: "Standard shipping".to_string(),
            fee,
            free_above: None,
            countries: Vec::new(),
        }
    }

    pub fn from_config(config: &FlatRateConfig, currency: Currency) -> Self {
        let modifier = Self::new(Money::new(config.fee, currency))
            .with_label(&config.label)
            .with_countries(config.countries.iter().cloned());
        let modifier = match config.free_above {
            Some(threshold) => modifier.with_free_above(Money::new(threshold, currency)),
            None => modifier,
        };
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

    /// Builder: ship for free from this subtotal on
    pub fn with_free_above(mut self, threshold: Money) -> Self {
        self.free_above = Some(threshold);
        self
    }

    /// Builder: restrict delivery to these countries
    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = countries
            .into_iter()
            .map(|c| c.into().to_lowercase())
            .collect();
        self
    }

    /// Key in `cart.extra` holding the recorded destination
    pub fn destination_key(&self) -> String {
        format!("{}:destination", self.identifier)
    }

    /// Fee for this cart, zero once the subtotal reaches `free_above`
    pub fn cost(&self, cart: &Cart) -> PricingResult<Money> {
        if let (Some(threshold), Some(subtotal)) = (self.free_above, cart.subtotal) {
            if subtotal.compare(&threshold)? != Ordering::Less {
                return Ok(Money::zero(cart.currency));
            }
        }
        Ok(self.fee)
    }
}

#[async_trait]
impl Modifier for FlatRateShippingModifier {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn pre_process_cart(&self, cart: &mut Cart, ctx: &RequestContext) -> PricingResult<()> {
        let key = self.destination_key();
        match &ctx.country {
            Some(country) => cart.set_extra(key, country.to_lowercase()),
            None => {
                cart.extra.remove(&key);
            }
        }
        Ok(())
    }

    async fn process_cart(&self, cart: &mut Cart, ctx: &RequestContext) -> PricingResult<()> {
        if self.is_active(cart) {
            if let Some(total) = cart.running_total() {
                let cost = self.cost(cart)?;
                debug!(modifier = %self.identifier, cost = %cost, "Adding shipping cost");
                cart.total = Some(total.checked_add(&cost)?);
            }
        }
        self.add_extra_cart_row(cart, ctx).await
    }

    async fn add_extra_cart_row(
        &self,
        cart: &mut Cart,
        _ctx: &RequestContext,
    ) -> PricingResult<()> {
        if self.is_active(cart) {
            let cost = self.cost(cart)?;
            cart.add_extra_row(ExtraRow::new(&self.label, cost).with_data("shipping", true));
        }
        Ok(())
    }
}

impl ShippingModifier for FlatRateShippingModifier {
    fn choice(&self) -> Choice {
        Choice::new(&self.identifier, format!("{} ({})", self.label, self.fee))
    }

    /// Disabled when delivery is restricted and the recorded destination is
    /// missing or not in the list
    fn is_disabled(&self, cart: &Cart) -> bool {
        if self.countries.is_empty() {
            return false;
        }
        match cart.extra_str(&self.destination_key()) {
            Some(country) => !self.countries.iter().any(|c| c == country),
            None => true,
        }
    }

    fn render_data(&self) -> Option<Value> {
        Some(json!({
            "fee": self.fee.display(),
            "free_above": self.free_above.map(|m| m.display()),
            "countries": self.countries,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DefaultCartModifier;
    use pricing_core::{Pipeline, ProductRef, RenderContext};

    fn usd(amount: f64) -> Money {
        Money::new(amount, Currency::USD)
    }

    fn cart(unit: f64) -> Cart {
        Cart::new(Currency::USD).with_product(ProductRef::new("kit", "Kit", usd(unit)), 1)
    }

    fn pipeline() -> Pipeline {
        Pipeline::builder()
            .with_modifier(DefaultCartModifier::new())
            .with_shipping_modifier(
                FlatRateShippingModifier::new(usd(5.0))
                    .with_identifier("standard")
                    .with_free_above(usd(100.0))
                    .with_countries(["US", "ca"]),
            )
            .with_shipping_modifier(SelfCollectionModifier::new())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_flat_rate_applies_only_when_active() {
        let pipeline = pipeline();
        let ctx = RequestContext::new().with_country("us");

        let mut cart = cart(20.0);
        pipeline.run(&mut cart, &ctx).await.unwrap();
        assert_eq!(cart.total, Some(usd(20.0)));
        assert!(cart.extra_rows.is_empty());

        cart.select_shipping_modifier("standard");
        pipeline.run(&mut cart, &ctx).await.unwrap();
        assert_eq!(cart.total, Some(usd(25.0)));
        assert_eq!(cart.extra_rows.len(), 1);
        assert_eq!(cart.extra_rows[0].label(), "Standard shipping");
        assert_eq!(cart.extra_rows[0].amount(), usd(5.0));
    }

    #[tokio::test]
    async fn test_free_above_threshold() {
        let pipeline = pipeline();
        let mut cart = cart(100.0);
        cart.select_shipping_modifier("standard");

        pipeline
            .run(&mut cart, &RequestContext::new().with_country("us"))
            .await
            .unwrap();

        assert_eq!(cart.total, Some(usd(100.0)));
        assert_eq!(cart.extra_rows[0].amount(), Money::zero(Currency::USD));
    }

    #[tokio::test]
    async fn test_undeliverable_destination_disables() {
        let pipeline = pipeline();
        let standard = &pipeline.shipping_modifiers()[0];
        let mut cart = cart(20.0);

        pipeline
            .run(&mut cart, &RequestContext::new().with_country("de"))
            .await
            .unwrap();
        assert_eq!(cart.extra_str("standard:destination"), Some("de"));
        assert!(standard.is_disabled(&cart));

        pipeline
            .run(&mut cart, &RequestContext::new().with_country("CA"))
            .await
            .unwrap();
        assert!(!standard.is_disabled(&cart));

        pipeline.run(&mut cart, &RequestContext::new()).await.unwrap();
        assert!(cart.extra_str("standard:destination").is_none());
        assert!(standard.is_disabled(&cart));

        // Self-collection is never disabled
        assert!(!pipeline.shipping_modifiers()[1].is_disabled(&cart));
    }

    #[tokio::test]
    async fn test_self_collection_row() {
        let pipeline = pipeline();
        let mut cart = cart(20.0);
        cart.select_shipping_modifier("selfcollectionmodifier");

        pipeline.run(&mut cart, &RequestContext::new()).await.unwrap();

        assert_eq!(cart.total, Some(usd(20.0)));
        assert_eq!(
            cart.extra_rows,
            vec![ExtraRow::new("Self-collection", Money::zero(Currency::USD))]
        );
    }

    #[test]
    fn test_choices_and_render_context() {
        let pipeline = pipeline();
        let mut cart = cart(20.0);
        cart.select_shipping_modifier("standard");

        let choices = pipeline.shipping_choices(&cart);
        assert_eq!(choices[0].choice, Choice::new("standard", "Standard shipping ($5.00)"));
        assert!(choices[0].active);
        assert_eq!(choices[1].choice.value, "selfcollectionmodifier");
        assert!(!choices[1].active);

        let mut context = RenderContext::new();
        pipeline.update_render_context(&mut context);
        assert_eq!(context["shipping_modifiers"]["standard"]["fee"], "$5.00");
        assert_eq!(context["shipping_modifiers"]["standard"]["countries"][1], "ca");
        assert!(context["shipping_modifiers"].get("selfcollectionmodifier").is_none());
    }

    #[test]
    fn test_from_config() {
        let config = FlatRateConfig {
            identifier: Some("ground".to_string()),
            label: "Ground".to_string(),
            fee: 7.5,
            free_above: None,
            countries: Vec::new(),
        };
        let modifier = FlatRateShippingModifier::from_config(&config, Currency::CAD);

        assert_eq!(modifier.identifier(), "ground");
        assert_eq!(modifier.fee, Money::from_minor(750, Currency::CAD));
        assert!(!modifier.is_disabled(&Cart::new(Currency::CAD)));

        let self_collection = SelfCollectionModifier::from_config(&SelfCollectionConfig {
            identifier: None,
            label: "Pick-up".to_string(),
        });
        assert_eq!(self_collection.identifier(), "selfcollectionmodifier");
        assert_eq!(self_collection.choice().label, "Pick-up");
    }
}
