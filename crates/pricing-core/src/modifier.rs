//! # Cart Modifier Traits
//!
//! A modifier is one pluggable stage of the pricing pipeline: tax, discount,
//! shipping cost, payment surcharge. The pipeline knows nothing about what a
//! modifier computes; it only drives the hooks below in a fixed order.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Modifier (trait)                       │
//! │  ├── arrange_watch_items() / arrange_cart_items()           │
//! │  ├── pre_process_cart()        once per cart                │
//! │  ├── pre_process_cart_item()   once per item                │
//! │  ├── process_cart_item()       once per item  (line_total)  │
//! │  ├── process_cart()            once per cart  (total)       │
//! │  └── post_process_cart()       once per cart, reverse order │
//! └─────────────────────────────────────────────────────────────┘
//!                ▲                               ▲
//!       ┌────────┴─────────┐            ┌────────┴─────────┐
//!       │ PaymentModifier  │            │ ShippingModifier │
//!       │  choice()        │            │  choice()        │
//!       │  is_active()     │            │  is_active()     │
//!       │  is_disabled()   │            │  is_disabled()   │
//!       └──────────────────┘            └──────────────────┘
//! ```

use crate::cart::{Cart, CartItem, PAYMENT_MODIFIER_KEY, SHIPPING_MODIFIER_KEY};
use crate::context::{RenderContext, RequestContext};
use crate::error::PricingResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Default identifier for a modifier type: the last path segment of its
/// name, generic arguments stripped, lower-cased.
///
/// `default_identifier::<DefaultCartModifier>()` yields
/// `"defaultcartmodifier"`.
pub fn default_identifier<T: ?Sized>() -> String {
    let name = std::any::type_name::<T>();
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base).to_lowercase()
}

/// One stage of the pricing pipeline.
///
/// Every hook has a default, so implementations only override what they need.
/// Modifiers are configuration-time singletons shared between concurrent
/// pipeline runs; per-request state belongs in the cart or the context.
#[async_trait]
#[allow(unused_variables)]
pub trait Modifier: Send + Sync {
    /// Stable key of this modifier, unique within a pipeline.
    fn identifier(&self) -> &str;

    /// Reorder or regroup watched items (wish lists) for display.
    fn arrange_watch_items(&self, items: Vec<CartItem>, ctx: &RequestContext) -> Vec<CartItem> {
        items
    }

    /// Reorder or regroup the cart's items for display.
    fn arrange_cart_items(&self, items: Vec<CartItem>, ctx: &RequestContext) -> Vec<CartItem> {
        items
    }

    /// Called once before any totals exist.
    ///
    /// May populate preliminary fields such as `cart.extra` defaults, but must
    /// neither read nor write `subtotal` / `total`.
    async fn pre_process_cart(&self, cart: &mut Cart, ctx: &RequestContext) -> PricingResult<()> {
        Ok(())
    }

    /// Called once per item before its line total exists.
    ///
    /// While item hooks run the item is detached from `cart.items`.
    async fn pre_process_cart_item(
        &self,
        cart: &mut Cart,
        item: &mut CartItem,
        ctx: &RequestContext,
    ) -> PricingResult<()> {
        Ok(())
    }

    /// Called once per item. The first modifier conventionally seeds
    /// `item.line_total`; later ones may adjust it.
    ///
    /// Overrides must still call [`Modifier::add_extra_cart_item_row`].
    async fn process_cart_item(
        &self,
        cart: &mut Cart,
        item: &mut CartItem,
        ctx: &RequestContext,
    ) -> PricingResult<()> {
        self.add_extra_cart_item_row(item, ctx).await
    }

    /// Optionally attach an extra row to `item`.
    async fn add_extra_cart_item_row(
        &self,
        item: &mut CartItem,
        ctx: &RequestContext,
    ) -> PricingResult<()> {
        Ok(())
    }

    /// Called once per cart after `cart.subtotal` is known. The first modifier
    /// conventionally seeds `cart.total`; later ones may adjust it.
    ///
    /// Overrides must still call [`Modifier::add_extra_cart_row`].
    async fn process_cart(&self, cart: &mut Cart, ctx: &RequestContext) -> PricingResult<()> {
        self.add_extra_cart_row(cart, ctx).await
    }

    /// Optionally attach an extra row to `cart`.
    async fn add_extra_cart_row(&self, cart: &mut Cart, ctx: &RequestContext) -> PricingResult<()> {
        Ok(())
    }

    /// Called in reverse modifier order once all totals are final.
    /// Any change made here must keep `subtotal` and `total` consistent.
    async fn post_process_cart(&self, cart: &mut Cart, ctx: &RequestContext) -> PricingResult<()> {
        Ok(())
    }
}

/// Type alias for a shared modifier (dynamic dispatch)
pub type BoxedModifier = Arc<dyn Modifier>;

/// A modifier presented as an option in a payment or shipping form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// The two selectable modifier roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    Payment,
    Shipping,
}

impl ModifierKind {
    /// Key in `cart.extra` naming the selected modifier of this kind
    pub fn selection_key(&self) -> &'static str {
        match self {
            ModifierKind::Payment => PAYMENT_MODIFIER_KEY,
            ModifierKind::Shipping => SHIPPING_MODIFIER_KEY,
        }
    }

    /// Key in the render context under which modifiers of this kind publish
    pub fn render_namespace(&self) -> &'static str {
        match self {
            ModifierKind::Payment => "payment_modifiers",
            ModifierKind::Shipping => "shipping_modifiers",
        }
    }

    /// Whether `cart.extra` selects `identifier` for this kind
    pub fn is_selected(&self, cart: &Cart, identifier: &str) -> bool {
        cart.extra_str(self.selection_key()) == Some(identifier)
    }

    /// Ensure the namespace exists and optionally publish `data` under
    /// `identifier`. Repeated calls leave the context unchanged.
    pub fn publish(&self, context: &mut RenderContext, identifier: &str, data: Option<Value>) {
        let entry = context
            .entry(self.render_namespace())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let (Some(data), Value::Object(namespace)) = (data, entry) {
            namespace.insert(identifier.to_string(), data);
        }
    }
}

impl std::fmt::Display for ModifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModifierKind::Payment => f.write_str("payment"),
            ModifierKind::Shipping => f.write_str("shipping"),
        }
    }
}

/// A modifier that represents a payment method the customer can pick.
///
/// Exactly one payment modifier should be active for a cart at checkout.
/// The pipeline does not enforce this; see `Pipeline::selection_warnings`.
pub trait PaymentModifier: Modifier {
    /// The option shown in the payment form.
    fn choice(&self) -> Choice;

    /// True iff `cart.extra["payment_modifier"]` equals this identifier.
    fn is_active(&self, cart: &Cart) -> bool {
        ModifierKind::Payment.is_selected(cart, self.identifier())
    }

    /// Temporarily suppress this method for `cart` (e.g. below a minimum
    /// order value) without removing it from the pipeline.
    #[allow(unused_variables)]
    fn is_disabled(&self, cart: &Cart) -> bool {
        false
    }

    /// Data published under `payment_modifiers.<identifier>`.
    fn render_data(&self) -> Option<Value> {
        None
    }

    fn update_render_context(&self, context: &mut RenderContext) {
        ModifierKind::Payment.publish(context, self.identifier(), self.render_data());
    }
}

/// A modifier that represents a shipping method the customer can pick.
///
/// Exactly one shipping modifier should be active for a cart at checkout.
/// The pipeline does not enforce this; see `Pipeline::selection_warnings`.
pub trait ShippingModifier: Modifier {
    /// The option shown in the shipping form.
    fn choice(&self) -> Choice;

    /// True iff `cart.extra["shipping_modifier"]` equals this identifier.
    fn is_active(&self, cart: &Cart) -> bool {
        ModifierKind::Shipping.is_selected(cart, self.identifier())
    }

    /// Temporarily suppress this method for `cart` (e.g. undeliverable
    /// destination) without removing it from the pipeline.
    #[allow(unused_variables)]
    fn is_disabled(&self, cart: &Cart) -> bool {
        false
    }

    /// Data published under `shipping_modifiers.<identifier>`.
    fn render_data(&self) -> Option<Value> {
        None
    }

    fn update_render_context(&self, context: &mut RenderContext) {
        ModifierKind::Shipping.publish(context, self.identifier(), self.render_data());
    }
}

pub type BoxedPaymentModifier = Arc<dyn PaymentModifier>;
pub type BoxedShippingModifier = Arc<dyn ShippingModifier>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::ProductRef;
    use crate::money::{Currency, Money};

    struct Passthrough {
        identifier: String,
    }

    impl Passthrough {
        fn new() -> Self {
            Self {
                identifier: default_identifier::<Self>(),
            }
        }
    }

    impl Modifier for Passthrough {
        fn identifier(&self) -> &str {
            &self.identifier
        }
    }

    struct Courier {
        identifier: String,
    }

    impl Courier {
        fn named(identifier: &str) -> Self {
            Self {
                identifier: identifier.to_string(),
            }
        }
    }

    impl Modifier for Courier {
        fn identifier(&self) -> &str {
            &self.identifier
        }
    }

    impl ShippingModifier for Courier {
        fn choice(&self) -> Choice {
            Choice::new(&self.identifier, "Courier")
        }
    }

    struct CardPayment;

    impl Modifier for CardPayment {
        fn identifier(&self) -> &str {
            "card"
        }
    }

    impl PaymentModifier for CardPayment {
        fn choice(&self) -> Choice {
            Choice::new("card", "Credit card")
        }

        fn render_data(&self) -> Option<Value> {
            Some(serde_json::json!({ "brands": ["visa", "mastercard"] }))
        }
    }

    #[test]
    fn test_default_identifier_is_lowercased_type_name() {
        assert_eq!(Passthrough::new().identifier(), "passthrough");
        assert_eq!(default_identifier::<Vec<String>>(), "vec");
    }

    #[tokio::test]
    async fn test_default_hooks_leave_cart_untouched() {
        let modifier = Passthrough::new();
        let ctx = RequestContext::new();
        let mut cart = Cart::new(Currency::USD)
            .with_product(ProductRef::new("p", "P", Money::new(1.0, Currency::USD)), 1);
        let before = cart.clone();

        let mut item = cart.items[0].clone();
        modifier.pre_process_cart(&mut cart, &ctx).await.unwrap();
        modifier
            .pre_process_cart_item(&mut cart, &mut item, &ctx)
            .await
            .unwrap();
        modifier
            .process_cart_item(&mut cart, &mut item, &ctx)
            .await
            .unwrap();
        modifier.process_cart(&mut cart, &ctx).await.unwrap();
        modifier.post_process_cart(&mut cart, &ctx).await.unwrap();

        assert_eq!(cart, before);
        assert_eq!(item, before.items[0]);

        let arranged = modifier.arrange_cart_items(cart.items.clone(), &ctx);
        assert_eq!(arranged, cart.items);
        let watched = modifier.arrange_watch_items(Vec::new(), &ctx);
        assert!(watched.is_empty());
    }

    #[test]
    fn test_is_active_matches_selected_identifier() {
        let standard = Courier::named("standard");
        let express = Courier::named("express");
        let mut cart = Cart::new(Currency::USD);

        assert!(!standard.is_active(&cart));
        assert!(!express.is_active(&cart));

        cart.select_shipping_modifier("express");
        assert!(express.is_active(&cart));
        assert!(!standard.is_active(&cart));

        // Non-string values never match
        cart.set_extra(SHIPPING_MODIFIER_KEY, 42);
        assert!(!express.is_active(&cart));
    }

    #[test]
    fn test_payment_and_shipping_keys_are_independent() {
        let mut cart = Cart::new(Currency::USD);
        cart.select_shipping_modifier("card");

        assert!(!CardPayment.is_active(&cart));
        cart.select_payment_modifier("card");
        assert!(CardPayment.is_active(&cart));
    }

    #[test]
    fn test_is_disabled_defaults_to_false() {
        let cart = Cart::new(Currency::USD);
        assert!(!Courier::named("standard").is_disabled(&cart));
        assert!(!CardPayment.is_disabled(&cart));
    }

    #[test]
    fn test_update_render_context_is_idempotent() {
        let mut context = RenderContext::new();

        Courier::named("standard").update_render_context(&mut context);
        let once = context.clone();
        Courier::named("standard").update_render_context(&mut context);

        assert_eq!(context, once);
        assert_eq!(context["shipping_modifiers"], serde_json::json!({}));
    }

    #[test]
    fn test_update_render_context_publishes_render_data() {
        let mut context = RenderContext::new();
        context.insert("title".into(), "Checkout".into());

        CardPayment.update_render_context(&mut context);
        CardPayment.update_render_context(&mut context);

        assert_eq!(context["title"], "Checkout");
        assert_eq!(context["payment_modifiers"]["card"]["brands"][0], "visa");
        assert!(context.get("shipping_modifiers").is_none());
    }
}
