//! # Pricing Pipeline
//!
//! Drives an ordered list of modifiers over a cart in five phases:
//!
//! ```text
//!  1. pre_process_cart        m0 → mn
//!  2. pre_process_cart_item   for each item: m0 → mn
//!  3. process_cart_item       for each item: m0 → mn
//!     subtotal := Σ line_total
//!  4. process_cart            m0 → mn
//!  5. post_process_cart       mn → m0
//! ```
//!
//! `subtotal` and `total` are cleared before phase 1, so a re-run never builds
//! on the totals of an earlier one. There is no branching and no retry. The
//! first failing hook aborts the run; the cart's totals are then in an
//! unspecified partial state and must not be displayed.

use crate::cart::{Cart, CartItem};
use crate::context::{RenderContext, RequestContext};
use crate::error::{PricingError, PricingResult};
use crate::modifier::{
    BoxedModifier, BoxedPaymentModifier, BoxedShippingModifier, Choice, Modifier, ModifierKind,
    PaymentModifier, ShippingModifier,
};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// The pipeline phase a hook belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    PreProcessCart,
    PreProcessCartItem,
    ProcessCartItem,
    ProcessCart,
    PostProcessCart,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::PreProcessCart => "pre_process_cart",
            Phase::PreProcessCartItem => "pre_process_cart_item",
            Phase::ProcessCartItem => "process_cart_item",
            Phase::ProcessCart => "process_cart",
            Phase::PostProcessCart => "post_process_cart",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment or shipping option as offered for one cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub identifier: String,
    pub choice: Choice,
    pub active: bool,
    pub disabled: bool,
}

/// A selection state the integrating application should not let through to
/// checkout. The pipeline reports these but never resolves them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionWarning {
    /// More than one modifier of a kind claims to be active
    MultipleActive {
        kind: ModifierKind,
        identifiers: Vec<String>,
    },
    /// The active modifier reports itself disabled for this cart
    ActiveDisabled { kind: ModifierKind, identifier: String },
    /// `cart.extra` selects an identifier no registered modifier answers to
    UnknownSelection { kind: ModifierKind, identifier: String },
}

/// Builder collecting modifiers in registration order
#[derive(Default)]
pub struct PipelineBuilder {
    modifiers: Vec<BoxedModifier>,
    payment: Vec<BoxedPaymentModifier>,
    shipping: Vec<BoxedShippingModifier>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plain modifier
    pub fn with_modifier<M: Modifier + 'static>(self, modifier: M) -> Self {
        self.with_shared_modifier(Arc::new(modifier))
    }

    /// Append an already shared modifier
    pub fn with_shared_modifier(mut self, modifier: BoxedModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Append a payment modifier; it also takes part in every phase
    pub fn with_payment_modifier<M: PaymentModifier + 'static>(mut self, modifier: M) -> Self {
        let modifier = Arc::new(modifier);
        self.modifiers.push(modifier.clone());
        self.payment.push(modifier);
        self
    }

    /// Append a shipping modifier; it also takes part in every phase
    pub fn with_shipping_modifier<M: ShippingModifier + 'static>(mut self, modifier: M) -> Self {
        let modifier = Arc::new(modifier);
        self.modifiers.push(modifier.clone());
        self.shipping.push(modifier);
        self
    }

    /// Validate identifiers and freeze the order
    pub fn build(self) -> PricingResult<Pipeline> {
        let mut seen = HashSet::new();
        for modifier in &self.modifiers {
            let identifier = modifier.identifier();
            if identifier.is_empty() {
                return Err(PricingError::Configuration(
                    "modifier identifier must not be empty".to_string(),
                ));
            }
            if !seen.insert(identifier) {
                return Err(PricingError::DuplicateIdentifier {
                    identifier: identifier.to_string(),
                });
            }
        }

        debug!(
            modifiers = ?self.modifiers.iter().map(|m| m.identifier()).collect::<Vec<_>>(),
            "Pricing pipeline built"
        );

        Ok(Pipeline {
            modifiers: self.modifiers,
            payment: self.payment,
            shipping: self.shipping,
        })
    }
}

/// Ordered modifier list and the protocol that runs it.
///
/// Cloning is cheap; clones share the modifier instances.
#[derive(Clone)]
pub struct Pipeline {
    modifiers: Vec<BoxedModifier>,
    payment: Vec<BoxedPaymentModifier>,
    shipping: Vec<BoxedShippingModifier>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Compute line totals, subtotal, total and extra rows of `cart` in place
    #[instrument(
        skip_all,
        fields(cart_id = %cart.id, items = cart.items.len(), modifiers = self.modifiers.len())
    )]
    pub async fn run(&self, cart: &mut Cart, ctx: &RequestContext) -> PricingResult<()> {
        // Totals belong to this run until the cart phase has finished
        cart.clear_totals();

        for modifier in &self.modifiers {
            let result = modifier.pre_process_cart(cart, ctx).await;
            check(modifier, Phase::PreProcessCart, result)?;
        }

        // Items are detached while item hooks get `&mut Cart` alongside them
        let mut items = std::mem::take(&mut cart.items);
        let outcome = self.process_items(cart, &mut items, ctx).await;
        cart.items = items;
        outcome?;

        let subtotal = subtotal(cart)?;
        cart.subtotal = Some(subtotal);
        debug!(subtotal = %subtotal, "Subtotal derived");

        for modifier in &self.modifiers {
            let result = modifier.process_cart(cart, ctx).await;
            check(modifier, Phase::ProcessCart, result)?;
        }

        for modifier in self.modifiers.iter().rev() {
            let result = modifier.post_process_cart(cart, ctx).await;
            check(modifier, Phase::PostProcessCart, result)?;
        }

        info!(
            subtotal = %subtotal,
            total = %cart.total.map(|t| t.display()).unwrap_or_else(|| "-".to_string()),
            extra_rows = cart.extra_rows.len(),
            "Cart priced"
        );
        Ok(())
    }

    async fn process_items(
        &self,
        cart: &mut Cart,
        items: &mut [CartItem],
        ctx: &RequestContext,
    ) -> PricingResult<()> {
        for item in items.iter_mut() {
            for modifier in &self.modifiers {
                let result = modifier.pre_process_cart_item(cart, item, ctx).await;
                check(modifier, Phase::PreProcessCartItem, result)?;
            }
        }

        for item in items.iter_mut() {
            for modifier in &self.modifiers {
                let result = modifier.process_cart_item(cart, item, ctx).await;
                check(modifier, Phase::ProcessCartItem, result)?;
            }
        }

        Ok(())
    }

    /// Pass cart items through every modifier's `arrange_cart_items`, in order
    pub fn arrange_cart_items(&self, items: Vec<CartItem>, ctx: &RequestContext) -> Vec<CartItem> {
        self.modifiers
            .iter()
            .fold(items, |items, m| m.arrange_cart_items(items, ctx))
    }

    /// Pass watched items through every modifier's `arrange_watch_items`, in order
    pub fn arrange_watch_items(&self, items: Vec<CartItem>, ctx: &RequestContext) -> Vec<CartItem> {
        self.modifiers
            .iter()
            .fold(items, |items, m| m.arrange_watch_items(items, ctx))
    }

    /// All modifiers in execution order
    pub fn modifiers(&self) -> &[BoxedModifier] {
        &self.modifiers
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.modifiers.iter().map(|m| m.identifier()).collect()
    }

    /// Get a modifier by identifier
    pub fn get(&self, identifier: &str) -> Option<&BoxedModifier> {
        self.modifiers.iter().find(|m| m.identifier() == identifier)
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    pub fn payment_modifiers(&self) -> &[BoxedPaymentModifier] {
        &self.payment
    }

    pub fn shipping_modifiers(&self) -> &[BoxedShippingModifier] {
        &self.shipping
    }

    /// First payment modifier, in registration order, that is active for `cart`
    pub fn active_payment_modifier(&self, cart: &Cart) -> Option<&BoxedPaymentModifier> {
        self.payment.iter().find(|m| m.is_active(cart))
    }

    /// First shipping modifier, in registration order, that is active for `cart`
    pub fn active_shipping_modifier(&self, cart: &Cart) -> Option<&BoxedShippingModifier> {
        self.shipping.iter().find(|m| m.is_active(cart))
    }

    /// Payment options for a selection form
    pub fn payment_choices(&self, cart: &Cart) -> Vec<ChoiceOption> {
        self.payment
            .iter()
            .map(|m| ChoiceOption {
                identifier: m.identifier().to_string(),
                choice: m.choice(),
                active: m.is_active(cart),
                disabled: m.is_disabled(cart),
            })
            .collect()
    }

    /// Shipping options for a selection form
    pub fn shipping_choices(&self, cart: &Cart) -> Vec<ChoiceOption> {
        self.shipping
            .iter()
            .map(|m| ChoiceOption {
                identifier: m.identifier().to_string(),
                choice: m.choice(),
                active: m.is_active(cart),
                disabled: m.is_disabled(cart),
            })
            .collect()
    }

    /// Let every payment and shipping modifier publish its render data
    pub fn update_render_context(&self, context: &mut RenderContext) {
        for modifier in &self.payment {
            modifier.update_render_context(context);
        }
        for modifier in &self.shipping {
            modifier.update_render_context(context);
        }
    }

    /// Report selection states the caller must resolve before checkout.
    ///
    /// Never called by [`Pipeline::run`]; the cart is left untouched.
    pub fn selection_warnings(&self, cart: &Cart) -> Vec<SelectionWarning> {
        let mut warnings = selection_warnings_for(
            ModifierKind::Payment,
            cart,
            &self.payment_choices(cart),
        );
        warnings.extend(selection_warnings_for(
            ModifierKind::Shipping,
            cart,
            &self.shipping_choices(cart),
        ));

        for warning in &warnings {
            warn!(cart_id = %cart.id, ?warning, "Inconsistent modifier selection");
        }
        warnings
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("modifiers", &self.identifiers())
            .finish()
    }
}

/// Log a hook failure with its origin before it aborts the run
fn check(modifier: &BoxedModifier, phase: Phase, result: PricingResult<()>) -> PricingResult<()> {
    if let Err(e) = &result {
        error!(
            modifier = modifier.identifier(),
            phase = %phase,
            error = %e,
            "Modifier hook failed, aborting pipeline run"
        );
    }
    result
}

fn subtotal(cart: &Cart) -> PricingResult<Money> {
    let line_totals = cart
        .items
        .iter()
        .map(|item| {
            item.line_total.ok_or_else(|| PricingError::LineTotalMissing {
                item_id: item.id.clone(),
            })
        })
        .collect::<PricingResult<Vec<_>>>()?;
    Money::sum(cart.currency, &line_totals)
}

fn selection_warnings_for(
    kind: ModifierKind,
    cart: &Cart,
    options: &[ChoiceOption],
) -> Vec<SelectionWarning> {
    let mut warnings = Vec::new();
    let active: Vec<&ChoiceOption> = options.iter().filter(|o| o.active).collect();

    if active.len() > 1 {
        warnings.push(SelectionWarning::MultipleActive {
            kind,
            identifiers: active.iter().map(|o| o.identifier.clone()).collect(),
        });
    }

    for option in active.iter().filter(|o| o.disabled) {
        warnings.push(SelectionWarning::ActiveDisabled {
            kind,
            identifier: option.identifier.clone(),
        });
    }

    if let Some(selected) = cart.extra_str(kind.selection_key()) {
        if !options.iter().any(|o| o.identifier == selected) {
            warnings.push(SelectionWarning::UnknownSelection {
                kind,
                identifier: selected.to_string(),
            });
        }
    }

    warnings
}
