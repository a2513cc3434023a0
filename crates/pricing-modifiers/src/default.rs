//! # Default Cart Modifier
//!
//! Seeds line totals and the cart total. Install it first; every other
//! modifier adjusts the amounts it produces.

use async_trait::async_trait;
use pricing_core::{default_identifier, Cart, CartItem, Modifier, PricingResult, RequestContext};
use tracing::debug;

/// Computes `line_total = unit_price × quantity` and `total = subtotal`.
///
/// Also drops extra rows left from an earlier run so the pipeline can be
/// re-run on the same cart without duplicating rows.
pub struct DefaultCartModifier {
    identifier: String,
}

impl DefaultCartModifier {
    pub fn new() -> Self {
        Self {
            identifier: default_identifier::<Self>(),
        }
    }

    /// Builder: override the identifier
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }
}

impl Default for DefaultCartModifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Modifier for DefaultCartModifier {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn pre_process_cart(&self, cart: &mut Cart, _ctx: &RequestContext) -> PricingResult<()> {
        cart.extra_rows.clear();
        Ok(())
    }

    async fn pre_process_cart_item(
        &self,
        _cart: &mut Cart,
        item: &mut CartItem,
        _ctx: &RequestContext,
    ) -> PricingResult<()> {
        item.extra_rows.clear();
        item.line_total = None;
        Ok(())
    }

    async fn process_cart_item(
        &self,
        _cart: &mut Cart,
        item: &mut CartItem,
        ctx: &RequestContext,
    ) -> PricingResult<()> {
        let line_total = item.base_total()?;
        debug!(item_id = %item.id, line_total = %line_total, "Line total seeded");
        item.line_total = Some(line_total);
        self.add_extra_cart_item_row(item, ctx).await
    }

    async fn process_cart(&self, cart: &mut Cart, ctx: &RequestContext) -> PricingResult<()> {
        cart.total = cart.subtotal;
        self.add_extra_cart_row(cart, ctx).await
    }
}
