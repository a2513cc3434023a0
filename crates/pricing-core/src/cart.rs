//! # Cart Types
//!
//! The cart, its items and the extra rows modifiers attach to them.
//! Storage of carts is up to the caller; the pipeline only mutates the
//! structures it is handed.

use crate::error::PricingResult;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Key in [`Cart::extra`] holding the identifier of the selected payment modifier
pub const PAYMENT_MODIFIER_KEY: &str = "payment_modifier";

/// Key in [`Cart::extra`] holding the identifier of the selected shipping modifier
pub const SHIPPING_MODIFIER_KEY: &str = "shipping_modifier";

/// A labelled amount explaining an adjustment to a cart or cart item.
///
/// Rows are immutable once built. Modifiers that may run more than once
/// against the same cart are responsible for not adding the same row twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraRow {
    label: String,
    amount: Money,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    data: Map<String, Value>,
}

impl ExtraRow {
    pub fn new(label: impl Into<String>, amount: Money) -> Self {
        Self {
            label: label.into(),
            amount,
            data: Map::new(),
        }
    }

    /// Builder: attach a metadata entry
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }
}

/// The product/price descriptor a cart item points at.
///
/// Only `unit_price` is meaningful to the built-in modifiers; everything else
/// is carried through for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRef {
    /// Catalog identifier (e.g., "rang-play-rs-pro")
    pub id: String,

    /// Display name
    pub name: String,

    /// Price of a single unit
    pub unit_price: Money,
}

impl ProductRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
        }
    }
}

/// A line in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Unique item ID (generated)
    pub id: String,

    pub product: ProductRef,

    pub quantity: u32,

    /// Undefined until the item phase of the pipeline has run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_total: Option<Money>,

    /// Item-scoped scratch data for modifiers
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,

    /// Rows explaining adjustments to this line, in display order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_rows: Vec<ExtraRow>,
}

impl CartItem {
    pub fn new(product: ProductRef, quantity: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            product,
            quantity,
            line_total: None,
            extra: Map::new(),
            extra_rows: Vec::new(),
        }
    }

    /// Unit price times quantity, before any modifier adjustments
    pub fn base_total(&self) -> PricingResult<Money> {
        self.product.unit_price.times(self.quantity)
    }

    pub fn add_extra_row(&mut self, row: ExtraRow) {
        self.extra_rows.push(row);
    }
}

/// A shopping cart as seen by the pricing pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    /// Unique cart ID (generated)
    pub id: String,

    /// Currency all amounts of this cart are expressed in
    pub currency: Currency,

    pub items: Vec<CartItem>,

    /// Sum of all line totals; valid once every item passed the item phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Money>,

    /// Valid once the cart phase has completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Money>,

    /// Shared key-value store read and written by modifiers and the
    /// selection layer (see [`PAYMENT_MODIFIER_KEY`], [`SHIPPING_MODIFIER_KEY`])
    #[serde(default)]
    pub extra: Map<String, Value>,

    /// Rows explaining cart-level adjustments, in display order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_rows: Vec<ExtraRow>,
}

impl Cart {
    /// Create an empty cart with generated ID
    pub fn new(currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            currency,
            items: Vec::new(),
            subtotal: None,
            total: None,
            extra: Map::new(),
            extra_rows: Vec::new(),
        }
    }

    /// Add an item
    pub fn add_item(&mut self, item: CartItem) {
        self.items.push(item);
    }

    /// Add a product with quantity
    pub fn add_product(&mut self, product: ProductRef, quantity: u32) {
        self.add_item(CartItem::new(product, quantity));
    }

    /// Builder: add a product with quantity
    pub fn with_product(mut self, product: ProductRef, quantity: u32) -> Self {
        self.add_product(product, quantity);
        self
    }

    pub fn add_extra_row(&mut self, row: ExtraRow) {
        self.extra_rows.push(row);
    }

    /// Read a string entry from `extra`
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }

    /// Record the payment modifier chosen by the customer
    pub fn select_payment_modifier(&mut self, identifier: impl Into<String>) {
        self.set_extra(PAYMENT_MODIFIER_KEY, identifier.into());
    }

    /// Record the shipping modifier chosen by the customer
    pub fn select_shipping_modifier(&mut self, identifier: impl Into<String>) {
        self.set_extra(SHIPPING_MODIFIER_KEY, identifier.into());
    }

    /// Forget totals computed by an earlier pricing run
    pub fn clear_totals(&mut self) {
        self.subtotal = None;
        self.total = None;
    }

    /// The running total if the cart phase seeded one, else the subtotal
    pub fn running_total(&self) -> Option<Money> {
        self.total.or(self.subtotal)
    }

    /// Check if cart is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get item count
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> ProductRef {
        ProductRef::new("widget", "Widget", Money::new(10.0, Currency::USD))
    }

    #[test]
    fn test_new_cart_has_no_totals() {
        let cart = Cart::new(Currency::USD).with_product(widget(), 2);

        assert_eq!(cart.item_count(), 2);
        assert!(cart.subtotal.is_none());
        assert!(cart.total.is_none());
        assert!(cart.items[0].line_total.is_none());
    }

    #[test]
    fn test_clear_totals_falls_back_to_nothing() {
        let mut cart = Cart::new(Currency::USD).with_product(widget(), 1);
        cart.subtotal = Some(Money::new(10.0, Currency::USD));
        cart.total = Some(Money::new(12.0, Currency::USD));
        assert_eq!(cart.running_total(), cart.total);

        cart.clear_totals();

        assert!(cart.subtotal.is_none());
        assert!(cart.running_total().is_none());
    }

    #[test]
    fn test_base_total() {
        let item = CartItem::new(widget(), 3);
        assert_eq!(item.base_total().unwrap().amount, 3000);
    }

    #[test]
    fn test_extra_row_builder() {
        let row = ExtraRow::new("Tax", Money::new(2.0, Currency::USD)).with_data("rate_bps", 1000);

        assert_eq!(row.label(), "Tax");
        assert_eq!(row.amount().amount, 200);
        assert_eq!(row.data().get("rate_bps"), Some(&Value::from(1000)));
        assert_eq!(row, row.clone());
    }

    #[test]
    fn test_selection_keys() {
        let mut cart = Cart::new(Currency::USD);
        assert!(cart.extra_str(PAYMENT_MODIFIER_KEY).is_none());

        cart.select_payment_modifier("pay-in-advance");
        cart.select_shipping_modifier("express");

        assert_eq!(cart.extra_str(PAYMENT_MODIFIER_KEY), Some("pay-in-advance"));
        assert_eq!(cart.extra_str(SHIPPING_MODIFIER_KEY), Some("express"));
    }

    #[test]
    fn test_serialization_omits_unset_totals() {
        let cart = Cart::new(Currency::EUR).with_product(widget(), 1);
        let json = serde_json::to_value(&cart).unwrap();

        assert!(json.get("subtotal").is_none());
        assert_eq!(json["currency"], "eur");
        assert_eq!(json["items"][0]["quantity"], 1);
    }
}
