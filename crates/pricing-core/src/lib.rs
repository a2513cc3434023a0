//! # pricing-core
//!
//! Cart modifier contract and pricing pipeline for lightning-pricing.
//!
//! This crate provides:
//! - `Modifier` trait for implementing pricing stages (tax, discounts, fees)
//! - `PaymentModifier` / `ShippingModifier` for selectable checkout options
//! - `Pipeline` which drives the modifiers over a cart in a fixed phase order
//! - `Cart`, `CartItem` and `ExtraRow` as the shared data the stages work on
//! - `Money`, `Currency` and `Rate` for integer amount arithmetic
//! - `PricingError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pricing_core::{Cart, Currency, Money, Pipeline, ProductRef, RequestContext};
//!
//! let pipeline = Pipeline::builder()
//!     .with_modifier(DefaultCartModifier::new())
//!     .with_modifier(ExcludedTaxModifier::new(Rate::from_bps(1000)))
//!     .build()?;
//!
//! let mut cart = Cart::new(Currency::USD)
//!     .with_product(ProductRef::new("book", "Book", Money::new(10.0, Currency::USD)), 2);
//!
//! pipeline.run(&mut cart, &RequestContext::new()).await?;
//! // cart.total == $22.00
//! ```

pub mod cart;
pub mod context;
pub mod error;
pub mod modifier;
pub mod money;
pub mod pipeline;

// Re-exports for convenience
pub use cart::{
    Cart, CartItem, ExtraRow, ProductRef, PAYMENT_MODIFIER_KEY, SHIPPING_MODIFIER_KEY,
};
pub use context::{RenderContext, RequestContext};
pub use error::{PricingError, PricingResult};
pub use modifier::{
    default_identifier, BoxedModifier, BoxedPaymentModifier, BoxedShippingModifier, Choice,
    Modifier, ModifierKind, PaymentModifier, ShippingModifier,
};
pub use money::{Currency, Money, Rate};
pub use pipeline::{ChoiceOption, Phase, Pipeline, PipelineBuilder, SelectionWarning};
