//! # Pricing Error Types
//!
//! Typed error handling for the pricing pipeline.
//! Every fallible operation returns `Result<T, PricingError>`.
//!
//! Business conditions such as "no shipping to this address" are not errors;
//! they are expressed through `is_disabled` / `is_active` on the payment and
//! shipping modifier traits.

use crate::money::Currency;
use thiserror::Error;

/// Core error type for all pricing operations
#[derive(Debug, Error)]
pub enum PricingError {
    /// Invalid modifier setup (bad config values, inconsistent settings)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Two modifiers registered under the same identifier
    #[error("Duplicate modifier identifier: {identifier}")]
    DuplicateIdentifier { identifier: String },

    /// Money arithmetic across currencies
    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },

    /// No modifier seeded the line total of an item before the subtotal was derived
    #[error("Line total missing for cart item {item_id}")]
    LineTotalMissing { item_id: String },

    /// Amount out of range or otherwise unusable
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    /// A modifier hook failed for a non-business reason
    #[error("Modifier [{identifier}] failed: {message}")]
    Modifier { identifier: String, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PricingError {
    /// Create a hook failure attributed to a modifier
    pub fn modifier(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        PricingError::Modifier {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    /// Returns true for setup defects that must be fixed in code or config,
    /// as opposed to failures of a single pipeline run
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            PricingError::Configuration(_)
                | PricingError::DuplicateIdentifier { .. }
                | PricingError::Serialization(_)
        )
    }
}

/// Result type alias for pricing operations
pub type PricingResult<T> = Result<T, PricingError>;
