//! # Request & Render Contexts
//!
//! [`RequestContext`] carries request-scoped data (session, locale, shipping
//! destination) to every hook. The pipeline never modifies it.
//!
//! [`RenderContext`] is the mapping a rendering layer hands to payment and
//! shipping modifiers so they can publish display data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Template context filled by `update_render_context`
pub type RenderContext = Map<String, Value>;

/// Request-scoped data modifiers may base their decisions on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Customer locale (e.g., "en-US")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Destination country, lower-case ISO 3166 alpha-2 (e.g., "de")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Session values
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub session: Map<String, Value>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set locale
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Builder: set destination country (normalized to lower case)
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into().to_lowercase());
        self
    }

    /// Builder: add a session value
    pub fn with_session_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.session.insert(key.into(), value.into());
        self
    }

    pub fn session_value(&self, key: &str) -> Option<&Value> {
        self.session.get(key)
    }
}
