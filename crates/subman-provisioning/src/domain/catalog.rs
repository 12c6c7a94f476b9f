//! Rates topic catalog
//!
//! ```text
//! <namespace>/rates/v1/<class>/>              grant for one asset class
//! <namespace>/rates/v1/subman/request/*       standing request pattern
//! <namespace>/rates/v1/subman/request/<user>  where a requester publishes
//! ```

use shared_bus::{Topic, TopicError};

/// Asset classes granted by the static catalog, in grant order.
pub const DEFAULT_ASSET_CLASSES: [&str; 3] = ["bill", "bond", "note"];

const RATES_ROOT: &str = "rates/v1";
const REQUEST_LEVELS: &str = "subman/request";

/// Builds rates topics under one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatesCatalog {
    namespace: String,
}

impl RatesCatalog {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Wildcard grant covering everything published for `class`.
    pub fn class_topic(&self, class: &str) -> Result<Topic, TopicError> {
        Topic::new(format!("{}/{RATES_ROOT}/{class}/>", self.namespace))
    }

    /// Grants for every default asset class.
    pub fn default_grants(&self) -> Result<Vec<Topic>, TopicError> {
        DEFAULT_ASSET_CLASSES
            .iter()
            .map(|class| self.class_topic(class))
            .collect()
    }

    /// Pattern the responder listens on; one trailing level per requester.
    pub fn request_pattern(&self) -> Result<Topic, TopicError> {
        Topic::new(format!("{}/{RATES_ROOT}/{REQUEST_LEVELS}/*", self.namespace))
    }

    /// Concrete request topic for one requester.
    pub fn request_topic(&self, username: &str) -> Result<Topic, TopicError> {
        Topic::new(format!(
            "{}/{RATES_ROOT}/{REQUEST_LEVELS}/{username}",
            self.namespace
        ))
    }

    /// Topic a single rate update is published on.
    pub fn rate_topic(&self, class: &str, term: &str, cusip: &str) -> Result<Topic, TopicError> {
        Topic::new(format!(
            "{}/{RATES_ROOT}/{class}/{term}/{cusip}",
            self.namespace
        ))
    }
}
