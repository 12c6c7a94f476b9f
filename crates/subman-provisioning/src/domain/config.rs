//! Provisioning configuration

use shared_bus::Topic;
use std::time::Duration;

use crate::domain::catalog::RatesCatalog;
use crate::error::ConfigError;

/// Namespace every rates topic is rooted at unless configured otherwise.
pub const DEFAULT_NAMESPACE: &str = "bofa";

/// Which subscription policy the responder consults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PolicyChoice {
    /// Every requester gets the full default catalog.
    #[default]
    StaticCatalog,
    /// Per-requester asset classes, in `user:class|class;user:class` form.
    EntitlementTable(String),
}

/// Settings for the provisioning responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningConfig {
    /// Root level of every rates topic.
    pub namespace: String,
    /// Standing request subscription; derived from the namespace when `None`.
    pub request_topic: Option<String>,
    /// Upper bound for each grant and reply call. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
    pub policy: PolicyChoice,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            request_topic: None,
            call_timeout: None,
            policy: PolicyChoice::default(),
        }
    }
}

impl ProvisioningConfig {
    pub fn catalog(&self) -> RatesCatalog {
        RatesCatalog::new(self.namespace.clone())
    }

    /// The pattern to listen on.
    pub fn request_pattern(&self) -> Result<Topic, ConfigError> {
        let topic = match &self.request_topic {
            Some(topic) => Topic::new(topic.clone()),
            None => self.catalog().request_pattern(),
        };
        topic.map_err(|source| ConfigError::InvalidTopic {
            field: "request_topic",
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Missing("namespace"));
        }
        self.catalog()
            .request_pattern()
            .map_err(|source| ConfigError::InvalidTopic {
                field: "namespace",
                source,
            })?;
        self.request_pattern()?;
        if self.call_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidValue {
                key: "call_timeout".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}
