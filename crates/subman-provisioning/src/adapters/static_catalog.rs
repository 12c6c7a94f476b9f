//! Fixed-catalog policy: every requester gets every default asset class.

use async_trait::async_trait;
use shared_bus::{ClientIdentity, Topic};
use tracing::debug;

use crate::domain::RatesCatalog;
use crate::error::{ConfigError, PolicyError};
use crate::ports::SubscriptionPolicy;

/// Grants `<ns>/rates/v1/{bill,bond,note}/>` regardless of who asks.
#[derive(Debug, Clone)]
pub struct StaticCatalogPolicy {
    grants: Vec<Topic>,
}

impl StaticCatalogPolicy {
    pub fn new(catalog: RatesCatalog) -> Result<Self, ConfigError> {
        let grants = catalog
            .default_grants()
            .map_err(|source| ConfigError::InvalidTopic {
                field: "namespace",
                source,
            })?;
        Ok(Self { grants })
    }

    pub fn grants(&self) -> &[Topic] {
        &self.grants
    }
}

#[async_trait]
impl SubscriptionPolicy for StaticCatalogPolicy {
    async fn resolve(
        &self,
        requester_username: &str,
        target: &ClientIdentity,
    ) -> Result<Vec<Topic>, PolicyError> {
        debug!(
            requester = requester_username,
            client = %target,
            grants = self.grants.len(),
            "Resolved static catalog"
        );
        Ok(self.grants.clone())
    }

    fn name(&self) -> &'static str {
        "static-catalog"
    }
}
