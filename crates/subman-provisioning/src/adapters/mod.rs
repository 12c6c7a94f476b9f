//! Adapters layer: subscription policy implementations.

pub mod entitlements;
pub mod static_catalog;

pub use entitlements::EntitlementTablePolicy;
pub use static_catalog::StaticCatalogPolicy;

use std::sync::Arc;

use crate::domain::{PolicyChoice, ProvisioningConfig};
use crate::error::ConfigError;
use crate::ports::SubscriptionPolicy;

/// Build the policy selected in `config`.
pub fn build_policy(
    config: &ProvisioningConfig,
) -> Result<Arc<dyn SubscriptionPolicy>, ConfigError> {
    let catalog = config.catalog();
    match &config.policy {
        PolicyChoice::StaticCatalog => Ok(Arc::new(StaticCatalogPolicy::new(catalog)?)),
        PolicyChoice::EntitlementTable(table) => {
            Ok(Arc::new(EntitlementTablePolicy::parse(catalog, table)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_selects_policy() {
        let config = ProvisioningConfig::default();
        assert_eq!(build_policy(&config).unwrap().name(), "static-catalog");

        let config = ProvisioningConfig {
            policy: PolicyChoice::EntitlementTable("alice:bill".to_string()),
            ..Default::default()
        };
        assert_eq!(build_policy(&config).unwrap().name(), "entitlement-table");
    }

    #[test]
    fn test_build_rejects_bad_table() {
        let config = ProvisioningConfig {
            policy: PolicyChoice::EntitlementTable("alice".to_string()),
            ..Default::default()
        };
        assert!(build_policy(&config).is_err());
    }
}
