//! Entitlement-table policy
//!
//! Maps requester usernames to the asset classes they may receive:
//!
//! ```text
//! alice:bill|bond;bob:note
//! ```
//!
//! Requesters absent from the table are refused.

use async_trait::async_trait;
use shared_bus::{ClientIdentity, Topic};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::domain::RatesCatalog;
use crate::error::{ConfigError, PolicyError};
use crate::ports::SubscriptionPolicy;

/// Settings key the table is read from.
pub const ENTITLEMENTS_KEY: &str = "subman.entitlements";

#[derive(Debug, Clone)]
pub struct EntitlementTablePolicy {
    grants: HashMap<String, Vec<Topic>>,
}

impl EntitlementTablePolicy {
    /// Parse a table. Repeated users and classes are merged, first-seen order kept.
    pub fn parse(catalog: RatesCatalog, table: &str) -> Result<Self, ConfigError> {
        let invalid = |entry: &str| ConfigError::InvalidValue {
            key: ENTITLEMENTS_KEY.to_string(),
            value: entry.to_string(),
        };

        let mut grants: HashMap<String, Vec<Topic>> = HashMap::new();
        for entry in table.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (user, classes) = entry.split_once(':').ok_or_else(|| invalid(entry))?;
            let user = user.trim();
            if user.is_empty() {
                return Err(invalid(entry));
            }

            let topics = grants.entry(user.to_string()).or_default();
            for class in classes.split('|').map(str::trim) {
                if class.is_empty() || class.contains(['/', '*', '>']) {
                    return Err(invalid(entry));
                }
                let topic = catalog.class_topic(class).map_err(|_| invalid(entry))?;
                if !topics.contains(&topic) {
                    topics.push(topic);
                }
            }
        }

        Ok(Self { grants })
    }

    /// Number of requesters in the table.
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[async_trait]
impl SubscriptionPolicy for EntitlementTablePolicy {
    async fn resolve(
        &self,
        requester_username: &str,
        target: &ClientIdentity,
    ) -> Result<Vec<Topic>, PolicyError> {
        match self.grants.get(requester_username) {
            Some(topics) => {
                debug!(
                    requester = requester_username,
                    client = %target,
                    grants = topics.len(),
                    "Resolved entitlements"
                );
                Ok(topics.clone())
            }
            None => {
                warn!(requester = requester_username, client = %target, "No entitlements");
                Err(PolicyError::UnknownRequester(requester_username.to_string()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "entitlement-table"
    }
}
