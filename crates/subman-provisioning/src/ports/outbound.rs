//! Outbound Ports (Driven Ports)

use async_trait::async_trait;
use shared_bus::{ClientIdentity, Topic};

use crate::error::PolicyError;

/// Decides which topics a requester's target client is granted.
///
/// Implementations return topics in grant order and must not return
/// duplicates; the handler applies the list as given.
#[async_trait]
pub trait SubscriptionPolicy: Send + Sync {
    async fn resolve(
        &self,
        requester_username: &str,
        target: &ClientIdentity,
    ) -> Result<Vec<Topic>, PolicyError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
