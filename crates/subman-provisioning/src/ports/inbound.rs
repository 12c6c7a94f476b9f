//! Inbound Ports (Driving Ports)

use async_trait::async_trait;
use shared_bus::InboundMessage;

use crate::domain::ProvisioningOutcome;

/// Receive entry point for provisioning requests.
///
/// Invoked once per inbound message, possibly from several tasks at once.
#[async_trait]
pub trait ProvisioningApi: Send + Sync {
    /// Run one message through the provisioning state machine.
    async fn on_inbound_message(&self, message: &InboundMessage) -> ProvisioningOutcome;
}
