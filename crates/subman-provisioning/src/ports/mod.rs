//! Ports layer
//!
//! - [`ProvisioningApi`]: driving port, fed by the session's message dispatcher
//! - [`SubscriptionPolicy`]: driven port deciding what a requester is granted
//!
//! The broker itself is reached through `shared_bus::BrokerSession`.

pub mod inbound;
pub mod outbound;

pub use inbound::ProvisioningApi;
pub use outbound::SubscriptionPolicy;
