//! Service layer: the provisioning handler.

pub mod handler;

pub use handler::ProvisioningHandler;
