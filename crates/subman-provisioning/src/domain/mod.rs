//! Domain layer: request/response values, topic catalog, handler states.
//!
//! Pure types, no I/O.

pub mod catalog;
pub mod config;
pub mod request;
pub mod state;

pub use catalog::{RatesCatalog, DEFAULT_ASSET_CLASSES};
pub use config::{PolicyChoice, ProvisioningConfig, DEFAULT_NAMESPACE};
pub use request::{SubscriptionRequest, SubscriptionResponse};
pub use state::{GrantFailure, ProvisioningOutcome, ProvisioningState};
