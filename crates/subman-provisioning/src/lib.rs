//! # Subscription Manager Provisioning
//!
//! On-demand subscription provisioning for rates data. A control-plane caller
//! publishes `{"username": ..., "clientName": ...}` on
//! `<ns>/rates/v1/subman/request/<user>`; the responder asks its policy which
//! rates topics the user is entitled to, adds those subscriptions to the named
//! client through the broker, and replies with the list actually granted.
//!
//! ## Architecture
//!
//! Hexagonal layout:
//!
//! - **Domain Layer** (`domain/`): request/response values, topic catalog,
//!   provisioning states, configuration
//! - **Ports Layer** (`ports/`)
//!   - `ProvisioningApi`: driving port, one call per inbound message
//!   - `SubscriptionPolicy`: driven port, decides the grant list
//! - **Service Layer** (`service/`): `ProvisioningHandler` state machine
//! - **Adapters Layer** (`adapters/`): `StaticCatalogPolicy`,
//!   `EntitlementTablePolicy`
//! - **Session Layer** (`session/`): `SessionManager` owning the broker
//!   connection, `SessionMonitor` for session events
//! - **Codec** (`codec`): JSON wire format
//!
//! ## Failure handling
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Empty/undecodable payload | dropped, no reply |
//! | Invalid target client | dropped, no reply |
//! | Policy refusal | dropped, no reply |
//! | Grant call fails | stop granting, reply with the applied subset |
//! | Reply fails | logged, not retried, grants stay |
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use shared_bus::LoopbackBroker;
//! use subman_provisioning::{Credentials, ProvisioningHandler, SessionManager, StaticCatalogPolicy, RatesCatalog};
//!
//! let broker = LoopbackBroker::new("default");
//! let manager = SessionManager::open(&broker, Credentials::new("admin", "admin"), "localhost", "default").await?;
//!
//! let catalog = RatesCatalog::new("bofa");
//! let policy = Arc::new(StaticCatalogPolicy::new(catalog.clone())?);
//! let handler = Arc::new(ProvisioningHandler::new(manager.session(), policy));
//! manager.listen_for_requests(&catalog.request_pattern()?, handler).await?;
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod codec;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;
pub mod session;

#[cfg(test)]
mod test_support;

pub use adapters::{build_policy, EntitlementTablePolicy, StaticCatalogPolicy};
pub use domain::{
    GrantFailure, PolicyChoice, ProvisioningConfig, ProvisioningOutcome, ProvisioningState,
    RatesCatalog, SubscriptionRequest, SubscriptionResponse, DEFAULT_ASSET_CLASSES,
    DEFAULT_NAMESPACE,
};
pub use error::{
    ConfigError, DecodeError, PolicyError, ProvisioningError, SessionError, ValidationError,
};
pub use ports::{ProvisioningApi, SubscriptionPolicy};
pub use service::ProvisioningHandler;
pub use session::{Credentials, SessionManager, SessionMonitor};
