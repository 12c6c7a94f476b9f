//! # Subscription Manager Runtime
//!
//! Process wiring for the `subman` binary:
//!
//! 1. Load [`RuntimeConfig`] (properties file + environment) and validate it
//! 2. Initialize logging
//! 3. Open the broker session and install the request listener
//! 4. Optionally run the demo requester
//! 5. Wait for Ctrl+C, then close the session
//!
//! The built-in transport is the in-process [`LoopbackBroker`], registered
//! with the configured VPN and credentials.

pub mod config;
pub mod demo;
pub mod telemetry;

pub use config::{BrokerConfig, RuntimeConfig};
pub use demo::{DemoError, DemoReport, DemoRequester};
pub use telemetry::{init_logging, TelemetryConfig, TelemetryError};

use shared_bus::LoopbackBroker;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use subman_provisioning::{
    build_policy, ConfigError, ProvisioningHandler, SessionError, SessionManager, SessionMonitor,
};
use thiserror::Error;
use tracing::info;

/// How long the demo requester waits for its reply and rate updates.
pub const DEMO_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot read properties file {}: {source}", path.display())]
    PropertiesFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Demo(#[from] DemoError),

    #[error("runtime not started")]
    NotStarted,
}

/// The running responder.
pub struct SubmanRuntime {
    config: RuntimeConfig,
    broker: LoopbackBroker,
    manager: Option<SessionManager>,
}

impl SubmanRuntime {
    /// Runtime over a fresh loopback broker that accepts the configured login.
    pub fn new(config: RuntimeConfig) -> Self {
        let broker = LoopbackBroker::new(config.broker.vpn.clone())
            .with_user(config.broker.username.clone(), config.broker.password.clone());
        Self::with_broker(config, broker)
    }

    pub fn with_broker(config: RuntimeConfig, broker: LoopbackBroker) -> Self {
        Self {
            config,
            broker,
            manager: None,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn broker(&self) -> &LoopbackBroker {
        &self.broker
    }

    pub fn is_running(&self) -> bool {
        self.manager.is_some()
    }

    pub fn monitor(&self) -> Option<Arc<SessionMonitor>> {
        self.manager.as_ref().map(SessionManager::monitor)
    }

    /// Connect and start serving provisioning requests.
    pub async fn start(&mut self) -> Result<(), RuntimeError> {
        if self.manager.is_some() {
            return Ok(());
        }
        self.config.validate()?;

        let provisioning = &self.config.provisioning;
        let policy = build_policy(provisioning)?;
        let pattern = provisioning.request_pattern()?;

        let manager =
            SessionManager::open_with(&self.broker, self.config.broker.session_properties())
                .await?;
        let handler = ProvisioningHandler::new(manager.session(), policy)
            .with_call_timeout(provisioning.call_timeout);
        info!(
            policy = handler.policy_name(),
            namespace = %provisioning.namespace,
            call_timeout_ms = provisioning.call_timeout.map(|t| t.as_millis() as u64),
            "Provisioning handler ready"
        );

        manager
            .listen_for_requests(&pattern, Arc::new(handler))
            .await?;
        self.manager = Some(manager);
        Ok(())
    }

    /// Run the configured demo requester, if any.
    pub async fn run_demo(&self) -> Result<Option<DemoReport>, RuntimeError> {
        if self.manager.is_none() {
            return Err(RuntimeError::NotStarted);
        }
        let Some(requester) = &self.config.demo else {
            return Ok(None);
        };
        let report = demo::run_demo(
            &self.broker,
            &self.config.broker,
            &self.config.provisioning.catalog(),
            requester,
            DEMO_REPLY_TIMEOUT,
        )
        .await?;
        Ok(Some(report))
    }

    /// Close the session. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        if let Some(manager) = self.manager.take() {
            info!("Shutting down subscription manager");
            manager.close().await;
        }
    }
}
