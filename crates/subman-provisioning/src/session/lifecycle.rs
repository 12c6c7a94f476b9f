//! # Session Lifecycle Manager
//!
//! ```text
//! open() ──→ connect ──→ signal dispatcher (events → SessionMonitor)
//!   │
//!   └─→ listen_for_requests(pattern, api) ──→ subscribe(pattern, confirm)
//!                                         └─→ message dispatcher (one task per message)
//! ```
//!
//! Exactly one connection and one request subscription per manager.

use parking_lot::Mutex;
use shared_bus::{
    BrokerConnector, BrokerSession, InboundMessage, SessionProperties, SessionSignal, Topic,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, SessionError};
use crate::ports::ProvisioningApi;
use crate::session::monitor::SessionMonitor;

/// How long `close` waits for the transport to flush its final session events.
pub const SIGNAL_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Broker login.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Owns the broker session and its dispatcher tasks.
pub struct SessionManager {
    session: Arc<dyn BrokerSession>,
    monitor: Arc<SessionMonitor>,
    inbound: Mutex<Option<mpsc::Receiver<InboundMessage>>>,
    listening: Mutex<Option<Topic>>,
    signal_task: Mutex<Option<JoinHandle<()>>>,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Connect with the four mandatory settings.
    pub async fn open(
        connector: &dyn BrokerConnector,
        credentials: Credentials,
        host: &str,
        vpn: &str,
    ) -> Result<Self, SessionError> {
        let properties =
            SessionProperties::new(host, credentials.username, credentials.password, vpn);
        Self::open_with(connector, properties).await
    }

    /// Connect with explicit session properties.
    pub async fn open_with(
        connector: &dyn BrokerConnector,
        properties: SessionProperties,
    ) -> Result<Self, SessionError> {
        let required = [
            ("host", &properties.host),
            ("username", &properties.username),
            ("password", &properties.password),
            ("vpn", &properties.vpn),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name).into());
            }
        }

        info!(host = %properties.host, vpn = %properties.vpn, username = %properties.username, "Connecting to broker");
        let connection = connector.connect(properties).await?;
        let session = connection.session;
        info!(client = %session.client_name(), "Connected");

        let monitor = Arc::new(SessionMonitor::new());
        let signal_task = tokio::spawn(dispatch_signals(connection.signals, monitor.clone()));

        Ok(Self {
            session,
            monitor,
            inbound: Mutex::new(Some(connection.inbound)),
            listening: Mutex::new(None),
            signal_task: Mutex::new(Some(signal_task)),
            dispatch_task: Mutex::new(None),
        })
    }

    /// Shared handle for the provisioning handler.
    pub fn session(&self) -> Arc<dyn BrokerSession> {
        self.session.clone()
    }

    pub fn monitor(&self) -> Arc<SessionMonitor> {
        self.monitor.clone()
    }

    /// Pattern the standing subscription was added for, once listening.
    pub fn listening_on(&self) -> Option<Topic> {
        self.listening.lock().clone()
    }

    /// Add the standing request subscription and route every delivery to `api`.
    pub async fn listen_for_requests(
        &self,
        pattern: &Topic,
        api: Arc<dyn ProvisioningApi>,
    ) -> Result<(), SessionError> {
        let inbound = {
            if let Some(existing) = self.listening.lock().as_ref() {
                return Err(SessionError::AlreadyListening(existing.to_string()));
            }
            self.inbound.lock().take()
        };
        let Some(inbound) = inbound else {
            return Err(SessionError::AlreadyListening(pattern.to_string()));
        };

        if let Err(e) = self.session.subscribe(pattern, true).await {
            warn!(topic = %pattern, error = %e, "Request subscription failed");
            *self.inbound.lock() = Some(inbound);
            return Err(e.into());
        }

        *self.listening.lock() = Some(pattern.clone());
        *self.dispatch_task.lock() = Some(tokio::spawn(dispatch_requests(inbound, api)));
        info!(topic = %pattern, "Listening for subscription requests");
        Ok(())
    }

    /// Stop dispatching and disconnect. Idempotent.
    ///
    /// Session events raised by the disconnect still reach the monitor; the
    /// signal dispatcher is given [`SIGNAL_DRAIN_TIMEOUT`] to see its channel close.
    pub async fn close(&self) {
        let dispatch = self.dispatch_task.lock().take();
        if let Some(task) = dispatch {
            task.abort();
        }
        self.session.disconnect().await;

        let signals = self.signal_task.lock().take();
        if let Some(mut task) = signals {
            if tokio::time::timeout(SIGNAL_DRAIN_TIMEOUT, &mut task).await.is_err() {
                debug!("Signal channel still open after disconnect");
                task.abort();
            }
        }
        info!(client = %self.session.client_name(), "Session closed");
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(task) = self.dispatch_task.lock().take() {
            task.abort();
        }
        if let Some(task) = self.signal_task.lock().take() {
            task.abort();
        }
    }
}

async fn dispatch_signals(
    mut signals: mpsc::UnboundedReceiver<SessionSignal>,
    monitor: Arc<SessionMonitor>,
) {
    while let Some(signal) = signals.recv().await {
        monitor.on_signal(signal);
    }
    debug!("Signal channel closed");
}

async fn dispatch_requests(
    mut inbound: mpsc::Receiver<InboundMessage>,
    api: Arc<dyn ProvisioningApi>,
) {
    while let Some(message) = inbound.recv().await {
        let api = api.clone();
        tokio::spawn(async move {
            api.on_inbound_message(&message).await;
        });
    }
    debug!("Inbound channel closed");
}
