//! # Broker Session Contract
//!
//! The transport surface the provisioning core depends on. Implementations
//! must allow concurrent use of one session from several tasks.

use crate::error::{ConnectionError, SendError, SubscriptionError};
use crate::message::{InboundMessage, SessionProperties, SessionSignal};
use crate::topic::{ClientIdentity, Topic};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Opens sessions against a broker.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Connect and return the session plus its delivery channels.
    async fn connect(&self, properties: SessionProperties)
        -> Result<BrokerConnection, ConnectionError>;
}

/// One live broker session: its producer and consumer.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Name this session is registered under.
    fn client_name(&self) -> &ClientIdentity;

    /// Whether the session is still connected.
    fn is_connected(&self) -> bool;

    /// Subscribe this session to a topic pattern.
    ///
    /// With `wait_for_confirm` the call returns only after the broker has
    /// accepted or refused the subscription.
    async fn subscribe(&self, pattern: &Topic, wait_for_confirm: bool)
        -> Result<(), SubscriptionError>;

    /// Add a subscription to another connected client.
    async fn subscribe_for_client(
        &self,
        client: &ClientIdentity,
        topic: &Topic,
        wait_for_confirm: bool,
    ) -> Result<(), SubscriptionError>;

    /// Send `payload` as the reply to `original`.
    async fn send_reply(&self, original: &InboundMessage, payload: Bytes)
        -> Result<(), SendError>;

    /// Close the session. Idempotent.
    async fn disconnect(&self);
}

/// A freshly connected session and the channels the transport delivers on.
pub struct BrokerConnection {
    /// Shared handle for producer and subscription calls.
    pub session: Arc<dyn BrokerSession>,
    /// Messages matching the session's subscriptions.
    pub inbound: mpsc::Receiver<InboundMessage>,
    /// Session events and transport errors.
    pub signals: mpsc::UnboundedReceiver<SessionSignal>,
}

impl std::fmt::Debug for BrokerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConnection")
            .field("client_name", self.session.client_name())
            .finish()
    }
}
