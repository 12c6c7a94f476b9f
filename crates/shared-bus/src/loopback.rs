//! # Loopback Broker
//!
//! In-process implementation of the broker session contract.
//!
//! Every connected client owns a subscription list, an inbox and a reply
//! topic (`#P2P/v:<vpn>/<client>`). Publishing routes a message to each client
//! whose reply topic or subscriptions match the destination, at most once per
//! client. Replies addressed to a client with a pending request complete that
//! request instead of landing in the inbox.
//!
//! Suitable for single-process operation and tests; a networked deployment
//! plugs a real transport in behind the same traits.

use crate::error::{ConnectionError, RequestError, SendError, SubscriptionError};
use crate::message::{InboundMessage, MessageId, SessionEvent, SessionProperties, SessionSignal};
use crate::pending::PendingReplies;
use crate::session::{BrokerConnection, BrokerConnector, BrokerSession};
use crate::topic::{ClientIdentity, Topic};
use crate::{DEFAULT_CHANNEL_CAPACITY, REPLY_TOPIC_PREFIX};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Broker-side state of one connected client.
struct ClientEntry {
    /// Connection epoch; a reconnect under the same name gets a new one.
    session_id: Uuid,
    /// Subscriptions in the order they were added, without duplicates.
    subscriptions: Vec<Topic>,
    /// Reply inbox topic.
    reply_topic: String,
    /// Delivery channel.
    inbox: mpsc::Sender<InboundMessage>,
    /// Session events and transport errors.
    signals: mpsc::UnboundedSender<SessionSignal>,
    /// Requests awaiting replies.
    pending: Arc<PendingReplies>,
}

struct BrokerState {
    /// The single message VPN served.
    vpn: String,
    /// Known client-usernames; empty means any credentials are accepted.
    users: RwLock<HashMap<String, String>>,
    /// Connected clients by name.
    clients: RwLock<HashMap<ClientIdentity, ClientEntry>>,
    /// Next message id.
    next_message_id: AtomicU64,
    /// Inbox capacity per client.
    capacity: usize,
}

/// Delivery target collected under the read lock.
struct Delivery {
    client: ClientIdentity,
    inbox: mpsc::Sender<InboundMessage>,
    pending: Arc<PendingReplies>,
}

/// In-process broker. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct LoopbackBroker {
    state: Arc<BrokerState>,
}

impl LoopbackBroker {
    /// Create a broker serving one message VPN.
    pub fn new(vpn: impl Into<String>) -> Self {
        Self::with_capacity(vpn, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a broker with a custom per-client inbox capacity.
    pub fn with_capacity(vpn: impl Into<String>, capacity: usize) -> Self {
        Self {
            state: Arc::new(BrokerState {
                vpn: vpn.into(),
                users: RwLock::new(HashMap::new()),
                clients: RwLock::new(HashMap::new()),
                next_message_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Require this client-username/password pair on connect.
    pub fn with_user(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.state
            .users
            .write()
            .insert(username.into(), password.into());
        self
    }

    #[must_use]
    pub fn vpn(&self) -> &str {
        &self.state.vpn
    }

    /// Names of all connected clients.
    #[must_use]
    pub fn connected_clients(&self) -> Vec<ClientIdentity> {
        let mut names: Vec<ClientIdentity> = self.state.clients.read().keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn is_connected(&self, client: &ClientIdentity) -> bool {
        self.state.clients.read().contains_key(client)
    }

    /// Subscriptions currently held by a client, in the order added.
    #[must_use]
    pub fn subscriptions_of(&self, client: &ClientIdentity) -> Option<Vec<Topic>> {
        self.state
            .clients
            .read()
            .get(client)
            .map(|entry| entry.subscriptions.clone())
    }

    /// Push a session signal to a client, as the transport would.
    pub fn emit(&self, client: &ClientIdentity, signal: SessionSignal) -> bool {
        match self.state.clients.read().get(client) {
            Some(entry) => entry.signals.send(signal).is_ok(),
            None => false,
        }
    }

    /// Drop a client from the broker side.
    pub fn force_disconnect(&self, client: &ClientIdentity, reason: &str) -> bool {
        self.remove_client(client, None, reason)
    }

    /// Publish without a session, e.g. from a feed handler.
    pub async fn publish(&self, destination: &str, payload: Bytes) -> Result<usize, SendError> {
        let destination = concrete_destination(destination)?;
        let message = InboundMessage {
            id: self.next_id(),
            destination,
            sender: None,
            reply_to: None,
            correlation_id: None,
            attachment: payload,
        };
        Ok(self.route(message).await)
    }

    fn next_id(&self) -> MessageId {
        MessageId::new(self.state.next_message_id.fetch_add(1, Ordering::Relaxed))
    }

    fn reply_topic_for(&self, client: &ClientIdentity) -> String {
        format!("{}/v:{}/{}", REPLY_TOPIC_PREFIX, self.state.vpn, client)
    }

    /// Remove a client. With `session_id`, only that connection epoch is removed.
    fn remove_client(&self, client: &ClientIdentity, session_id: Option<Uuid>, reason: &str) -> bool {
        let entry = {
            let mut clients = self.state.clients.write();
            let same_epoch = clients
                .get(client)
                .is_some_and(|entry| session_id.map_or(true, |id| id == entry.session_id));
            if same_epoch {
                clients.remove(client)
            } else {
                None
            }
        };

        let Some(entry) = entry else {
            return false;
        };

        let _ = entry.signals.send(SessionSignal::Event(SessionEvent::Down {
            reason: reason.to_string(),
        }));
        let cancelled = entry.pending.cancel_all();
        info!(client = %client, reason, cancelled, "Client disconnected");
        true
    }

    fn add_subscription(&self, client: &ClientIdentity, topic: &Topic) -> Result<bool, SubscriptionError> {
        let mut clients = self.state.clients.write();
        let entry = clients
            .get_mut(client)
            .ok_or_else(|| SubscriptionError::UnknownClient(client.clone()))?;

        if entry.subscriptions.contains(topic) {
            return Ok(false);
        }
        entry.subscriptions.push(topic.clone());
        Ok(true)
    }

    /// Deliver to every matching client. Returns the number of deliveries.
    async fn route(&self, message: InboundMessage) -> usize {
        let targets: Vec<Delivery> = {
            let clients = self.state.clients.read();
            clients
                .iter()
                .filter(|(_, entry)| {
                    entry.reply_topic == message.destination
                        || entry
                            .subscriptions
                            .iter()
                            .any(|sub| sub.matches(&message.destination))
                })
                .map(|(name, entry)| Delivery {
                    client: name.clone(),
                    inbox: entry.inbox.clone(),
                    pending: entry.pending.clone(),
                })
                .collect()
        };

        let mut delivered = 0;
        for target in targets {
            let mut copy = message.clone();
            if copy.is_reply() {
                match target.pending.complete(copy) {
                    Ok(()) => {
                        delivered += 1;
                        continue;
                    }
                    Err(unclaimed) => copy = unclaimed,
                }
            }

            if target.inbox.send(copy).await.is_ok() {
                delivered += 1;
            } else {
                debug!(client = %target.client, "Inbox closed, message dropped");
            }
        }

        debug!(
            destination = %message.destination,
            message_id = %message.id,
            receivers = delivered,
            "Message routed"
        );
        delivered
    }
}

impl std::fmt::Debug for LoopbackBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackBroker")
            .field("vpn", &self.state.vpn)
            .field("clients", &self.state.clients.read().len())
            .finish()
    }
}

fn concrete_destination(destination: &str) -> Result<String, SendError> {
    match Topic::new(destination) {
        Ok(topic) if !topic.is_wildcard() => Ok(topic.into()),
        _ => Err(SendError::InvalidDestination(destination.to_string())),
    }
}

impl LoopbackBroker {
    /// Connect and keep the concrete session type, for callers that need
    /// [`LoopbackSession::publish`] or [`LoopbackSession::request`].
    pub async fn open(
        &self,
        properties: SessionProperties,
    ) -> Result<LoopbackConnection, ConnectionError> {
        properties.validate()?;

        if properties.vpn != self.state.vpn {
            return Err(ConnectionError::UnknownVpn {
                vpn: properties.vpn,
            });
        }

        {
            let users = self.state.users.read();
            if !users.is_empty() && users.get(&properties.username) != Some(&properties.password)
            {
                return Err(ConnectionError::AuthenticationFailed {
                    username: properties.username,
                });
            }
        }

        let client = match properties.client_name {
            Some(name) => ClientIdentity::new(name)?,
            None => ClientIdentity::new(format!("loopback/{}", Uuid::new_v4().simple()))?,
        };

        let (inbox_tx, inbox_rx) = mpsc::channel(self.state.capacity);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(PendingReplies::new());
        let session_id = Uuid::new_v4();
        let reply_topic = self.reply_topic_for(&client);

        {
            let mut clients = self.state.clients.write();
            if clients.contains_key(&client) {
                return Err(ConnectionError::ClientNameInUse(client.to_string()));
            }
            clients.insert(
                client.clone(),
                ClientEntry {
                    session_id,
                    subscriptions: Vec::new(),
                    reply_topic: reply_topic.clone(),
                    inbox: inbox_tx,
                    signals: signal_tx.clone(),
                    pending: pending.clone(),
                },
            );
        }

        let _ = signal_tx.send(SessionSignal::Event(SessionEvent::Up));
        info!(
            client = %client,
            host = %properties.host,
            vpn = %properties.vpn,
            "Client connected"
        );

        let session = LoopbackSession {
            broker: self.clone(),
            client,
            session_id,
            reply_topic,
            pending,
            connected: AtomicBool::new(true),
        };

        Ok(LoopbackConnection {
            session: Arc::new(session),
            inbound: inbox_rx,
            signals: signal_rx,
        })
    }
}

#[async_trait]
impl BrokerConnector for LoopbackBroker {
    async fn connect(
        &self,
        properties: SessionProperties,
    ) -> Result<BrokerConnection, ConnectionError> {
        self.open(properties).await.map(BrokerConnection::from)
    }
}

/// A loopback connection with its concrete session type.
pub struct LoopbackConnection {
    pub session: Arc<LoopbackSession>,
    pub inbound: mpsc::Receiver<InboundMessage>,
    pub signals: mpsc::UnboundedReceiver<SessionSignal>,
}

impl From<LoopbackConnection> for BrokerConnection {
    fn from(connection: LoopbackConnection) -> Self {
        Self {
            session: connection.session,
            inbound: connection.inbound,
            signals: connection.signals,
        }
    }
}

/// A client session on the loopback broker.
pub struct LoopbackSession {
    broker: LoopbackBroker,
    client: ClientIdentity,
    session_id: Uuid,
    reply_topic: String,
    pending: Arc<PendingReplies>,
    connected: AtomicBool,
}

impl LoopbackSession {
    /// Reply inbox topic of this session.
    #[must_use]
    pub fn reply_topic(&self) -> &str {
        &self.reply_topic
    }

    fn ensure_live(&self) -> bool {
        self.connected.load(Ordering::Acquire)
            && self
                .broker
                .state
                .clients
                .read()
                .get(&self.client)
                .is_some_and(|entry| entry.session_id == self.session_id)
    }

    /// Publish a direct message.
    pub async fn publish(&self, destination: &str, payload: Bytes) -> Result<MessageId, SendError> {
        if !self.ensure_live() {
            return Err(SendError::NotConnected);
        }
        let destination = concrete_destination(destination)?;
        let id = self.broker.next_id();
        let message = InboundMessage {
            id,
            destination,
            sender: Some(self.client.clone()),
            reply_to: None,
            correlation_id: None,
            attachment: payload,
        };
        self.broker.route(message).await;
        Ok(id)
    }

    /// Publish a request and wait for the correlated reply.
    pub async fn request(
        &self,
        destination: &str,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<InboundMessage, RequestError> {
        if !self.ensure_live() {
            return Err(SendError::NotConnected.into());
        }
        let destination = concrete_destination(destination)?;
        let id = self.broker.next_id();
        let reply = self.pending.register(id);

        let message = InboundMessage {
            id,
            destination,
            sender: Some(self.client.clone()),
            reply_to: Some(self.reply_topic.clone()),
            correlation_id: None,
            attachment: payload,
        };
        self.broker.route(message).await;

        match tokio::time::timeout(timeout, reply).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) => Err(RequestError::Cancelled),
            Err(_) => {
                self.pending.cancel(id);
                warn!(request_id = %id, ?timeout, "Request timed out");
                Err(RequestError::Timeout(timeout))
            }
        }
    }
}

#[async_trait]
impl BrokerSession for LoopbackSession {
    fn client_name(&self) -> &ClientIdentity {
        &self.client
    }

    fn is_connected(&self) -> bool {
        self.ensure_live()
    }

    async fn subscribe(&self, pattern: &Topic, wait_for_confirm: bool) -> Result<(), SubscriptionError> {
        if !self.ensure_live() {
            return Err(SubscriptionError::NotConnected);
        }
        let added = self.broker.add_subscription(&self.client, pattern)?;
        debug!(
            client = %self.client,
            topic = %pattern,
            added,
            wait_for_confirm,
            "Subscription added"
        );
        Ok(())
    }

    async fn subscribe_for_client(
        &self,
        client: &ClientIdentity,
        topic: &Topic,
        wait_for_confirm: bool,
    ) -> Result<(), SubscriptionError> {
        if !self.ensure_live() {
            return Err(SubscriptionError::NotConnected);
        }
        let added = self.broker.add_subscription(client, topic)?;
        debug!(
            on_behalf_of = %client,
            by = %self.client,
            topic = %topic,
            added,
            wait_for_confirm,
            "Subscription added for client"
        );
        Ok(())
    }

    async fn send_reply(&self, original: &InboundMessage, payload: Bytes) -> Result<(), SendError> {
        if !self.ensure_live() {
            return Err(SendError::NotConnected);
        }
        let reply_to = original
            .reply_to
            .clone()
            .ok_or_else(|| SendError::NoReplyDestination(original.id.to_string()))?;

        let reply = InboundMessage {
            id: self.broker.next_id(),
            destination: reply_to,
            sender: Some(self.client.clone()),
            reply_to: None,
            correlation_id: Some(original.id),
            attachment: payload,
        };
        self.broker.route(reply).await;
        Ok(())
    }

    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            self.broker
                .remove_client(&self.client, Some(self.session_id), "client requested disconnect");
        }
    }
}
