//! # Messages and Session Signals
//!
//! Values the transport hands to the application: inbound messages with their
//! attachment bytes, and asynchronous session events.

use crate::error::ConnectionError;
use crate::topic::ClientIdentity;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// Broker-assigned message identity.
///
/// Replies carry the id of the request they answer; no application-level
/// correlation field is needed in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u64);

impl MessageId {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message delivered to a session.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Broker-assigned id.
    pub id: MessageId,
    /// Topic the message was published to.
    pub destination: String,
    /// Client that published the message, when known.
    pub sender: Option<ClientIdentity>,
    /// Where replies to this message should go.
    pub reply_to: Option<String>,
    /// Id of the request this message answers, for replies.
    pub correlation_id: Option<MessageId>,
    /// Binary attachment.
    pub attachment: Bytes,
}

impl InboundMessage {
    /// Attachment bytes.
    #[must_use]
    pub fn attachment(&self) -> &[u8] {
        &self.attachment
    }

    /// Whether this message is a reply to an earlier request.
    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.correlation_id.is_some()
    }
}

/// Connection properties for one session.
#[derive(Clone)]
pub struct SessionProperties {
    /// Broker address, `host:port`.
    pub host: String,
    /// Client-username.
    pub username: String,
    /// Client-password.
    pub password: String,
    /// Message VPN.
    pub vpn: String,
    /// Client name to register; the broker generates one when absent.
    pub client_name: Option<String>,
}

impl SessionProperties {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        vpn: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            vpn: vpn.into(),
            client_name: None,
        }
    }

    /// Register under a fixed client name.
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Reject empty mandatory properties.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        let required = [
            ("host", &self.host),
            ("username", &self.username),
            ("password", &self.password),
            ("vpn", &self.vpn),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConnectionError::MissingProperty(name));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SessionProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionProperties")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("vpn", &self.vpn)
            .field("client_name", &self.client_name)
            .finish()
    }
}

/// Connection state changes reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Session established.
    Up,
    /// Session lost; no further deliveries on this connection.
    Down { reason: String },
    /// Transport is attempting to re-establish the connection.
    Reconnecting,
    /// Transport re-established the connection.
    Reconnected,
    /// Flow or delivery problem on an otherwise live session.
    FlowError { reason: String },
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Up => write!(f, "UP_NOTICE"),
            SessionEvent::Down { reason } => write!(f, "DOWN_ERROR ({})", reason),
            SessionEvent::Reconnecting => write!(f, "RECONNECTING_NOTICE"),
            SessionEvent::Reconnected => write!(f, "RECONNECTED_NOTICE"),
            SessionEvent::FlowError { reason } => write!(f, "FLOW_ERROR ({})", reason),
        }
    }
}

/// Session-level fault not tied to any one message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transport error: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Everything delivered on a connection's signal channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    Event(SessionEvent),
    Error(TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_validate() {
        let props = SessionProperties::new("localhost:55555", "admin", "secret", "default");
        assert!(props.validate().is_ok());

        let props = SessionProperties::new("localhost:55555", "admin", "", "default");
        assert_eq!(
            props.validate(),
            Err(ConnectionError::MissingProperty("password"))
        );

        let props = SessionProperties::new(" ", "admin", "secret", "default");
        assert_eq!(props.validate(), Err(ConnectionError::MissingProperty("host")));
    }

    #[test]
    fn test_properties_debug_redacts_password() {
        let props = SessionProperties::new("h", "u", "hunter2", "v");
        let rendered = format!("{:?}", props);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_is_reply() {
        let mut message = InboundMessage {
            id: MessageId::new(7),
            destination: "a/b".to_string(),
            sender: None,
            reply_to: None,
            correlation_id: None,
            attachment: Bytes::from_static(b"{}"),
        };
        assert!(!message.is_reply());
        message.correlation_id = Some(MessageId::new(3));
        assert!(message.is_reply());
        assert_eq!(message.attachment(), b"{}");
    }
}
