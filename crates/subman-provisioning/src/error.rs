//! Error types for the provisioning responder

use shared_bus::{ConnectionError, IdentityError, SendError, SubscriptionError, TopicError};
use thiserror::Error;

/// Startup configuration problems. Fatal: the responder does not start.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid topic for {field}: {source}")]
    InvalidTopic {
        field: &'static str,
        #[source]
        source: TopicError,
    },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Inbound payload could not be turned into a request. The message is dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("request payload is empty")]
    EmptyPayload,

    #[error("request is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("malformed request payload: {0}")]
    Malformed(String),
}

/// A decoded request that cannot be acted on. The message is dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid target client identity: {0}")]
    InvalidTarget(#[from] IdentityError),
}

/// The policy could not decide what to grant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("no entitlements for requester '{0}'")]
    UnknownRequester(String),
}

/// Errors opening the session or installing the request listener.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to connect to broker: {0}")]
    Connection(#[from] ConnectionError),

    #[error("failed to subscribe to request topic: {0}")]
    Subscription(#[from] SubscriptionError),

    #[error("already listening on '{0}'")]
    AlreadyListening(String),
}

/// Per-message failures of the provisioning handler.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("reply failed: {0}")]
    Send(#[from] SendError),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}
