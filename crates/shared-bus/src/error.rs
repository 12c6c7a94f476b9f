//! # Transport Errors
//!
//! One error type per broker operation, so callers can tell a failed
//! connect from a failed grant or a failed reply.

use crate::topic::ClientIdentity;
use std::time::Duration;
use thiserror::Error;

/// Errors establishing a broker session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// A required session property was empty.
    #[error("missing session property: {0}")]
    MissingProperty(&'static str),

    /// The broker rejected the client-username/password pair.
    #[error("authentication failed for client-username '{username}'")]
    AuthenticationFailed { username: String },

    /// The message VPN does not exist on this broker.
    #[error("unknown message VPN '{vpn}'")]
    UnknownVpn { vpn: String },

    /// Another connected client already uses this name.
    #[error("client name '{0}' is already in use")]
    ClientNameInUse(String),

    /// The requested client name is not a valid identity.
    #[error("invalid client name: {0}")]
    InvalidClientName(#[from] IdentityError),

    /// The broker could not be reached.
    #[error("broker unreachable at {host}: {reason}")]
    Unreachable { host: String, reason: String },
}

/// Errors adding a topic subscription.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The session is no longer connected.
    #[error("session is not connected")]
    NotConnected,

    /// No connected client carries the given name.
    #[error("unknown client '{0}'")]
    UnknownClient(ClientIdentity),

    /// The broker refused the subscription.
    #[error("subscription to '{topic}' rejected: {reason}")]
    Rejected { topic: String, reason: String },

    /// No confirmation arrived in time.
    #[error("subscription not confirmed within {0:?}")]
    Timeout(Duration),
}

/// Errors sending a message or a reply.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The session is no longer connected.
    #[error("session is not connected")]
    NotConnected,

    /// The original message carried no reply-to destination.
    #[error("message {0} has no reply-to destination")]
    NoReplyDestination(String),

    /// The destination is not a publishable topic.
    #[error("invalid destination '{0}'")]
    InvalidDestination(String),

    /// The send was not completed in time.
    #[error("send not completed within {0:?}")]
    Timeout(Duration),
}

/// Errors of a blocking request/reply exchange.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error(transparent)]
    Send(#[from] SendError),

    /// No reply arrived before the deadline.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The session went away while the request was pending.
    #[error("request cancelled")]
    Cancelled,
}

/// Topic strings that are not well-formed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopicError {
    #[error("topic is empty")]
    Empty,

    #[error("topic '{0}' contains an empty level")]
    EmptyLevel(String),

    #[error("topic '{0}' uses '>' before the last level")]
    MisplacedWildcard(String),

    #[error("topic '{0}' exceeds {1} bytes")]
    TooLong(String, usize),
}

/// Client names that cannot identify a broker client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("client name is empty")]
    Empty,

    #[error("client name exceeds {max} characters ({len})")]
    TooLong { len: usize, max: usize },

    #[error("client name contains a wildcard or control character")]
    IllegalCharacter,
}
