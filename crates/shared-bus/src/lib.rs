//! # Shared Bus - Broker Session Contract
//!
//! The subscription manager never talks to a broker directly. Everything it
//! needs from the transport goes through the traits in [`session`]:
//!
//! - **connect** with host, credentials and message VPN
//! - **subscribe** the session itself to a topic pattern
//! - **subscribe_for_client** on behalf of another connected client
//! - **send_reply** correlated to an inbound request
//!
//! Inbound messages and session-level signals are delivered asynchronously on
//! the channels of the [`BrokerConnection`] returned by `connect`.
//!
//! ```text
//! ┌──────────────┐  request/*   ┌──────────────┐  subscribe_for_client  ┌──────────────┐
//! │  Requester   │ ───────────→ │    Broker    │ ←───────────────────── │  Responder   │
//! │              │ ←─────────── │              │ ─────────────────────→ │              │
//! └──────────────┘    reply     └──────────────┘    inbound delivery    └──────────────┘
//! ```
//!
//! ## Loopback transport
//!
//! [`LoopbackBroker`] implements the contract in-process: topic routing with
//! `*` / `>` wildcards, per-client subscription sets, request/reply inboxes.
//! It backs the integration tests and the runtime's built-in transport.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod error;
pub mod loopback;
pub mod message;
pub mod pending;
pub mod session;
pub mod topic;

// Re-export main types
pub use error::{
    ConnectionError, IdentityError, RequestError, SendError, SubscriptionError, TopicError,
};
pub use loopback::{LoopbackBroker, LoopbackConnection, LoopbackSession};
pub use message::{
    InboundMessage, MessageId, SessionEvent, SessionProperties, SessionSignal, TransportError,
};
pub use pending::PendingReplies;
pub use session::{BrokerConnection, BrokerConnector, BrokerSession};
pub use topic::{topic_matches, ClientIdentity, Topic};

/// Maximum inbound messages buffered per client before publishers wait.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Longest client name the broker accepts.
pub const MAX_CLIENT_NAME_LEN: usize = 160;

/// Topic prefix of the per-client reply inbox.
pub const REPLY_TOPIC_PREFIX: &str = "#P2P";
