//! # Topics and Client Identities
//!
//! Topics are `/`-separated level strings. In a subscription pattern:
//!
//! - `*` as a whole level matches exactly one level; `abc*` matches one level
//!   starting with `abc`
//! - `>` as the last level matches one or more trailing levels
//!
//! ```text
//! bofa/rates/v1/bond/>            matches  bofa/rates/v1/bond/10y/912828YK0
//! bofa/rates/v1/subman/request/*  matches  bofa/rates/v1/subman/request/alice
//! bofa/rates/v1/subman/request/*  rejects  bofa/rates/v1/subman/request/alice/x
//! ```

use crate::error::{IdentityError, TopicError};
use crate::MAX_CLIENT_NAME_LEN;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest topic string accepted, in bytes.
pub const MAX_TOPIC_LEN: usize = 250;

/// A validated topic or subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Parse and validate a topic string.
    pub fn new(topic: impl Into<String>) -> Result<Self, TopicError> {
        let topic = topic.into();
        if topic.is_empty() {
            return Err(TopicError::Empty);
        }
        if topic.len() > MAX_TOPIC_LEN {
            return Err(TopicError::TooLong(topic, MAX_TOPIC_LEN));
        }

        let levels: Vec<&str> = topic.split('/').collect();
        if levels.iter().any(|level| level.is_empty()) {
            return Err(TopicError::EmptyLevel(topic));
        }
        let last = levels.len() - 1;
        if levels[..last].iter().any(|level| *level == ">") {
            return Err(TopicError::MisplacedWildcard(topic));
        }

        Ok(Self(topic))
    }

    /// The topic string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this pattern contains a wildcard level.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.0.ends_with("/>") || self.0 == ">" || self.0.split('/').any(|level| level.ends_with('*'))
    }

    /// Whether this pattern matches a concrete published topic.
    #[must_use]
    pub fn matches(&self, topic: &str) -> bool {
        topic_matches(&self.0, topic)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Topic {
    type Error = TopicError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check whether a subscription pattern matches a published topic.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_levels = pattern.split('/').peekable();
    let mut topic_levels = topic.split('/');

    while let Some(p) = pattern_levels.next() {
        if p == ">" && pattern_levels.peek().is_none() {
            return topic_levels.next().is_some();
        }

        let Some(t) = topic_levels.next() else {
            return false;
        };

        if let Some(prefix) = p.strip_suffix('*') {
            if !t.starts_with(prefix) {
                return false;
            }
            continue;
        }

        if p != t {
            return false;
        }
    }

    topic_levels.next().is_none()
}

/// Broker-level name of a connected client.
///
/// Not the application username: a control-plane caller may request
/// subscriptions for a client it does not own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Validate a client name.
    pub fn new(name: impl Into<String>) -> Result<Self, IdentityError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(IdentityError::Empty);
        }
        let len = name.chars().count();
        if len > MAX_CLIENT_NAME_LEN {
            return Err(IdentityError::TooLong {
                len,
                max: MAX_CLIENT_NAME_LEN,
            });
        }
        if name.chars().any(|c| c.is_control() || c == '*' || c == '>') {
            return Err(IdentityError::IllegalCharacter);
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ClientIdentity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClientIdentity> for String {
    fn from(id: ClientIdentity) -> Self {
        id.0
    }
}
