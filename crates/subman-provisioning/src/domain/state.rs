//! Per-message provisioning states and outcomes
//!
//! ```text
//! Received → Decoded → PolicyResolved → SubscriptionsApplied → Replied
//!     │          │             │                  │                │
//!     └──────────┴─────────────┴──────────────────┴────────────────┴──→ Failed
//! ```
//!
//! `PolicyResolved` is never a terminal `last_state`: a policy error leaves the
//! message in `Decoded`, and a failed grant still ends in `Replied`. The state
//! tags grant failures in the logs.
//!
//! No state survives the message it belongs to.

use shared_bus::{ClientIdentity, SubscriptionError, Topic};
use std::fmt;

use crate::domain::request::SubscriptionResponse;
use crate::error::ProvisioningError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisioningState {
    Received,
    Decoded,
    PolicyResolved,
    SubscriptionsApplied,
    Replied,
    Failed,
}

impl ProvisioningState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Decoded => "decoded",
            Self::PolicyResolved => "policy_resolved",
            Self::SubscriptionsApplied => "subscriptions_applied",
            Self::Replied => "replied",
            Self::Failed => "failed",
        }
    }

    /// Whether processing stops in this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Replied | Self::Failed)
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The grant call that stopped a request early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantFailure {
    pub topic: Topic,
    pub error: SubscriptionError,
}

/// How one inbound message ended.
#[derive(Debug)]
pub enum ProvisioningOutcome {
    /// A reply went out listing `response`. With `grant_failure` set, the
    /// listed topics are the subset applied before the failing grant.
    Replied {
        target: ClientIdentity,
        response: SubscriptionResponse,
        grant_failure: Option<GrantFailure>,
    },
    /// No reply was delivered. `applied` grants stay in effect.
    Failed {
        /// Last state reached before failing.
        last_state: ProvisioningState,
        error: ProvisioningError,
        applied: Vec<Topic>,
    },
}

impl ProvisioningOutcome {
    pub(crate) fn failed(last_state: ProvisioningState, error: impl Into<ProvisioningError>) -> Self {
        Self::Failed {
            last_state,
            error: error.into(),
            applied: Vec::new(),
        }
    }

    pub fn state(&self) -> ProvisioningState {
        match self {
            Self::Replied { .. } => ProvisioningState::Replied,
            Self::Failed { .. } => ProvisioningState::Failed,
        }
    }

    pub fn is_replied(&self) -> bool {
        matches!(self, Self::Replied { .. })
    }

    /// Replied, but with fewer topics than the policy resolved.
    pub fn is_partial(&self) -> bool {
        matches!(
            self,
            Self::Replied {
                grant_failure: Some(_),
                ..
            }
        )
    }

    /// Topics that were granted, whether or not the reply made it out.
    pub fn applied_topics(&self) -> &[Topic] {
        match self {
            Self::Replied { response, .. } => response.granted_topics(),
            Self::Failed { applied, .. } => applied,
        }
    }
}
