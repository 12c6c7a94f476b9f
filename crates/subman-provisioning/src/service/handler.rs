//! # Provisioning Handler
//!
//! Per inbound message:
//!
//! 1. Reject an empty attachment
//! 2. Decode `{username, clientName}`
//! 3. Validate the target client identity (the `clientName` field, never the sender)
//! 4. Ask the policy for the grant list
//! 5. Add each grant for the target, in order, waiting for confirmation
//! 6. Build the response from the grants that were confirmed
//! 7. Send it as the reply to the original message
//!
//! Steps 1-4 failing drops the message without a reply. A failed grant stops
//! further grants; the reply then lists only what was applied. Applied grants
//! are never rolled back and a failed reply is not retried.

use async_trait::async_trait;
use shared_bus::{BrokerSession, ClientIdentity, InboundMessage, SendError, SubscriptionError, Topic};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::codec;
use crate::domain::{GrantFailure, ProvisioningOutcome, ProvisioningState, SubscriptionResponse};
use crate::error::{DecodeError, ProvisioningError};
use crate::ports::{ProvisioningApi, SubscriptionPolicy};

/// Handles provisioning requests against one broker session.
///
/// Holds no per-request state; one instance serves concurrent invocations.
pub struct ProvisioningHandler {
    session: Arc<dyn BrokerSession>,
    policy: Arc<dyn SubscriptionPolicy>,
    call_timeout: Option<Duration>,
}

impl ProvisioningHandler {
    pub fn new(session: Arc<dyn BrokerSession>, policy: Arc<dyn SubscriptionPolicy>) -> Self {
        Self {
            session,
            policy,
            call_timeout: None,
        }
    }

    /// Bound every grant and reply call. A timeout counts as that call failing.
    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    async fn process(&self, message: &InboundMessage) -> ProvisioningOutcome {
        // Received
        if message.attachment().is_empty() {
            warn!(state = %ProvisioningState::Received, "Dropping request with empty payload");
            return ProvisioningOutcome::failed(ProvisioningState::Received, DecodeError::EmptyPayload);
        }

        let request = match codec::decode_request(message.attachment()) {
            Ok(request) => request,
            Err(e) => {
                warn!(state = %ProvisioningState::Received, error = %e, "Dropping undecodable request");
                return ProvisioningOutcome::failed(ProvisioningState::Received, e);
            }
        };

        // Decoded
        let requester = request.requester_username.as_str();
        let target = match request.target() {
            Ok(target) => target,
            Err(e) => {
                warn!(
                    state = %ProvisioningState::Decoded,
                    requester,
                    error = %e,
                    "Dropping request with invalid target"
                );
                return ProvisioningOutcome::failed(ProvisioningState::Decoded, e);
            }
        };

        let grants = match self.policy.resolve(requester, &target).await {
            Ok(grants) => grants,
            Err(e) => {
                warn!(
                    state = %ProvisioningState::Decoded,
                    requester,
                    client = %target,
                    policy = self.policy.name(),
                    error = %e,
                    "Policy refused request, not replying"
                );
                return ProvisioningOutcome::failed(ProvisioningState::Decoded, e);
            }
        };
        debug!(requester, client = %target, grants = grants.len(), "Policy resolved");

        // PolicyResolved
        let (response, grant_failure) = self.apply_grants(&target, grants).await;

        // SubscriptionsApplied
        let payload = match codec::encode_response(&response) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(client = %target, error = %e, "Failed to encode response");
                return ProvisioningOutcome::Failed {
                    last_state: ProvisioningState::SubscriptionsApplied,
                    error: ProvisioningError::Encode(e),
                    applied: response.granted_topics().to_vec(),
                };
            }
        };

        if let Err(e) = self.reply(message, payload).await {
            warn!(
                state = %ProvisioningState::SubscriptionsApplied,
                client = %target,
                applied = response.len(),
                error = %e,
                "Reply failed; granted subscriptions remain"
            );
            return ProvisioningOutcome::Failed {
                last_state: ProvisioningState::SubscriptionsApplied,
                error: ProvisioningError::Send(e),
                applied: response.granted_topics().to_vec(),
            };
        }

        info!(
            requester,
            client = %target,
            granted = response.len(),
            partial = grant_failure.is_some(),
            "Replied with granted subscriptions"
        );
        ProvisioningOutcome::Replied {
            target,
            response,
            grant_failure,
        }
    }

    /// Apply grants in order, stopping at the first failure.
    async fn apply_grants(
        &self,
        target: &ClientIdentity,
        grants: Vec<Topic>,
    ) -> (SubscriptionResponse, Option<GrantFailure>) {
        let mut response = SubscriptionResponse::new();
        for topic in grants {
            let call = self.session.subscribe_for_client(target, &topic, true);
            match bounded(self.call_timeout, call, SubscriptionError::Timeout).await {
                Ok(()) => {
                    debug!(client = %target, topic = %topic, "Granted subscription");
                    response.push(topic);
                }
                Err(error) => {
                    warn!(
                        state = %ProvisioningState::PolicyResolved,
                        client = %target,
                        topic = %topic,
                        applied = response.len(),
                        error = %error,
                        "Grant failed, skipping remaining grants"
                    );
                    return (response, Some(GrantFailure { topic, error }));
                }
            }
        }
        (response, None)
    }

    async fn reply(&self, message: &InboundMessage, payload: bytes::Bytes) -> Result<(), SendError> {
        let call = self.session.send_reply(message, payload);
        bounded(self.call_timeout, call, SendError::Timeout).await
    }
}

/// Await `call`, failing with `on_timeout(limit)` when a limit is set and exceeded.
async fn bounded<T, E>(
    limit: Option<Duration>,
    call: impl Future<Output = Result<T, E>>,
    on_timeout: fn(Duration) -> E,
) -> Result<T, E> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(on_timeout(limit))),
        None => call.await,
    }
}

#[async_trait]
impl ProvisioningApi for ProvisioningHandler {
    async fn on_inbound_message(&self, message: &InboundMessage) -> ProvisioningOutcome {
        let span = info_span!(
            "provision",
            message_id = %message.id,
            destination = %message.destination
        );
        self.process(message).instrument(span).await
    }
}
