//! Recording broker session for unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use shared_bus::{
    BrokerSession, ClientIdentity, InboundMessage, MessageId, SendError, SubscriptionError, Topic,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Grant {
    pub client: String,
    pub topic: String,
    pub wait_for_confirm: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Reply {
    pub original: MessageId,
    pub payload: Bytes,
}

impl Reply {
    pub fn topics(&self) -> Vec<String> {
        crate::codec::decode_response(&self.payload).unwrap()
    }
}

/// Records every call; grants and replies can be made to fail or stall.
pub(crate) struct RecordingSession {
    name: ClientIdentity,
    connected: AtomicBool,
    pub subscriptions: Mutex<Vec<(String, bool)>>,
    pub grants: Mutex<Vec<Grant>>,
    pub replies: Mutex<Vec<Reply>>,
    grant_calls: AtomicUsize,
    /// 1-based index of the grant call that fails.
    fail_grant_at: Option<usize>,
    fail_send: bool,
    reject_subscribe: bool,
    grant_delay: Option<Duration>,
    pub disconnects: AtomicUsize,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            name: ClientIdentity::new("subman").unwrap(),
            connected: AtomicBool::new(true),
            subscriptions: Mutex::new(Vec::new()),
            grants: Mutex::new(Vec::new()),
            replies: Mutex::new(Vec::new()),
            grant_calls: AtomicUsize::new(0),
            fail_grant_at: None,
            fail_send: false,
            reject_subscribe: false,
            grant_delay: None,
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn failing_grant(mut self, call: usize) -> Self {
        self.fail_grant_at = Some(call);
        self
    }

    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    pub fn rejecting_subscribe(mut self) -> Self {
        self.reject_subscribe = true;
        self
    }

    pub fn slow_grants(mut self, delay: Duration) -> Self {
        self.grant_delay = Some(delay);
        self
    }

    pub fn grant_topics(&self) -> Vec<String> {
        self.grants.lock().iter().map(|g| g.topic.clone()).collect()
    }

    pub fn reply_count(&self) -> usize {
        self.replies.lock().len()
    }
}

#[async_trait]
impl BrokerSession for RecordingSession {
    fn client_name(&self) -> &ClientIdentity {
        &self.name
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn subscribe(&self, pattern: &Topic, wait_for_confirm: bool) -> Result<(), SubscriptionError> {
        if self.reject_subscribe {
            return Err(SubscriptionError::Rejected {
                topic: pattern.to_string(),
                reason: "permission denied".to_string(),
            });
        }
        self.subscriptions
            .lock()
            .push((pattern.to_string(), wait_for_confirm));
        Ok(())
    }

    async fn subscribe_for_client(
        &self,
        client: &ClientIdentity,
        topic: &Topic,
        wait_for_confirm: bool,
    ) -> Result<(), SubscriptionError> {
        let call = self.grant_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.grant_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_grant_at == Some(call) {
            return Err(SubscriptionError::Rejected {
                topic: topic.to_string(),
                reason: "subscription ACL".to_string(),
            });
        }
        self.grants.lock().push(Grant {
            client: client.to_string(),
            topic: topic.to_string(),
            wait_for_confirm,
        });
        Ok(())
    }

    async fn send_reply(&self, original: &InboundMessage, payload: Bytes) -> Result<(), SendError> {
        if self.fail_send {
            return Err(SendError::NotConnected);
        }
        self.replies.lock().push(Reply {
            original: original.id,
            payload,
        });
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// A request as the broker would deliver it.
pub(crate) fn request_message(id: u64, payload: &[u8]) -> InboundMessage {
    InboundMessage {
        id: MessageId::new(id),
        destination: "ns/rates/v1/subman/request/alice".to_string(),
        sender: Some(ClientIdentity::new("control-plane").unwrap()),
        reply_to: Some("#P2P/v:default/control-plane".to_string()),
        correlation_id: None,
        attachment: Bytes::copy_from_slice(payload),
    }
}
