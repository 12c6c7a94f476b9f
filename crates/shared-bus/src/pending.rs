//! Pending reply store for blocking request/reply.
//!
//! Maps request message ids to waiting requesters.

use crate::message::{InboundMessage, MessageId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A request waiting for its reply
struct PendingReply {
    /// Channel to hand the reply to
    sender: oneshot::Sender<InboundMessage>,
    /// When the request was sent
    created_at: Instant,
}

/// Counters for the pending store
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total requests registered
    pub total_registered: AtomicU64,
    /// Total replies handed over
    pub total_completed: AtomicU64,
    /// Total requests abandoned (timeout, disconnect, dropped receiver)
    pub total_cancelled: AtomicU64,
}

/// Pending reply store.
///
/// Flow:
/// 1. Requester calls `register()` with the id of the request it is about to send
/// 2. Requester publishes the request with its reply-to inbox
/// 3. The inbox router calls `complete()` when a reply with that correlation id lands
/// 4. Requester awaits the receiver or gives up after its timeout
#[derive(Default)]
pub struct PendingReplies {
    pending: DashMap<MessageId, PendingReply>,
    stats: PendingStats,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request and get a receiver for its reply.
    pub fn register(&self, request_id: MessageId) -> oneshot::Receiver<InboundMessage> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            request_id,
            PendingReply {
                sender: tx,
                created_at: Instant::now(),
            },
        );
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        debug!(request_id = %request_id, "Registered pending request");
        rx
    }

    /// Hand a reply to its waiting requester.
    ///
    /// Returns the reply back when nobody is waiting for it.
    pub fn complete(&self, reply: InboundMessage) -> Result<(), InboundMessage> {
        let Some(request_id) = reply.correlation_id else {
            return Err(reply);
        };
        let Some((_, pending)) = self.pending.remove(&request_id) else {
            warn!(request_id = %request_id, "Reply for unknown or expired request");
            return Err(reply);
        };

        let elapsed = pending.created_at.elapsed();
        match pending.sender.send(reply) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    request_id = %request_id,
                    response_time_ms = elapsed.as_millis(),
                    "Completed pending request"
                );
                Ok(())
            }
            Err(reply) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(request_id = %request_id, "Pending request receiver dropped");
                Err(reply)
            }
        }
    }

    /// Forget a request whose requester gave up.
    pub fn cancel(&self, request_id: MessageId) -> bool {
        let removed = self.pending.remove(&request_id).is_some();
        if removed {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Drop every waiting requester; their receivers observe cancellation.
    pub fn cancel_all(&self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        self.stats
            .total_cancelled
            .fetch_add(count as u64, Ordering::Relaxed);
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}
