//! Session event monitor
//!
//! Records and logs asynchronous session events and transport errors. Nothing
//! here reconnects: a session that went down stays down until the process is
//! restarted.

use parking_lot::RwLock;
use shared_bus::{SessionEvent, SessionSignal, TransportError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{error, info, warn};

#[derive(Debug, Default)]
pub struct SessionMonitor {
    last_event: RwLock<Option<SessionEvent>>,
    last_error: RwLock<Option<TransportError>>,
    events: AtomicU64,
    errors: AtomicU64,
    down: AtomicBool,
}

impl SessionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_signal(&self, signal: SessionSignal) {
        match signal {
            SessionSignal::Event(event) => self.on_session_event(event),
            SessionSignal::Error(err) => self.on_transport_error(err),
        }
    }

    /// Connection state change reported by the transport.
    pub fn on_session_event(&self, event: SessionEvent) {
        self.events.fetch_add(1, Ordering::Relaxed);
        match &event {
            SessionEvent::Up | SessionEvent::Reconnected => {
                self.down.store(false, Ordering::Release);
                info!(event = %event, "Session event");
            }
            SessionEvent::Reconnecting => info!(event = %event, "Session event"),
            SessionEvent::Down { .. } => {
                self.down.store(true, Ordering::Release);
                warn!(event = %event, "Session down; no automatic reconnection");
            }
            SessionEvent::FlowError { .. } => warn!(event = %event, "Session flow error"),
        }
        *self.last_event.write() = Some(event);
    }

    /// Session-level error. Never fatal to the process.
    pub fn on_transport_error(&self, err: TransportError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        error!(error = %err, "Transport error");
        *self.last_error.write() = Some(err);
    }

    pub fn last_event(&self) -> Option<SessionEvent> {
        self.last_event.read().clone()
    }

    pub fn last_error(&self) -> Option<TransportError> {
        self.last_error.read().clone()
    }

    pub fn event_count(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Whether the last connection event was a disconnect.
    pub fn is_down(&self) -> bool {
        self.down.load(Ordering::Acquire)
    }
}
