//! Session lifecycle: one broker connection, one standing request
//! subscription, log-only handling of session events.

pub mod lifecycle;
pub mod monitor;

pub use lifecycle::{Credentials, SessionManager};
pub use monitor::SessionMonitor;
