//! Cross-crate flows: responder, policy and requesters on one loopback broker.

pub mod provisioning_flow;
pub mod session_events;
#[cfg(test)]
pub mod support;
