//! # Subscription Manager Test Suite
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs            # broker + responder fixtures
//!     ├── provisioning_flow.rs  # request → grants → reply, over the loopback broker
//!     └── session_events.rs     # disconnects and transport errors
//! ```
//!
//! ```bash
//! cargo test -p subman-tests
//! cargo test -p subman-tests integration::provisioning_flow
//! ```

pub mod integration;
