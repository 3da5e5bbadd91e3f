//! Scenario tests for the portal session.
//!
//! - `harness.rs`    - fake transport, recording navigator, manual clock
//! - `login.rs`      - method selection, validation and submission
//! - `authorizer.rs` - credentialing, proactive and reactive refresh
//! - `refresh.rs`    - single-flight refresh and write-after-clear
//! - `logout.rs`     - idempotent logout and remote termination
//! - `idle.rs`       - idle countdown against a paused clock

mod authorizer;
mod idle;
