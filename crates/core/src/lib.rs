//! Greenmile core domain logic.
//!
//! Pure, dependency-light building blocks shared by the repository and API
//! layers: the delivery status state machine, delay math, stats helpers,
//! the domain error type, and common type aliases. Nothing in this crate
//! touches the database or the network.

pub mod dispatch;
pub mod error;
pub mod stats;
pub mod types;
