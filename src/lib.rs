//! Trunky - a branching chat client core with streaming providers
//!
//! This library exposes modules for use in integration tests.

pub mod adapters;
pub mod client;
pub mod error;
pub mod models;
pub mod prelude;
pub mod providers;
pub mod reconciler;
pub mod relay;
pub mod session;
pub mod sse;
pub mod storage;
pub mod store;
pub mod traits;
