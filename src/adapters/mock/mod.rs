//! Mock implementations for testing.
//!
//! In-process stand-ins for the network and disk so tests run with no
//! external dependencies.
//!
//! - [`MockHttpClient`] answers HTTP requests from configured scripts
//! - [`MemoryStore`] backs persistence with fault injection and a
//!   write log

pub mod http;
pub mod kv;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use kv::MemoryStore;
