//! Concrete implementations of trait abstractions.
//!
//! Production adapters implement the traits in `crate::traits` so the
//! rest of the crate depends on seams rather than on reqwest or the
//! filesystem directly.
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`FileStore`] - one-file-per-key persistence on disk
//!
//! The [`mock`] submodule carries the matching test doubles.

pub mod file_kv;
pub mod mock;
pub mod reqwest_http;

pub use file_kv::FileStore;
pub use mock::{MemoryStore, MockHttpClient, MockResponse};
pub use reqwest_http::ReqwestHttpClient;
