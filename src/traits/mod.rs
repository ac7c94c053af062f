//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP operations (GET, POST, streaming POST)
//! - [`KeyValueStore`] - string key-value persistence

pub mod http;
pub mod kv;

pub use http::{BytesStream, Headers, HttpClient, HttpError, Response};
pub use kv::{KeyValueStore, StorageError};
