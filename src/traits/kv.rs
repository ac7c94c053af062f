//! Key-value persistence abstraction.
//!
//! The conversation store, credentials, and model preferences all
//! persist through this surface; implementations range from a
//! file-per-key store to the in-memory one used in tests.

use async_trait::async_trait;

/// Persistence failures
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Failed to read a value
    ReadFailed { key: String, message: String },
    /// Failed to write a value
    WriteFailed { key: String, message: String },
    /// Failed to remove a value
    RemoveFailed { key: String, message: String },
    /// Value exists but could not be encoded or decoded
    Serialization(String),
    /// Other error
    Other(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::ReadFailed { key, message } => {
                write!(f, "Failed to read '{}': {}", key, message)
            }
            StorageError::WriteFailed { key, message } => {
                write!(f, "Failed to write '{}': {}", key, message)
            }
            StorageError::RemoveFailed { key, message } => {
                write!(f, "Failed to remove '{}': {}", key, message)
            }
            StorageError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            StorageError::Other(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// String key-value storage.
///
/// Values are opaque strings; callers layer JSON on top where they
/// need structure. Reading an absent key is `Ok(None)`, not an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value; removing an absent key succeeds
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        assert_eq!(
            StorageError::ReadFailed {
                key: "conversations".to_string(),
                message: "permission denied".to_string()
            }
            .to_string(),
            "Failed to read 'conversations': permission denied"
        );
        assert_eq!(
            StorageError::WriteFailed {
                key: "api_key".to_string(),
                message: "disk full".to_string()
            }
            .to_string(),
            "Failed to write 'api_key': disk full"
        );
        assert_eq!(
            StorageError::Serialization("invalid json".to_string()).to_string(),
            "Serialization error: invalid json"
        );
    }

    #[test]
    fn test_storage_error_implements_error_trait() {
        let err = StorageError::Other("x".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
