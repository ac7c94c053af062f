//! Persistence facade over the key-value store.
//!
//! Everything the app keeps between runs goes through here: the
//! conversation state (one JSON document), the two provider
//! credentials, and the last model/provider selections. Writes are
//! write-through; callers persist after every completed mutation.

use std::sync::Arc;

use crate::models::{Provider, DEFAULT_MODEL};
use crate::store::ConversationState;
use crate::traits::{KeyValueStore, StorageError};

const CONVERSATIONS_KEY: &str = "conversations";
const API_KEY_KEY: &str = "api_key";
const PARALLEL_API_KEY_KEY: &str = "parallel_api_key";
const LAST_MODEL_KEY: &str = "last_model";
const LAST_PROVIDER_KEY: &str = "last_provider";

/// Typed accessors over the raw string store
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist the whole conversation state as one JSON document
    pub async fn save_conversations(&self, state: &ConversationState) -> Result<(), StorageError> {
        let json = serde_json::to_string(state)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.set(CONVERSATIONS_KEY, &json).await
    }

    /// Load the conversation state.
    ///
    /// A missing value is `Ok(None)`. A value that no longer parses is
    /// treated the same way, so a corrupted store starts fresh instead
    /// of wedging the app; the parse failure is logged.
    pub async fn load_conversations(&self) -> Result<Option<ConversationState>, StorageError> {
        let Some(json) = self.store.get(CONVERSATIONS_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                tracing::warn!(error = %e, "Stored conversations failed to parse, starting fresh");
                Ok(None)
            }
        }
    }

    pub async fn save_api_key(&self, api_key: &str) -> Result<(), StorageError> {
        self.store.set(API_KEY_KEY, api_key).await
    }

    pub async fn load_api_key(&self) -> Result<Option<String>, StorageError> {
        self.store.get(API_KEY_KEY).await
    }

    pub async fn clear_api_key(&self) -> Result<(), StorageError> {
        self.store.remove(API_KEY_KEY).await
    }

    pub async fn save_parallel_api_key(&self, api_key: &str) -> Result<(), StorageError> {
        self.store.set(PARALLEL_API_KEY_KEY, api_key).await
    }

    pub async fn load_parallel_api_key(&self) -> Result<Option<String>, StorageError> {
        self.store.get(PARALLEL_API_KEY_KEY).await
    }

    pub async fn clear_parallel_api_key(&self) -> Result<(), StorageError> {
        self.store.remove(PARALLEL_API_KEY_KEY).await
    }

    pub async fn save_last_model(&self, model: &str) -> Result<(), StorageError> {
        self.store.set(LAST_MODEL_KEY, model).await
    }

    /// Last selected model id, defaulting when unset
    pub async fn load_last_model(&self) -> Result<String, StorageError> {
        Ok(self
            .store
            .get(LAST_MODEL_KEY)
            .await?
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()))
    }

    pub async fn save_last_provider(&self, provider: Provider) -> Result<(), StorageError> {
        self.store.set(LAST_PROVIDER_KEY, &provider.to_string()).await
    }

    /// Last selected provider; unset and unrecognized values default
    pub async fn load_last_provider(&self) -> Result<Provider, StorageError> {
        Ok(self
            .store
            .get(LAST_PROVIDER_KEY)
            .await?
            .and_then(|name| Provider::from_name(&name))
            .unwrap_or_default())
    }

    /// Remove everything this facade ever wrote
    pub async fn clear_all(&self) -> Result<(), StorageError> {
        self.store.remove(CONVERSATIONS_KEY).await?;
        self.store.remove(API_KEY_KEY).await?;
        self.store.remove(PARALLEL_API_KEY_KEY).await?;
        self.store.remove(LAST_MODEL_KEY).await?;
        self.store.remove(LAST_PROVIDER_KEY).await?;
        Ok(())
    }
}

// ============= Storage Tests =============
