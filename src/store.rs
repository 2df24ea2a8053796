//! Conversation persistence
//!
//! Two backends sit behind [`ConversationStore`]: a durable key-value service
//! and a process-local map. [`FallbackStore`] picks one at startup and demotes
//! to memory when the durable side stops answering.

mod fallback;
mod kv;
mod memory;
mod redis_kv;

pub use fallback::{FallbackStore, StorageStatus};
pub use kv::{KeyValue, KvStore};
pub use memory::MemoryStore;
pub use redis_kv::RedisKv;

use crate::config::{StorageBackend, StorageConfig};
use crate::conversation::Conversation;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt record for conversation {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

impl StoreError {
    /// Whether the failure means the backend itself is unreachable
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for conversation records
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetch a conversation by id
    async fn get(&self, id: &str) -> StoreResult<Option<Conversation>>;

    /// Insert or replace a conversation
    async fn save(&self, conversation: &Conversation) -> StoreResult<()>;
}

/// Build the configured store. Never fails: an unreachable durable backend
/// yields a store already running on its in-memory fallback.
pub async fn open(config: &StorageConfig) -> FallbackStore {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory conversation store");
            FallbackStore::memory()
        }
        StorageBackend::Redis => match RedisKv::connect(&config.redis_url).await {
            Ok(kv) => {
                tracing::info!(url = %config.redis_url, "Connected to Redis conversation store");
                FallbackStore::durable(
                    StorageBackend::Redis,
                    Arc::new(KvStore::new(Arc::new(kv), config.ttl)),
                )
            }
            Err(e) => {
                tracing::warn!(
                    url = %config.redis_url,
                    error = %e,
                    "Redis unreachable at startup, falling back to in-memory store"
                );
                FallbackStore::degraded(StorageBackend::Redis)
            }
        },
    }
}
