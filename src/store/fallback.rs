//! Durable store with in-memory fallback

use super::{ConversationStore, MemoryStore, StoreError, StoreResult};
use crate::config::StorageBackend;
use crate::conversation::Conversation;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Storage status reported by `/health`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStatus {
    pub configured: StorageBackend,
    pub active: StorageBackend,
    pub fallback: bool,
}

/// Routes to the durable backend until it fails, then to memory for the
/// rest of the process lifetime.
///
/// Demotion is one-way. Conversations written to the durable backend before
/// the outage are not visible afterwards; every turn from then on is kept in
/// memory.
pub struct FallbackStore {
    configured: StorageBackend,
    durable: Option<Arc<dyn ConversationStore>>,
    memory: MemoryStore,
    degraded: AtomicBool,
}

impl FallbackStore {
    /// Memory only, as configured
    pub fn memory() -> Self {
        Self {
            configured: StorageBackend::Memory,
            durable: None,
            memory: MemoryStore::new(),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn durable(configured: StorageBackend, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            configured,
            durable: Some(store),
            memory: MemoryStore::new(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Durable backend configured but unreachable from the start
    pub fn degraded(configured: StorageBackend) -> Self {
        Self {
            configured,
            durable: None,
            memory: MemoryStore::new(),
            degraded: AtomicBool::new(true),
        }
    }

    pub fn status(&self) -> StorageStatus {
        let fallback = self.degraded.load(Ordering::Acquire);
        let active = if fallback || self.durable.is_none() {
            StorageBackend::Memory
        } else {
            self.configured
        };
        StorageStatus {
            configured: self.configured,
            active,
            fallback,
        }
    }

    /// Conversations currently held by the in-memory side
    pub fn memory_conversations(&self) -> usize {
        self.memory.conversation_count()
    }

    fn active_durable(&self) -> Option<&Arc<dyn ConversationStore>> {
        if self.degraded.load(Ordering::Acquire) {
            None
        } else {
            self.durable.as_ref()
        }
    }

    fn demote(&self, error: &StoreError) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            tracing::error!(
                backend = self.configured.as_str(),
                error = %error,
                "Durable store failed, switching to in-memory store for the rest of this process"
            );
        }
    }
}

#[async_trait]
impl ConversationStore for FallbackStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Conversation>> {
        if let Some(durable) = self.active_durable() {
            match durable.get(id).await {
                Err(e) if e.is_unavailable() => self.demote(&e),
                other => return other,
            }
        }
        self.memory.get(id).await
    }

    async fn save(&self, conversation: &Conversation) -> StoreResult<()> {
        if let Some(durable) = self.active_durable() {
            match durable.save(conversation).await {
                Err(e) if e.is_unavailable() => {
                    tracing::warn!(
                        conv_id = %conversation.id,
                        error = %e,
                        "Durable save failed, retrying once"
                    );
                    match durable.save(conversation).await {
                        Err(e) if e.is_unavailable() => self.demote(&e),
                        other => return other,
                    }
                }
                other => return other,
            }
        }
        self.memory.save(conversation).await
    }
}
