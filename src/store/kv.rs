//! Conversation store over a generic key-value service

use super::{ConversationStore, StoreError, StoreResult};
use crate::conversation::Conversation;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const KEY_PREFIX: &str = "conversation:";

/// Minimal key-value capability the durable store needs
#[async_trait]
pub trait KeyValue: Send + Sync {
    /// Check the service answers
    async fn ping(&self) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write a value, expiring it after `ttl` when given
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()>;
}

/// Conversations stored as JSON documents under `conversation:{id}`
pub struct KvStore {
    kv: Arc<dyn KeyValue>,
    ttl: Option<Duration>,
}

impl KvStore {
    pub fn new(kv: Arc<dyn KeyValue>, ttl: Option<Duration>) -> Self {
        Self { kv, ttl }
    }

    fn key(id: &str) -> String {
        format!("{KEY_PREFIX}{id}")
    }
}

#[async_trait]
impl ConversationStore for KvStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Conversation>> {
        let Some(bytes) = self.kv.get(&Self::key(id)).await? else {
            return Ok(None);
        };
        let conversation = serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(conv_id = %id, "Loaded conversation from durable store");
        Ok(Some(conversation))
    }

    async fn save(&self, conversation: &Conversation) -> StoreResult<()> {
        let bytes = serde_json::to_vec(conversation).map_err(|e| StoreError::Corrupt {
            id: conversation.id.clone(),
            reason: e.to_string(),
        })?;
        self.kv
            .set(&Self::key(&conversation.id), &bytes, self.ttl)
            .await?;
        tracing::debug!(
            conv_id = %conversation.id,
            turns = conversation.turns().len(),
            "Saved conversation to durable store"
        );
        Ok(())
    }
}
