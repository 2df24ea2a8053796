//! Process-local conversation store

use super::{ConversationStore, StoreResult};
use crate::conversation::Conversation;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Conversations held in memory for the lifetime of the process
#[derive(Default)]
pub struct MemoryStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Conversation>> {
        Ok(self
            .conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned())
    }

    async fn save(&self, conversation: &Conversation) -> StoreResult<()> {
        self.conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }
}
