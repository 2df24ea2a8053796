//! Debate service: the one path every conversation request goes through
//!
//! A request without a conversation id starts a debate (derive a stance,
//! generate the opening rebuttal, persist). A request with an id continues
//! one under that conversation's lock, so concurrent turns never interleave
//! or overwrite each other.

pub mod composer;
pub mod locks;
pub mod stance;

use crate::conversation::{Conversation, StanceAlreadySet};
use crate::llm::{LlmError, LlmService};
use crate::store::{ConversationStore, FallbackStore, StorageStatus, StoreError};
use composer::ComposeError;
use locks::ConversationLocks;
use std::sync::Arc;
use thiserror::Error;

/// Longest accepted user message, in characters
pub const MAX_MESSAGE_CHARS: usize = 1000;

#[derive(Debug, Error)]
pub enum DebateError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("message must be at most {MAX_MESSAGE_CHARS} characters")]
    MessageTooLong,
    #[error("invalid conversation id: {0}")]
    InvalidConversationId(String),
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),
    #[error("generation backend unavailable: {}", .0.message)]
    GenerationUnavailable(LlmError),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
    #[error("inconsistent conversation state: {0}")]
    Inconsistent(String),
}

impl From<ComposeError> for DebateError {
    fn from(e: ComposeError) -> Self {
        match e {
            ComposeError::Generation(e) => Self::GenerationUnavailable(e),
            ComposeError::MissingStance(id) => {
                Self::Inconsistent(format!("conversation {id} has no committed stance"))
            }
        }
    }
}

impl From<StanceAlreadySet> for DebateError {
    fn from(e: StanceAlreadySet) -> Self {
        Self::Inconsistent(e.to_string())
    }
}

pub struct DebateService {
    llm: Arc<dyn LlmService>,
    store: Arc<FallbackStore>,
    locks: ConversationLocks,
}

impl DebateService {
    pub fn new(llm: Arc<dyn LlmService>, store: Arc<FallbackStore>) -> Self {
        Self {
            llm,
            store,
            locks: ConversationLocks::new(),
        }
    }

    /// Handle one user message and return the conversation with the new
    /// exchange appended.
    ///
    /// A blank `conversation_id` is treated like an absent one.
    pub async fn converse(
        &self,
        conversation_id: Option<&str>,
        message: &str,
    ) -> Result<Conversation, DebateError> {
        let message = validate_message(message)?;
        match conversation_id.map(str::trim).filter(|id| !id.is_empty()) {
            None => self.start(message).await,
            Some(id) => {
                let id = parse_id(id)?;
                self.reply(&id, message).await
            }
        }
    }

    /// Look up a conversation without changing it
    pub async fn conversation(&self, id: &str) -> Result<Conversation, DebateError> {
        let id = parse_id(id)?;
        let found = self.store.get(&id).await?;
        found.ok_or(DebateError::ConversationNotFound(id))
    }

    pub fn storage_status(&self) -> StorageStatus {
        self.store.status()
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    async fn start(&self, message: &str) -> Result<Conversation, DebateError> {
        let mut conversation = Conversation::new();
        let debate = stance::derive_stance(message, self.llm.as_ref()).await;
        conversation.commit_stance(debate)?;

        composer::take_turn(&mut conversation, message, self.llm.as_ref()).await?;
        self.store.save(&conversation).await?;

        tracing::info!(
            conv_id = %conversation.id,
            topic = conversation.topic().unwrap_or_default(),
            stance = conversation.stance().unwrap_or_default(),
            "Started debate"
        );
        Ok(conversation)
    }

    async fn reply(&self, id: &str, message: &str) -> Result<Conversation, DebateError> {
        let _guard = self.locks.lock(id).await;

        let mut conversation = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| DebateError::ConversationNotFound(id.to_string()))?;

        composer::take_turn(&mut conversation, message, self.llm.as_ref()).await?;
        self.store.save(&conversation).await?;

        tracing::info!(
            conv_id = %conversation.id,
            turns = conversation.turns().len(),
            "Continued debate"
        );
        Ok(conversation)
    }
}

fn validate_message(message: &str) -> Result<&str, DebateError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(DebateError::EmptyMessage);
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(DebateError::MessageTooLong);
    }
    Ok(message)
}

/// Conversation ids are UUIDs; normalize to the hyphenated lowercase form
/// they are stored under.
fn parse_id(id: &str) -> Result<String, DebateError> {
    uuid::Uuid::parse_str(id)
        .map(|uuid| uuid.to_string())
        .map_err(|_| DebateError::InvalidConversationId(id.to_string()))
}
