//! API request and response types

use crate::conversation::{Conversation, Role, Turn};
use crate::store::StorageStatus;
use serde::{Deserialize, Serialize};

/// Body of `POST /conversation`
#[derive(Debug, Deserialize)]
pub struct ConversationRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One turn as returned to clients
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub role: Role,
    pub message: String,
}

impl From<&Turn> for MessageResponse {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            message: turn.message.clone(),
        }
    }
}

/// Conversation id plus the full history
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub messages: Vec<MessageResponse>,
}

impl From<&Conversation> for ConversationResponse {
    fn from(conversation: &Conversation) -> Self {
        Self {
            conversation_id: conversation.id.clone(),
            messages: conversation.turns().iter().map(MessageResponse::from).collect(),
        }
    }
}

/// Response for `GET /conversation/:id`
#[derive(Debug, Serialize)]
pub struct ConversationDetailResponse {
    pub conversation_id: String,
    pub topic: Option<String>,
    pub stance: Option<String>,
    pub messages: Vec<MessageResponse>,
}

impl From<&Conversation> for ConversationDetailResponse {
    fn from(conversation: &Conversation) -> Self {
        Self {
            conversation_id: conversation.id.clone(),
            topic: conversation.topic().map(str::to_string),
            stance: conversation.stance().map(str::to_string),
            messages: conversation.turns().iter().map(MessageResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage: StorageHealth,
    pub llm_model: String,
}

#[derive(Debug, Serialize)]
pub struct StorageHealth {
    pub configured: &'static str,
    pub active: &'static str,
    pub fallback: bool,
}

impl From<StorageStatus> for StorageHealth {
    fn from(status: StorageStatus) -> Self {
        Self {
            configured: status.configured.as_str(),
            active: status.active.as_str(),
            fallback: status.fallback,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
