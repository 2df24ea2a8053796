//! Debate conversation record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Bot => write!(f, "bot"),
        }
    }
}

/// One message in a conversation. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn bot(message: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// The subject under debate and the side the bot committed to.
///
/// Topic and stance only ever exist together, so a conversation holds an
/// `Option<DebateTopic>` rather than two independent optional strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateTopic {
    pub topic: String,
    pub stance: String,
    #[serde(default)]
    pub key_arguments: Vec<String>,
}

/// A debate thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    debate: Option<DebateTopic>,
    #[serde(default)]
    turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returned when trying to re-commit a conversation's topic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("conversation {0} already has a committed stance")]
pub struct StanceAlreadySet(pub String);

impl Conversation {
    /// Fresh conversation with a generated id and no stance yet
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            debate: None,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn debate(&self) -> Option<&DebateTopic> {
        self.debate.as_ref()
    }

    pub fn topic(&self) -> Option<&str> {
        self.debate.as_ref().map(|d| d.topic.as_str())
    }

    pub fn stance(&self) -> Option<&str> {
        self.debate.as_ref().map(|d| d.stance.as_str())
    }

    /// Commit topic and stance. Allowed exactly once.
    pub fn commit_stance(&mut self, debate: DebateTopic) -> Result<(), StanceAlreadySet> {
        if self.debate.is_some() {
            return Err(StanceAlreadySet(self.id.clone()));
        }
        self.debate = Some(debate);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Append one exchange: the user's message followed by the bot's reply.
    pub fn append_exchange(&mut self, user: Turn, bot: Turn) {
        debug_assert_eq!(user.role, Role::User);
        debug_assert_eq!(bot.role, Role::Bot);
        self.updated_at = bot.created_at;
        self.turns.push(user);
        self.turns.push(bot);
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pizza() -> DebateTopic {
        DebateTopic {
            topic: "Pineapple on pizza".to_string(),
            stance: "Pineapple has no place on a pizza".to_string(),
            key_arguments: vec!["It makes the crust soggy".to_string()],
        }
    }

    #[test]
    fn test_new_conversation_is_unset() {
        let conv = Conversation::new();
        assert!(!conv.id.is_empty());
        assert!(uuid::Uuid::parse_str(&conv.id).is_ok());
        assert!(conv.topic().is_none());
        assert!(conv.stance().is_none());
        assert!(conv.turns().is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(Conversation::new().id, Conversation::new().id);
    }

    #[test]
    fn test_stance_commits_once() {
        let mut conv = Conversation::new();
        conv.commit_stance(pizza()).unwrap();
        assert_eq!(conv.topic(), Some("Pineapple on pizza"));
        assert_eq!(conv.stance(), Some("Pineapple has no place on a pizza"));

        let other = DebateTopic {
            topic: "Cats".to_string(),
            stance: "Dogs are better".to_string(),
            key_arguments: vec![],
        };
        assert_eq!(
            conv.commit_stance(other),
            Err(StanceAlreadySet(conv.id.clone()))
        );
        assert_eq!(conv.topic(), Some("Pineapple on pizza"));
    }

    #[test]
    fn test_append_exchange_orders_user_then_bot() {
        let mut conv = Conversation::new();
        conv.append_exchange(Turn::user("hello"), Turn::bot("no"));
        conv.append_exchange(Turn::user("why"), Turn::bot("because"));

        let roles: Vec<Role> = conv.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, [Role::User, Role::Bot, Role::User, Role::Bot]);
        assert_eq!(conv.turns()[2].message, "why");
    }

    #[test]
    fn test_json_roundtrip_preserves_everything() {
        let mut conv = Conversation::new();
        conv.commit_stance(pizza()).unwrap();
        conv.append_exchange(Turn::user("I love it"), Turn::bot("You shouldn't"));

        let json = serde_json::to_string(&conv).unwrap();
        assert!(json.contains(r#""role":"user""#));
        let back: Conversation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, conv);
    }
}
