//! Builds debate prompts and produces the bot's next turn

use crate::conversation::{Conversation, DebateTopic, Role, Turn};
use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmService};
use std::fmt::Write as _;
use thiserror::Error;

const REPLY_MAX_TOKENS: u32 = 300;
const REPLY_TEMPERATURE: f32 = 0.8;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("conversation {0} has no committed stance")]
    MissingStance(String),
    #[error("generation failed: {}", .0.message)]
    Generation(#[source] LlmError),
}

/// System instruction for an established debate
pub fn system_prompt(debate: &DebateTopic) -> String {
    let mut prompt = format!(
        "You are a stubborn but persuasive debater.\n\n\
         Topic: {}\n\
         Your stance: {}\n",
        debate.topic, debate.stance
    );

    if !debate.key_arguments.is_empty() {
        prompt.push_str("Arguments you can draw on:\n");
        for argument in &debate.key_arguments {
            let _ = writeln!(prompt, "- {argument}");
        }
    }

    prompt.push_str(
        "\nRules:\n\
         - Defend your stance in every reply. Never concede, never agree with the opposing view, and never soften your position.\n\
         - Stay on the topic above. If the user drifts, steer back to it.\n\
         - Answer the user's latest point directly, then counter it with your strongest argument.\n\
         - Be confident and witty but respectful; no insults.\n\
         - Keep replies under 150 words and end with a pointed question that challenges the user.",
    );
    prompt
}

/// Prompt for the next bot turn: the stance instruction, every prior turn in
/// order, then the new user message.
pub fn build_request(debate: &DebateTopic, history: &[Turn], message: &str) -> LlmRequest {
    let mut messages: Vec<LlmMessage> = history
        .iter()
        .map(|turn| match turn.role {
            Role::User => LlmMessage::user(turn.message.as_str()),
            Role::Bot => LlmMessage::assistant(turn.message.as_str()),
        })
        .collect();
    messages.push(LlmMessage::user(message));

    LlmRequest::new(system_prompt(debate), messages)
        .with_max_tokens(REPLY_MAX_TOKENS)
        .with_temperature(REPLY_TEMPERATURE)
}

/// Generate a reply and append the exchange.
///
/// The conversation is left untouched unless both turns can be appended.
pub async fn take_turn(
    conversation: &mut Conversation,
    message: &str,
    llm: &dyn LlmService,
) -> Result<(), ComposeError> {
    let debate = conversation
        .debate()
        .ok_or_else(|| ComposeError::MissingStance(conversation.id.clone()))?;
    let request = build_request(debate, conversation.turns(), message);

    let user = Turn::user(message);
    let response = llm.complete(&request).await.map_err(ComposeError::Generation)?;
    let reply = response.text.trim();
    if reply.is_empty() {
        return Err(ComposeError::Generation(LlmError::empty_response(
            "Backend returned a blank reply",
        )));
    }
    conversation.append_exchange(user, Turn::bot(reply));
    Ok(())
}
