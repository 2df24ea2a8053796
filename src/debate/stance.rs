//! Topic and stance extraction for a new conversation
//!
//! The first user message is sent to the generation backend with a request
//! for a JSON object naming the topic and a stance that pushes back on the
//! user. The reply is untrusted text: [`parse_stance`] accepts it only if it
//! holds a well-formed object, and [`derive_stance`] substitutes
//! [`default_stance`] for anything else so a new conversation always starts.

use crate::conversation::DebateTopic;
use crate::llm::{LlmMessage, LlmRequest, LlmService};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

const EXTRACTION_PROMPT: &str = r#"You are a debate topic generator. Your job is to:

1. Identify the main topic of the user's message.
2. Commit to a defensible stance on that topic that opposes, or is clearly distinct from, the position the user implies.
3. List 3-5 persuasive arguments supporting that stance.

Rules:
- The stance must be debatable but never offensive or harmful.
- Arguments should be based on real talking points, even disputed ones.
- Keep the tone intellectual, not inflammatory.

Respond with ONLY a JSON object of this exact shape:
{"topic": "short name of the subject", "stance": "the position you will defend, as one clear sentence", "key_arguments": ["argument 1", "argument 2", "argument 3"]}"#;

const STANCE_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_TOPIC_CHARS: usize = 200;
const MAX_KEY_ARGUMENTS: usize = 5;

/// Why a backend reply could not be turned into a stance
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StanceParseError {
    #[error("response contains no JSON object")]
    NoJsonObject,
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("response is missing field `{0}`")]
    MissingField(&'static str),
}

#[derive(Deserialize)]
struct RawStance {
    #[serde(default, alias = "description")]
    topic: Option<String>,
    #[serde(default, alias = "title")]
    stance: Option<String>,
    #[serde(default)]
    key_arguments: Vec<serde_json::Value>,
}

/// The extraction request for a first message. Same input, same request.
pub fn extraction_request(message: &str) -> LlmRequest {
    LlmRequest::new(
        EXTRACTION_PROMPT,
        vec![LlmMessage::user(format!(
            "Generate a debate stance based on this message: {message}"
        ))],
    )
    .with_max_tokens(500)
    .with_temperature(0.8)
    .json()
}

/// Ask the backend for a topic and stance, falling back to
/// [`default_stance`] on any failure.
pub async fn derive_stance(message: &str, llm: &dyn LlmService) -> DebateTopic {
    let request = extraction_request(message);

    match timeout(STANCE_TIMEOUT, llm.complete(&request)).await {
        Ok(Ok(response)) => match parse_stance(&response.text) {
            Ok(debate) => debate,
            Err(e) => {
                tracing::warn!(error = %e, "Could not parse stance response, using default stance");
                default_stance(message)
            }
        },
        Ok(Err(e)) => {
            tracing::warn!(error = %e.message, "Stance generation failed, using default stance");
            default_stance(message)
        }
        Err(_) => {
            tracing::warn!("Stance generation timed out, using default stance");
            default_stance(message)
        }
    }
}

/// Parse a backend reply into a [`DebateTopic`].
///
/// The object may be wrapped in prose or a Markdown code fence; everything
/// between the first `{` and the last `}` is decoded. `topic` and `stance`
/// must be non-blank strings. Blank or non-string key arguments are dropped
/// and at most five are kept.
pub fn parse_stance(text: &str) -> Result<DebateTopic, StanceParseError> {
    let start = text.find('{').ok_or(StanceParseError::NoJsonObject)?;
    let end = text.rfind('}').ok_or(StanceParseError::NoJsonObject)?;
    let object = text
        .get(start..=end)
        .filter(|_| start < end)
        .ok_or(StanceParseError::NoJsonObject)?;

    let raw: RawStance =
        serde_json::from_str(object).map_err(|e| StanceParseError::InvalidJson(e.to_string()))?;

    let topic = non_blank(raw.topic).ok_or(StanceParseError::MissingField("topic"))?;
    let stance = non_blank(raw.stance).ok_or(StanceParseError::MissingField("stance"))?;
    let key_arguments = raw
        .key_arguments
        .into_iter()
        .filter_map(|value| match value {
            serde_json::Value::String(s) => non_blank(Some(s)),
            _ => None,
        })
        .take(MAX_KEY_ARGUMENTS)
        .collect();

    Ok(DebateTopic {
        topic,
        stance,
        key_arguments,
    })
}

/// Deterministic stance used when extraction fails
pub fn default_stance(message: &str) -> DebateTopic {
    let topic: String = message.trim().chars().take(MAX_TOPIC_CHARS).collect();
    let stance = format!(
        "The popular view on \"{topic}\" is mistaken, and the opposite position is the stronger one."
    );
    DebateTopic {
        topic,
        stance,
        key_arguments: Vec::new(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
