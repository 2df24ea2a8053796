//! Offline generation backend
//!
//! Answers without calling any provider so the service can run without an
//! API key. Topic requests cycle through a fixed set of controversial
//! positions; debate turns get a rebuttal assembled from stock phrases.

use super::types::{LlmRequest, LlmResponse, ResponseFormat};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const CANNED_MODEL_ID: &str = "canned";

struct CannedTopic {
    topic: &'static str,
    stance: &'static str,
    key_arguments: &'static [&'static str],
}

const TOPICS: &[CannedTopic] = &[
    CannedTopic {
        topic: "Whether the Earth is flat",
        stance: "The Earth is actually flat, not round",
        key_arguments: &[
            "The horizon always appears flat to the naked eye",
            "Nobody has ever felt the Earth spinning at 1000 mph",
            "Standing water always settles perfectly level",
        ],
    },
    CannedTopic {
        topic: "The 1969 moon landing",
        stance: "The 1969 moon landing was staged in a film studio",
        key_arguments: &[
            "No stars are visible in any of the landing photos",
            "The shadows suggest several light sources, like studio lamps",
            "The flag appears to ripple with no atmosphere to move it",
        ],
    },
    CannedTopic {
        topic: "Breakfast as a meal",
        stance: "Breakfast is the least important meal of the day",
        key_arguments: &[
            "Its reputation was built by cereal advertising",
            "Many people concentrate better on an empty stomach",
            "Skipping it is the easiest way to cut daily calories",
        ],
    },
    CannedTopic {
        topic: "Remote work",
        stance: "Remote work is making teams worse at what they do",
        key_arguments: &[
            "Juniors learn far less without overhearing seniors",
            "Spontaneous problem solving disappears over video calls",
            "Written-only communication breeds misunderstanding",
        ],
    },
    CannedTopic {
        topic: "Pineapple on pizza",
        stance: "Pineapple has no place on a pizza",
        key_arguments: &[
            "Its juice turns the crust soggy",
            "Sweet fruit overwhelms the balance of tomato and cheese",
            "No traditional Italian pizza has ever used it",
        ],
    },
];

const OPENERS: &[&str] = &[
    "I hear you, but I'm not moving an inch.",
    "That's exactly the argument I expected, and it doesn't hold up.",
    "With respect, you're looking at this the wrong way.",
    "Nice try, but the evidence is still on my side.",
    "I've considered that point, and it only strengthens my position.",
];

const CLOSERS: &[&str] = &[
    "What would it actually take to change your mind?",
    "Can you name a single fact that truly contradicts this?",
    "Isn't it worth asking who benefits from the usual story?",
    "Why do you think so many people never question it?",
];

/// Provider stand-in with no network I/O
#[derive(Default)]
pub struct CannedService {
    next_topic: AtomicUsize,
}

impl CannedService {
    pub fn new() -> Self {
        Self::default()
    }

    fn topic_json(&self) -> String {
        let index = self.next_topic.fetch_add(1, Ordering::Relaxed) % TOPICS.len();
        let topic = &TOPICS[index];
        serde_json::json!({
            "topic": topic.topic,
            "stance": topic.stance,
            "key_arguments": topic.key_arguments,
        })
        .to_string()
    }

    fn rebuttal(request: &LlmRequest) -> String {
        let mut rng = rand::thread_rng();
        let opener = OPENERS.choose(&mut rng).unwrap_or(&OPENERS[0]);
        let closer = CLOSERS.choose(&mut rng).unwrap_or(&CLOSERS[0]);
        let quoted = request
            .last_user_text()
            .map(|text| text.split_whitespace().take(12).collect::<Vec<_>>().join(" "))
            .unwrap_or_default();

        if quoted.is_empty() {
            format!("{opener} {closer}")
        } else {
            format!("{opener} You say \"{quoted}\", yet that misses the point entirely. {closer}")
        }
    }
}

#[async_trait]
impl LlmService for CannedService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let text = match request.response_format {
            ResponseFormat::JsonObject => self.topic_json(),
            ResponseFormat::Text => Self::rebuttal(request),
        };
        Ok(LlmResponse::text(text))
    }

    fn model_id(&self) -> &str {
        CANNED_MODEL_ID
    }
}
