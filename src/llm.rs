//! Generation backend abstraction
//!
//! The debate core only needs "complete this prompt"; providers live behind
//! [`LlmService`].

mod canned;
mod error;
mod openai;
mod types;

pub use canned::CannedService;
pub use error::LlmError;
#[cfg(test)]
pub use error::LlmErrorKind;
pub use openai::OpenAIService;
pub use types::*;

use crate::config::{LlmBackend, LlmConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for generation providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Build the configured provider, wrapped with request logging
pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn LlmService>, LlmError> {
    let inner: Arc<dyn LlmService> = match &config.backend {
        LlmBackend::OpenAI { api_key } => Arc::new(OpenAIService::new(
            api_key.clone(),
            config.model.clone(),
            &config.base_url,
            config.timeout,
        )?),
        LlmBackend::Canned => Arc::new(CannedService::new()),
    };
    Ok(Arc::new(LoggingService::new(inner)))
}

/// Logging wrapper for generation providers
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    history_len = request.messages.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    retryable = e.kind.is_retryable(),
                    "LLM request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
