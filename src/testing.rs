//! Test doubles for the generation backend and the key-value service

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService, ResponseFormat};
use crate::store::{KeyValue, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const MOCK_TOPIC_JSON: &str = r#"{"topic":"Pineapple on pizza","stance":"Pineapple has no place on a pizza","key_arguments":["It makes the crust soggy","Sweetness drowns the tomato"]}"#;

// ============================================================================
// Mock generation backend
// ============================================================================

/// Scripted generation backend.
///
/// Queued responses are returned first. With an empty queue, JSON requests
/// get [`MOCK_TOPIC_JSON`] and text requests get a numbered rebuttal.
pub struct MockLlm {
    queued: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    failing: AtomicBool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            failing: AtomicBool::new(false),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call sleeps this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_response(&self, text: impl Into<String>) {
        self.queued
            .lock()
            .unwrap()
            .push_back(Ok(LlmResponse::text(text)));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.queued.lock().unwrap().push_back(Err(error));
    }

    /// Fail every unqueued call with a network error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmService for MockLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.queued.lock().unwrap().pop_front();
        if let Some(result) = queued {
            return result;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(LlmError::network("mock backend is down"));
        }

        let text = match request.response_format {
            ResponseFormat::JsonObject => MOCK_TOPIC_JSON.to_string(),
            ResponseFormat::Text => format!(
                "Rebuttal {n}: {} is simply wrong.",
                request.last_user_text().unwrap_or("that")
            ),
        };
        Ok(LlmResponse::text(text))
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Fault-injectable key-value service
// ============================================================================

/// In-process stand-in for Redis with switchable outages
pub struct FlakyKv {
    entries: Mutex<HashMap<String, (Vec<u8>, Option<Duration>)>>,
    down: AtomicBool,
    failing_sets: AtomicUsize,
    set_attempts: AtomicUsize,
}

impl FlakyKv {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            down: AtomicBool::new(false),
            failing_sets: AtomicUsize::new(0),
            set_attempts: AtomicUsize::new(0),
        }
    }

    /// Make every operation fail until switched back
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Fail only the next `n` writes
    pub fn fail_next_sets(&self, n: usize) {
        self.failing_sets.store(n, Ordering::SeqCst);
    }

    pub fn set_attempts(&self) -> usize {
        self.set_attempts.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.entries.lock().unwrap().get(key).and_then(|(_, ttl)| *ttl)
    }

    fn check_up(&self) -> StoreResult<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValue for FlakyKv {
    async fn ping(&self) -> StoreResult<()> {
        self.check_up()
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.check_up()?;
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        self.set_attempts.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        let pending_failure = self
            .failing_sets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if pending_failure {
            return Err(StoreError::Unavailable("write timed out".to_string()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_vec(), ttl));
        Ok(())
    }
}
