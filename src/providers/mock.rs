/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with a JSON answer
 * - `MockProvider::intermittent()` - Fails every Nth request
 * - `MockProvider::failing()` - Always fails with an error
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, Provider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a `{"translation": ...}` answer
    Working,
    /// Answers with prose wrapped around the JSON object
    Chatty,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Fails the first N requests, then works
    FailFirst { failures: usize },
    /// Always fails with an error
    Failing,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout and ordering tests)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    id: String,
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&CompletionRequest) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            id: "mock".to_string(),
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn chatty() -> Self {
        Self::new(MockBehavior::Chatty)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    pub fn fail_first(failures: usize) -> Self {
        Self::new(MockBehavior::FailFirst { failures })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Rename the provider as it appears in records
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&CompletionRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of `complete` calls received so far
    pub fn calls(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Handle onto the call counter, still readable after the provider is moved
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.request_count)
    }

    /// Default answer: the payload tagged and wrapped in a translation object
    pub fn json_answer(text: &str) -> String {
        serde_json::json!({ "translation": format!("[TRANSLATED] {}", text) }).to_string()
    }

    fn answer(&self, request: &CompletionRequest) -> String {
        match self.custom_response {
            Some(generator) => generator(request),
            None => Self::json_answer(&request.user),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(self.answer(request)),

            MockBehavior::Chatty => Ok(format!(
                "<think>Translating carefully.</think>\nHere is the result:\n```json\n{}\n```\nLet me know!",
                self.answer(request)
            )),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.answer(request))
                }
            }

            MockBehavior::FailFirst { failures } => {
                if count < failures {
                    Err(ProviderError::ConnectionError(format!("Simulated outage (request #{})", count + 1)))
                } else {
                    Ok(self.answer(request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Empty => Err(ProviderError::EmptyResponse),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.answer(request))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated provider offline".to_string())),
            _ => Ok(()),
        }
    }
}
