/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API integration (also used for LM Studio)
 * - Anthropic: Anthropic API integration
 * - Mock: Scripted provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::app_config::{ProviderConfig, TranslationCommonConfig, TranslationProvider};
use crate::errors::ProviderError;

/// A provider-neutral completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instruction (persona, language constraint, output format)
    pub system: String,
    /// User payload, the chunk text
    pub user: String,
    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature,
        }
    }
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be held in one ordered fallback list.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Identifier reported in translation records
    fn id(&self) -> &str;

    /// Complete a request, returning the raw model text
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

/// Build an HTTP client honoring the provider timeout and proxy settings
pub(crate) fn http_client(config: &ProviderConfig) -> Result<reqwest::Client, ProviderError> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90));

    if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| ProviderError::ConnectionError(format!("Invalid proxy '{}': {}", proxy, e)))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))
}

/// Instantiate the configured provider
pub fn build_provider(
    config: &ProviderConfig,
    common: &TranslationCommonConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let provider: Arc<dyn Provider> = match config.provider_type {
        TranslationProvider::Ollama => Arc::new(ollama::Ollama::from_config(config, common)?),
        TranslationProvider::OpenAI | TranslationProvider::LMStudio => {
            Arc::new(openai::OpenAI::from_config(config, common)?)
        }
        TranslationProvider::Anthropic => Arc::new(anthropic::Anthropic::from_config(config, common)?),
    };
    Ok(provider)
}

/// Spaces request starts to honor a requests-per-minute limit.
///
/// Each caller reserves the next free slot under the lock and sleeps outside
/// it, so concurrent chunks queue up instead of bursting.
#[derive(Debug)]
pub struct RequestPacer {
    interval: Duration,
    next_slot: tokio::sync::Mutex<Option<Instant>>,
}

impl RequestPacer {
    /// `None` when the limit is absent or zero
    pub fn per_minute(requests_per_minute: Option<u32>) -> Option<Self> {
        requests_per_minute.filter(|rpm| *rpm > 0).map(|rpm| Self {
            interval: Duration::from_millis(60_000 / rpm as u64),
            next_slot: tokio::sync::Mutex::new(None),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for this request's slot
    pub async fn wait(&self) {
        let start = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let start = match *next_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next_slot = Some(start + self.interval);
            start
        };
        tokio::time::sleep_until(start).await;
    }
}

/// Retry and pacing rule shared by every HTTP provider
#[derive(Debug)]
pub struct RetryPolicy {
    label: String,
    max_retries: u32,
    backoff_base_ms: u64,
    pacer: Option<RequestPacer>,
}

impl RetryPolicy {
    pub fn new(label: impl Into<String>, max_retries: u32, backoff_base_ms: u64, pacer: Option<RequestPacer>) -> Self {
        Self {
            label: label.into(),
            max_retries,
            backoff_base_ms,
            pacer,
        }
    }

    pub fn from_config(config: &ProviderConfig, common: &TranslationCommonConfig) -> Self {
        Self::new(
            config.display_id(),
            common.retry_count,
            common.retry_backoff_ms,
            RequestPacer::per_minute(config.rate_limit),
        )
    }

    pub fn pacer(&self) -> Option<&RequestPacer> {
        self.pacer.as_ref()
    }

    /// Run `attempt` until it succeeds, fails permanently or runs out of retries.
    ///
    /// Every attempt, retries included, waits for a pacer slot first. Backoff
    /// doubles from `backoff_base_ms` after each retryable failure.
    pub async fn run<F, Fut, T>(&self, mut attempt: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        let mut tries = 0u32;
        loop {
            if let Some(pacer) = &self.pacer {
                pacer.wait().await;
            }
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && tries < self.max_retries => {
                    tries += 1;
                    log::warn!(
                        "{} request failed: {} - attempt {}/{}",
                        self.label,
                        e,
                        tries,
                        self.max_retries + 1
                    );
                    let backoff_ms = self.backoff_base_ms.saturating_mul(1u64 << (tries - 1).min(16));
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Truncate a response body for log output
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

pub mod ollama;
pub mod openai;
pub mod anthropic;
pub mod mock;
