use async_trait::async_trait;
use log::error;
use rand::seq::IndexedRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::{ProviderConfig, TranslationCommonConfig};
use crate::errors::ProviderError;
use super::{CompletionRequest, Provider, RetryPolicy, http_client};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic client for interacting with Anthropic API
#[derive(Debug)]
pub struct Anthropic {
    id: String,
    /// HTTP client for API requests
    client: Client,
    /// API keys for authentication, one is drawn per request
    api_keys: Vec<String>,
    /// API endpoint URL
    endpoint: String,
    model: String,
    /// Retry and rate limit rule
    retry: RetryPolicy,
}

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<AnthropicMessage>,

    /// System prompt to guide the AI
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    max_tokens: u32,
}

/// Anthropic message format
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

/// Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub content: Vec<AnthropicContent>,
}

/// Individual content block in an Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

impl AnthropicRequest {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: None,
            max_tokens,
        }
    }

    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(AnthropicMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl Anthropic {
    pub fn from_config(config: &ProviderConfig, common: &TranslationCommonConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            id: config.display_id(),
            client: http_client(config)?,
            api_keys: config.api_keys(),
            endpoint: config.get_endpoint(),
            model: config.get_model(),
            retry: RetryPolicy::from_config(config, common),
        })
    }

    fn api_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if base.ends_with("/v1/messages") {
            base.to_string()
        } else {
            format!("{}/v1/messages", base)
        }
    }

    /// Send a messages request, paced and retrying transient failures
    pub async fn messages(&self, request: &AnthropicRequest) -> Result<AnthropicResponse, ProviderError> {
        self.retry.run(|| self.messages_once(request)).await
    }

    async fn messages_once(&self, request: &AnthropicRequest) -> Result<AnthropicResponse, ProviderError> {
        let api_key = self.api_keys.choose(&mut rand::rng())
            .ok_or_else(|| ProviderError::AuthenticationError("No Anthropic API key configured".to_string()))?;

        let response = self.client.post(self.api_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Anthropic API error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        response.json::<AnthropicResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Anthropic API response: {}", e)))
    }

    /// Extract text from Anthropic response
    pub fn extract_text_from_response(response: &AnthropicResponse) -> String {
        response.content.iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

#[async_trait]
impl Provider for Anthropic {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let message = AnthropicRequest::new(&self.model, 4096)
            .system(&request.system)
            .add_message("user", &request.user)
            .temperature(request.temperature);

        let response = self.messages(&message).await?;
        let text = Self::extract_text_from_response(&response);
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = AnthropicRequest::new(&self.model, 10).add_message("user", "Hello");
        self.messages_once(&request).await.map(|_| ())
    }
}
