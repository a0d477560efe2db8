use async_trait::async_trait;
use log::error;
use rand::seq::IndexedRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::{ProviderConfig, TranslationCommonConfig};
use crate::errors::ProviderError;
use super::{CompletionRequest, Provider, RetryPolicy, http_client};

/// Client for OpenAI-compatible chat completion APIs (OpenAI, LM Studio)
#[derive(Debug)]
pub struct OpenAI {
    id: String,
    client: Client,
    /// Candidate keys, one is drawn per request
    api_keys: Vec<String>,
    endpoint: String,
    model: String,
    retry: RetryPolicy,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl OpenAI {
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
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{}/chat/completions", base)
        }
    }

    fn pick_key(&self) -> Option<&str> {
        self.api_keys.choose(&mut rand::rng()).map(String::as_str)
    }

    /// Send one chat request, paced and retrying transient failures
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.retry.run(|| self.chat_once(request)).await
    }

    async fn chat_once(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut builder = self.client.post(self.api_url()).json(request);
        if let Some(key) = self.pick_key() {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("{} API error ({}): {}", self.id, status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        response.json::<ChatResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse chat completion response: {}", e)))
    }

    /// Extract the assistant text from a response
    pub fn extract_text_from_response(response: &ChatResponse) -> String {
        response.choices.first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Provider for OpenAI {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let chat = ChatRequest::new(&self.model)
            .add_message("system", &request.system)
            .add_message("user", &request.user)
            .temperature(request.temperature);

        let response = self.chat(&chat).await?;
        let text = Self::extract_text_from_response(&response);
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = ChatRequest::new(&self.model)
            .add_message("user", "Hello")
            .max_tokens(5);
        self.chat_once(&request).await.map(|_| ())
    }
}
