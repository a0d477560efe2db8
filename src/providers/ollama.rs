use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::{ProviderConfig, TranslationCommonConfig};
use crate::errors::ProviderError;
use super::{CompletionRequest, Provider, RetryPolicy, http_client, preview};

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Identifier for records and logs
    id: String,
    /// Base URL of the Ollama API
    base_url: String,
    /// Model name
    model: String,
    /// HTTP client for making requests
    client: Client,
    /// Retry and rate limit rule
    retry: RetryPolicy,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: Some(false),
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }
}

/// Build the base URL from a host that may lack a scheme or port
fn normalize_base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

impl Ollama {
    /// Create a new Ollama client from a provider entry
    pub fn from_config(config: &ProviderConfig, common: &TranslationCommonConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            id: config.display_id(),
            base_url: normalize_base_url(&config.get_endpoint()),
            model: config.get_model(),
            client: http_client(config)?,
            retry: RetryPolicy::from_config(config, common),
        })
    }

    /// Generate text from the Ollama API with retry logic
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        self.retry.run(|| self.generate_once(&url, request)).await
    }

    async fn generate_once(&self, url: &str, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let response = self.client.post(url)
            .json(request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let response_text = response.text().await.map_err(ProviderError::from_transport)?;
        parse_generation_response(&response_text)
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self.client.get(&url)
            .send()
            .await
            .map_err(ProviderError::from_transport)?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Ollama version response: {}", e)))?;

        response["version"].as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

/// Parse a generate response, accepting both single objects and JSONL streams
pub fn parse_generation_response(response_text: &str) -> Result<GenerationResponse, ProviderError> {
    if let Ok(parsed) = serde_json::from_str::<GenerationResponse>(response_text) {
        return Ok(parsed);
    }

    debug!("Ollama response is not a single object, trying JSONL: {}", preview(response_text, 500));

    // Streaming responses arrive as one JSON object per line
    let mut full_response = String::new();
    let mut last: Option<serde_json::Value> = None;
    for line in response_text.lines().filter(|l| !l.trim().is_empty()) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
            if let Some(part) = value.get("response").and_then(|v| v.as_str()) {
                full_response.push_str(part);
            }
            last = Some(value);
        }
    }

    match last {
        Some(value) => Ok(GenerationResponse {
            model: value.get("model").and_then(|v| v.as_str()).unwrap_or("unknown").to_string(),
            response: full_response,
            done: true,
            prompt_eval_count: value.get("prompt_eval_count").and_then(|v| v.as_u64()),
            eval_count: value.get("eval_count").and_then(|v| v.as_u64()),
        }),
        None => Err(ProviderError::ParseError(format!(
            "Ollama response contains invalid JSON: {}",
            preview(response_text, 200)
        ))),
    }
}

#[async_trait]
impl Provider for Ollama {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let generation = GenerationRequest::new(&self.model, &request.user)
            .system(&request.system)
            .temperature(request.temperature);

        let response = self.generate(&generation).await?;
        if response.response.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(response.response)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.version().await.map(|_| ())
    }
}
