use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;
use url::Url;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language name or ISO code used in prompts
    pub source_language: String,

    /// Target language name or ISO code used in prompts
    pub target_language: String,

    /// Target language code (ISO 639-1 or 639-2)
    #[serde(default = "default_target_language_code")]
    pub target_language_code: String,

    /// Emit source and translation for every chunk
    #[serde(default)]
    pub bilingual_output: bool,

    /// Upper bound, in characters, of a chunk sent to a provider; required
    pub max_chunk_size: usize,

    /// Break assembled output lines after sentence terminators
    #[serde(default = "default_true")]
    pub sentence_line_breaks: bool,

    /// Document extraction settings
    #[serde(default)]
    pub document: DocumentConfig,

    /// Proper-noun substitution table settings
    #[serde(default)]
    pub glossary: GlossaryConfig,

    /// Translation config
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    // @returns: Whether the provider is a hosted API needing credentials
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

/// One entry of the ordered provider fallback list
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type
    #[serde(rename = "type")]
    pub provider_type: TranslationProvider,

    // @field: Identifier reported in translation records, defaults to type/model
    #[serde(default)]
    pub id: Option<String>,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key, several keys may be comma separated
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Optional HTTP proxy URL
    #[serde(default)]
    pub proxy: Option<String>,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        let (model, endpoint, timeout_secs, rate_limit) = match provider_type {
            TranslationProvider::Ollama => (
                default_ollama_model(),
                default_ollama_endpoint(),
                default_timeout_secs(),
                None,
            ),
            TranslationProvider::OpenAI => (
                default_openai_model(),
                default_openai_endpoint(),
                default_timeout_secs(),
                Some(60),
            ),
            TranslationProvider::Anthropic => (
                default_anthropic_model(),
                default_anthropic_endpoint(),
                default_anthropic_timeout_secs(),
                // Slightly below the published 50 requests per minute
                Some(45),
            ),
            TranslationProvider::LMStudio => (
                default_lmstudio_model(),
                default_lmstudio_endpoint(),
                default_timeout_secs(),
                None,
            ),
        };

        Self {
            provider_type,
            id: None,
            model,
            api_key: String::new(),
            endpoint,
            proxy: None,
            timeout_secs,
            rate_limit,
        }
    }

    /// Identifier used in logs and translation records
    pub fn display_id(&self) -> String {
        match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{}/{}", self.provider_type, self.get_model()),
        }
    }

    /// Get the model, falling back to the provider default
    pub fn get_model(&self) -> String {
        if !self.model.is_empty() {
            return self.model.clone();
        }
        match self.provider_type {
            TranslationProvider::Ollama => default_ollama_model(),
            TranslationProvider::OpenAI => default_openai_model(),
            TranslationProvider::Anthropic => default_anthropic_model(),
            TranslationProvider::LMStudio => default_lmstudio_model(),
        }
    }

    /// Get the endpoint, falling back to the provider default
    pub fn get_endpoint(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }
        match self.provider_type {
            TranslationProvider::Ollama => default_ollama_endpoint(),
            TranslationProvider::OpenAI => default_openai_endpoint(),
            TranslationProvider::Anthropic => default_anthropic_endpoint(),
            TranslationProvider::LMStudio => default_lmstudio_endpoint(),
        }
    }

    /// All configured API keys, split on commas
    pub fn api_keys(&self) -> Vec<String> {
        self.api_key
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Paginated source bounds
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DocumentConfig {
    /// First page to extract (1-based)
    #[serde(default = "default_start_page")]
    pub start_page: u32,

    /// Last page to extract, -1 for the last page of the document
    #[serde(default = "default_end_page")]
    pub end_page: i32,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            start_page: default_start_page(),
            end_page: default_end_page(),
        }
    }
}

/// Proper-noun substitution table settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GlossaryConfig {
    /// Path of the JSON substitution table
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Match terms case-sensitively
    #[serde(default)]
    pub case_sensitive: bool,
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Providers in fallback order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for translation
    /// Placeholders: {source_language}, {target_language}, {response_key}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// System prompt template for the refine pass
    /// Placeholders: {target_language}, {response_key}
    #[serde(default = "default_refine_prompt")]
    pub refine_prompt: String,

    /// Run the refine pass after every successful translation
    #[serde(default = "default_true")]
    pub refine: bool,

    /// Structured field the translate prompt asks for
    #[serde(default = "default_response_key")]
    pub response_key: String,

    /// Structured field the refine prompt asks for
    #[serde(default = "default_refine_response_key")]
    pub refine_response_key: String,

    /// Wrap the chunk text in a code fence in the user message
    #[serde(default)]
    pub fence_payload: bool,

    /// Retry count for failed requests against the same provider
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum number of chunks translated at once
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            refine_prompt: default_refine_prompt(),
            refine: true,
            response_key: default_response_key(),
            refine_response_key: default_refine_response_key(),
            fence_payload: false,
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            concurrent_requests: default_concurrent_requests(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to the `log` crate filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_target_language_code() -> String {
    "zh".to_string()
}

fn default_max_chunk_size() -> usize {
    1024
}

fn default_start_page() -> u32 {
    1
}

fn default_end_page() -> i32 {
    -1
}

fn default_concurrent_requests() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_anthropic_timeout_secs() -> u64 {
    180
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_response_key() -> String {
    "translation".to_string()
}

fn default_refine_response_key() -> String {
    "improved_text".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
    "http://localhost:1234/v1".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:latest".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set to the loaded model name in LM Studio
    "local-model".to_string()
}

fn default_system_prompt() -> String {
    crate::translation::prompts::PromptTemplate::BOOK_TRANSLATOR.to_string()
}

fn default_refine_prompt() -> String {
    crate::translation::prompts::PromptTemplate::BOOK_EDITOR.to_string()
}

// @parses: Endpoint that may omit the scheme, as Ollama hosts often do
fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url_str = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };
    let url = Url::parse(&url_str).map_err(|e| anyhow!("Invalid endpoint URL '{}': {}", endpoint, e))?;
    if url.host_str().is_none() {
        return Err(anyhow!("Endpoint URL '{}' has no host", endpoint));
    }
    Ok(url)
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.target_language_code)?;

        if self.target_language.trim().is_empty() {
            return Err(anyhow!("Target language must not be empty"));
        }

        if self.max_chunk_size == 0 {
            return Err(anyhow!("max_chunk_size must be greater than zero"));
        }

        if self.document.start_page == 0 {
            return Err(anyhow!("start_page is 1-based and must be at least 1"));
        }
        if self.document.end_page != -1 && (self.document.end_page as i64) < self.document.start_page as i64 {
            return Err(anyhow!(
                "end_page ({}) must be -1 or not smaller than start_page ({})",
                self.document.end_page,
                self.document.start_page
            ));
        }

        if self.translation.providers.is_empty() {
            return Err(anyhow!("At least one translation provider must be configured"));
        }

        for provider in &self.translation.providers {
            parse_endpoint(&provider.get_endpoint())?;
            if let Some(proxy) = provider.proxy.as_deref().filter(|p| !p.is_empty()) {
                Url::parse(proxy).map_err(|e| anyhow!("Invalid proxy URL '{}': {}", proxy, e))?;
            }
            if provider.provider_type.requires_api_key() && provider.api_keys().is_empty() {
                return Err(anyhow!(
                    "Translation API key is required for {} provider '{}'",
                    provider.provider_type.display_name(),
                    provider.display_id()
                ));
            }
        }

        let common = &self.translation.common;
        if common.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }
        if common.response_key.trim().is_empty() || common.refine_response_key.trim().is_empty() {
            return Err(anyhow!("Response keys must not be empty"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "English".to_string(),
            target_language: "Chinese".to_string(),
            target_language_code: default_target_language_code(),
            bilingual_output: true,
            max_chunk_size: default_max_chunk_size(),
            sentence_line_breaks: true,
            document: DocumentConfig::default(),
            glossary: GlossaryConfig::default(),
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            providers: vec![ProviderConfig::new(TranslationProvider::Ollama)],
            common: TranslationCommonConfig::default(),
        }
    }
}
