/*!
 * Provider fallback and the translate/refine passes.
 *
 * `ProviderClient` walks an ordered list of providers. Each failure is logged
 * and the next provider is tried; the outcome is a tagged value, never an
 * error, so a chunk whose providers are all down is recorded as failed and
 * the run continues.
 */

use std::sync::Arc;

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::app_config::{ProviderConfig, TranslationCommonConfig};
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{self, CompletionRequest, Provider};
use super::extractor;
use super::prompts::{PromptTemplate, user_payload};

/// Result of translating one chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub source_text: String,
    pub translated_text: String,
    /// Id of the provider that answered, if any did
    pub provider_used: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

impl TranslationRecord {
    fn done(source_text: &str, translated_text: String, provider_used: Option<String>) -> Self {
        Self {
            source_text: source_text.to_string(),
            translated_text,
            provider_used,
            success: true,
            error: None,
        }
    }

    fn failed(source_text: &str, error: String) -> Self {
        Self {
            source_text: source_text.to_string(),
            translated_text: String::new(),
            provider_used: None,
            success: false,
            error: Some(error),
        }
    }
}

/// One provider's failure during a fallback walk
#[derive(Debug)]
pub struct ProviderFailure {
    pub provider_id: String,
    pub error: ProviderError,
}

/// Outcome of trying every provider in order
#[derive(Debug)]
pub enum ProviderOutcome {
    /// First provider that produced a usable answer, with the extracted value
    Ok { text: String, provider_id: String },
    /// Every provider failed, in attempt order
    AllFailed(Vec<ProviderFailure>),
}

impl ProviderOutcome {
    /// Summarize the failures for a record's error field
    pub fn describe_failures(failures: &[ProviderFailure]) -> String {
        if failures.is_empty() {
            return "No providers configured".to_string();
        }
        failures
            .iter()
            .map(|f| format!("{}: {}", f.provider_id, f.error))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Ordered provider list plus the prompt settings for both passes
#[derive(Debug, Clone)]
pub struct ProviderClient {
    providers: Vec<Arc<dyn Provider>>,
    system_prompt: PromptTemplate,
    refine_prompt: PromptTemplate,
    response_key: String,
    refine_response_key: String,
    fence_payload: bool,
    refine_enabled: bool,
    temperature: f32,
}

impl ProviderClient {
    /// Create a client over already-built providers
    pub fn new(providers: Vec<Arc<dyn Provider>>, common: &TranslationCommonConfig) -> Self {
        Self {
            providers,
            system_prompt: PromptTemplate::new(&common.system_prompt),
            refine_prompt: PromptTemplate::new(&common.refine_prompt),
            response_key: common.response_key.clone(),
            refine_response_key: common.refine_response_key.clone(),
            fence_payload: common.fence_payload,
            refine_enabled: common.refine,
            temperature: common.temperature,
        }
    }

    /// Build every configured provider, in configuration order
    pub fn from_config(
        configs: &[ProviderConfig],
        common: &TranslationCommonConfig,
    ) -> Result<Self, ProviderError> {
        let providers = configs
            .iter()
            .map(|config| providers::build_provider(config, common))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(providers, common))
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    /// Try each provider in order until one yields a non-empty value for `key`
    pub async fn attempt_all(&self, request: &CompletionRequest, key: &str) -> ProviderOutcome {
        let mut failures = Vec::new();

        for provider in &self.providers {
            let result = provider.complete(request).await.and_then(|raw| {
                let value = extractor::extract(&raw, key);
                if value.trim().is_empty() {
                    Err(ProviderError::EmptyResponse)
                } else {
                    Ok(value)
                }
            });

            match result {
                Ok(text) => {
                    return ProviderOutcome::Ok {
                        text,
                        provider_id: provider.id().to_string(),
                    };
                }
                Err(error) => {
                    warn!("Provider {} failed: {}", provider.id(), error);
                    failures.push(ProviderFailure {
                        provider_id: provider.id().to_string(),
                        error,
                    });
                }
            }
        }

        ProviderOutcome::AllFailed(failures)
    }

    /// Translate one chunk. Never fails; total failure yields `success == false`.
    pub async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> TranslationRecord {
        if text.trim().is_empty() {
            return TranslationRecord::done(text, String::new(), None);
        }

        let system = self.system_prompt.render(
            &source_label(source_lang),
            &language_utils::prompt_label(target_lang),
            &self.response_key,
        );
        let request = CompletionRequest::new(system, user_payload(text, self.fence_payload), self.temperature);

        match self.attempt_all(&request, &self.response_key).await {
            ProviderOutcome::Ok { text: translated, provider_id } => {
                debug!("Chunk translated by {}", provider_id);
                TranslationRecord::done(text, translated, Some(provider_id))
            }
            ProviderOutcome::AllFailed(failures) => {
                let error = ProviderOutcome::describe_failures(&failures);
                error!("All providers failed for chunk: {}", error);
                TranslationRecord::failed(text, error)
            }
        }
    }

    /// Polish an existing translation. Returns `text` unchanged if no provider answers.
    pub async fn refine(&self, text: &str, target_lang: &str) -> String {
        if !self.refine_enabled || text.trim().is_empty() {
            return text.to_string();
        }

        let system = self.refine_prompt.render(
            "",
            &language_utils::prompt_label(target_lang),
            &self.refine_response_key,
        );
        let request = CompletionRequest::new(system, user_payload(text, self.fence_payload), self.temperature);

        match self.attempt_all(&request, &self.refine_response_key).await {
            ProviderOutcome::Ok { text: refined, .. } => refined,
            ProviderOutcome::AllFailed(failures) => {
                warn!(
                    "Refine pass failed, keeping unrefined text: {}",
                    ProviderOutcome::describe_failures(&failures)
                );
                text.to_string()
            }
        }
    }
}

fn source_label(source_lang: &str) -> String {
    if source_lang.trim().is_empty() {
        "the source language".to_string()
    } else {
        language_utils::prompt_label(source_lang)
    }
}
