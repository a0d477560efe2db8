/*!
 * Tests for configuration loading and validation
 */

use bookwai::app_config::{Config, ProviderConfig, TranslationProvider};

#[test]
fn test_config_roundTripThroughJson_shouldKeepProviderOrder() {
    let mut config = Config::default();
    let mut openai = ProviderConfig::new(TranslationProvider::OpenAI);
    openai.api_key = "sk-test".to_string();
    openai.id = Some("cloud".to_string());
    config.translation.providers.push(openai);

    let json = serde_json::to_string_pretty(&config).unwrap();
    let restored: Config = serde_json::from_str(&json).unwrap();

    let ids: Vec<String> = restored.translation.providers.iter().map(|p| p.display_id()).collect();
    assert_eq!(ids, vec!["ollama/llama3.1:latest".to_string(), "cloud".to_string()]);
}

#[test]
fn test_config_validate_withoutProviders_shouldFail() {
    let mut config = Config::default();
    config.translation.providers.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validate_withInvalidLanguageCode_shouldFail() {
    let config = Config {
        target_language_code: "not-a-code".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validate_withZeroConcurrency_shouldFail() {
    let mut config = Config::default();
    config.translation.common.concurrent_requests = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_deserialize_withProxyAndKeys_shouldParse() {
    let json = r#"{
        "source_language": "en",
        "target_language": "zh",
        "bilingual_output": false,
        "max_chunk_size": 300,
        "translation": {
            "providers": [
                { "type": "anthropic", "api_key": "k1,k2", "proxy": "http://127.0.0.1:8080" },
                { "type": "lmstudio" }
            ],
            "common": { "refine": false, "concurrent_requests": 2 }
        }
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert!(config.validate().is_ok());
    assert_eq!(config.translation.providers[0].api_keys().len(), 2);
    assert_eq!(config.translation.providers[0].proxy.as_deref(), Some("http://127.0.0.1:8080"));
    assert_eq!(config.translation.providers[1].get_endpoint(), "http://localhost:1234/v1");
    assert!(!config.translation.common.refine);
    assert_eq!(config.translation.common.concurrent_requests, 2);
}
