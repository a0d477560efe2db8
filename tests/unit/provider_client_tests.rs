/*!
 * Tests for ordered provider fallback
 */

use std::sync::Arc;

use bookwai::providers::mock::MockProvider;
use bookwai::providers::{CompletionRequest, Provider};
use bookwai::translation::{ProviderClient, ProviderOutcome};

use crate::common::{Reply, ScriptedProvider, common_config, translation_json};

fn client(providers: Vec<Arc<dyn Provider>>, refine: bool) -> ProviderClient {
    ProviderClient::new(providers, &common_config(refine))
}

#[tokio::test]
async fn test_translate_withPrimaryFailing_shouldMarkFallbackProvider() {
    let primary = Arc::new(ScriptedProvider::failing("primary"));
    let fallback = Arc::new(ScriptedProvider::answering("fallback", "X"));
    let client = client(vec![primary.clone() as Arc<dyn Provider>, fallback.clone()], false);

    let record = client.translate("Hello.", "en", "zh").await;

    assert!(record.success);
    assert_eq!(record.translated_text, "X");
    assert_eq!(record.provider_used.as_deref(), Some("fallback"));
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn test_translate_withPrimaryWorking_shouldNotCallFallback() {
    let primary = Arc::new(ScriptedProvider::answering("primary", "X"));
    let fallback = Arc::new(ScriptedProvider::answering("fallback", "Y"));
    let client = client(vec![primary.clone() as Arc<dyn Provider>, fallback.clone()], false);

    let record = client.translate("Hello.", "en", "zh").await;
    assert_eq!(record.provider_used.as_deref(), Some("primary"));
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn test_translate_withNoProviders_shouldReturnFailedRecord() {
    let record = client(Vec::new(), false).translate("Hello.", "en", "zh").await;
    assert!(!record.success);
    assert_eq!(record.error.as_deref(), Some("No providers configured"));
}

#[tokio::test]
async fn test_translate_withBlankExtraction_shouldFallThrough() {
    let blank = Arc::new(ScriptedProvider::answering("blank", "   "));
    let good = Arc::new(ScriptedProvider::answering("good", "ok"));
    let record = client(vec![blank as Arc<dyn Provider>, good], false).translate("Hello.", "en", "zh").await;
    assert_eq!(record.provider_used.as_deref(), Some("good"));
}

#[tokio::test]
async fn test_translate_withProseAnswer_shouldUseRawText() {
    let prose = Arc::new(ScriptedProvider::new(
        "prose",
        Vec::new(),
        Reply::Text("<think>hmm</think>Bonjour le monde.".to_string()),
    ));
    let record = client(vec![prose as Arc<dyn Provider>], false).translate("Hello world.", "en", "fr").await;
    assert!(record.success);
    assert_eq!(record.translated_text, "Bonjour le monde.");
}

#[tokio::test]
async fn test_refine_shouldPolishTranslatedValue() {
    let provider = Arc::new(ScriptedProvider::new(
        "p",
        vec![
            Reply::Text(translation_json("rough")),
            Reply::Text(r#"{"improved_text": "polished"}"#.to_string()),
        ],
        Reply::Fail,
    ));
    let client = client(vec![provider.clone() as Arc<dyn Provider>], true);

    let record = client.translate("Hello.", "en", "zh").await;
    let refined = client.refine(&record.translated_text, "zh").await;

    assert_eq!(refined, "polished");
    // The refine pass sees the translation, not the source
    assert_eq!(provider.requests()[1], "rough");
}

#[tokio::test]
async fn test_refine_withEveryProviderFailing_shouldReturnInputUnchanged() {
    let client = client(vec![Arc::new(ScriptedProvider::failing("a")) as Arc<dyn Provider>, Arc::new(MockProvider::failing())], true);
    assert_eq!(client.refine("unchanged", "zh").await, "unchanged");
}

#[tokio::test]
async fn test_attemptAll_withAllFailing_shouldListFailuresInOrder() {
    let client = client(
        vec![Arc::new(ScriptedProvider::failing("first")) as Arc<dyn Provider>, Arc::new(ScriptedProvider::failing("second"))],
        false,
    );
    let request = CompletionRequest::new("sys", "text", 0.0);

    match client.attempt_all(&request, "translation").await {
        ProviderOutcome::AllFailed(failures) => {
            let ids: Vec<&str> = failures.iter().map(|f| f.provider_id.as_str()).collect();
            assert_eq!(ids, vec!["first", "second"]);
        }
        ProviderOutcome::Ok { .. } => panic!("expected every provider to fail"),
    }
}

#[tokio::test]
async fn test_translate_withFencedPayload_shouldWrapChunk() {
    let provider = Arc::new(ScriptedProvider::answering("p", "X"));
    let mut common = common_config(false);
    common.fence_payload = true;
    let client = ProviderClient::new(vec![provider.clone() as Arc<dyn Provider>], &common);

    client.translate("Hello.", "en", "zh").await;
    assert_eq!(provider.requests()[0], "```\nHello.\n```");
}
