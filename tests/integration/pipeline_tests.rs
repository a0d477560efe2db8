/*!
 * Orchestrated runs over scripted providers
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use bookwai::app_controller::{TextPreparation, translate_document};
use bookwai::errors::ProviderError;
use bookwai::providers::{CompletionRequest, Provider};
use bookwai::translation::{Chunk, ChunkState, MemoizationStore, OrchestratorOptions, segment};

use crate::common::{
    EchoProvider, InMemorySource, RecordingSink, Reply, ScriptedProvider, create_temp_dir, init_test_logging,
    orchestrator, translation_json,
};

/// Answers slower for lower-numbered chunks so completions arrive out of order
#[derive(Debug)]
struct ReverseDelayProvider;

#[async_trait]
impl Provider for ReverseDelayProvider {
    fn id(&self) -> &str {
        "reverse"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let digit = request
            .user
            .chars()
            .find_map(|c| c.to_digit(10))
            .unwrap_or(0) as u64;
        tokio::time::sleep(Duration::from_millis((8 - digit.min(8)) * 5)).await;
        Ok(translation_json(&format!("T{}", digit)))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Numbers its answers T1, T2, ... after a short delay
#[derive(Debug, Default)]
struct NumberingProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl Provider for NumberingProvider {
    fn id(&self) -> &str {
        "numbering"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(translation_json(&format!("T{}", n)))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_run_withStubProvider_shouldEmitOneLinePerChunk() {
    let dir = create_temp_dir().unwrap();
    let provider = Arc::new(ScriptedProvider::answering("stub", "X"));
    let (orchestrator, _) = orchestrator(
        vec![provider.clone() as Arc<dyn Provider>],
        &dir.path().join("book_process.json"),
        OrchestratorOptions::default(),
    )
    .unwrap();

    let output = orchestrator.run(segment("Hello. World.", 10)).await.unwrap();

    assert_eq!(output.text, "X\nX\n");
    assert_eq!(output.stats.translated, 2);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_run_withFailingPrimary_shouldRecordFallbackProvider() {
    let dir = create_temp_dir().unwrap();
    let (orchestrator, _) = orchestrator(
        vec![
            Arc::new(ScriptedProvider::failing("primary")) as Arc<dyn Provider>,
            Arc::new(ScriptedProvider::answering("fallback", "X")),
        ],
        &dir.path().join("p.json"),
        OrchestratorOptions::default(),
    )
    .unwrap();

    let output = orchestrator.run(segment("Hello.", 10)).await.unwrap();
    assert_eq!(output.outcomes[0].provider_used.as_deref(), Some("fallback"));
    assert_eq!(output.outcomes[0].state, ChunkState::Done);
}

#[tokio::test]
async fn test_run_bilingual_shouldInterleaveSourceAndTranslation() {
    let dir = create_temp_dir().unwrap();
    let options = OrchestratorOptions {
        bilingual: true,
        ..Default::default()
    };
    let (orchestrator, _) = orchestrator(
        vec![Arc::new(EchoProvider::default()) as Arc<dyn Provider>],
        &dir.path().join("p.json"),
        options,
    )
    .unwrap();

    let output = orchestrator.run(segment("A. B.", 3)).await.unwrap();
    assert_eq!(output.text, "A.\n<A.>\n B.\n< B.>\n");
}

#[tokio::test]
async fn test_run_twice_shouldServeSecondRunFromCache() {
    let dir = create_temp_dir().unwrap();
    let store_path = dir.path().join("p.json");
    let text = "First sentence. Second sentence. Third sentence.";

    let first_provider = Arc::new(EchoProvider::default());
    let (first, _) = orchestrator(
        vec![first_provider.clone() as Arc<dyn Provider>],
        &store_path,
        OrchestratorOptions::default(),
    )
    .unwrap();
    let first_output = first.run(segment(text, 20)).await.unwrap();

    let second_provider = Arc::new(EchoProvider::default());
    let (second, _) = orchestrator(
        vec![second_provider.clone() as Arc<dyn Provider>],
        &store_path,
        OrchestratorOptions::default(),
    )
    .unwrap();
    let second_output = second.run(segment(text, 20)).await.unwrap();

    assert_eq!(first_provider.calls(), 3);
    assert_eq!(second_provider.calls(), 0);
    assert_eq!(second_output.text, first_output.text);
    assert_eq!(second_output.stats.cached, 3);
}

#[tokio::test]
async fn test_run_afterInterruptedRun_shouldOnlyTranslateMissingChunks() {
    let dir = create_temp_dir().unwrap();
    let store_path = dir.path().join("p.json");
    let chunks = segment("One. Two. Three. Four. Five.", 6);
    assert_eq!(chunks.len(), 5);

    // Two chunks were flushed before the previous run died
    let earlier = MemoizationStore::load(&store_path).unwrap();
    for chunk in &chunks[..2] {
        earlier.put_and_flush(&chunk.text, "done before").await.unwrap();
    }
    drop(earlier);

    let provider = Arc::new(EchoProvider::default());
    let (orchestrator, store) = orchestrator(
        vec![provider.clone() as Arc<dyn Provider>],
        &store_path,
        OrchestratorOptions::default(),
    )
    .unwrap();
    let output = orchestrator.run(chunks).await.unwrap();

    assert_eq!(provider.calls(), 3);
    assert_eq!(output.stats.cached, 2);
    assert!(output.text.starts_with("done before\ndone before\n"));
    assert_eq!(store.len(), 5);
}

#[tokio::test]
async fn test_run_withPartialFailure_shouldRetryOnlyFailedChunksOnRerun() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let store_path = dir.path().join("p.json");
    let text = "One. Two. Three.";

    let flaky = Arc::new(ScriptedProvider::new(
        "flaky",
        vec![Reply::Text(translation_json("1")), Reply::Fail, Reply::Text(translation_json("3"))],
        Reply::Fail,
    ));
    let (first, _) = orchestrator(vec![flaky as Arc<dyn Provider>], &store_path, OrchestratorOptions::default()).unwrap();
    let first_output = first.run(segment(text, 6)).await.unwrap();
    assert_eq!(first_output.stats.failed, 1);
    assert_eq!(first_output.outcomes[1].state, ChunkState::Failed);
    assert_eq!(first_output.text, "1\n\n3\n");

    let healthy = Arc::new(ScriptedProvider::answering("healthy", "2"));
    let (second, _) = orchestrator(
        vec![healthy.clone() as Arc<dyn Provider>],
        &store_path,
        OrchestratorOptions::default(),
    )
    .unwrap();
    let second_output = second.run(segment(text, 6)).await.unwrap();

    assert_eq!(healthy.calls(), 1);
    assert_eq!(second_output.text, "1\n2\n3\n");
}

#[tokio::test]
async fn test_run_concurrently_shouldKeepSourceOrder() {
    let dir = create_temp_dir().unwrap();
    let options = OrchestratorOptions {
        concurrency: 4,
        ..Default::default()
    };
    let (orchestrator, _) = orchestrator(
        vec![Arc::new(ReverseDelayProvider) as Arc<dyn Provider>],
        &dir.path().join("p.json"),
        options,
    )
    .unwrap();

    let output = orchestrator.run(segment("S0. S1. S2. S3. S4. S5. S6. S7.", 4)).await.unwrap();

    assert_eq!(output.text, "T0\nT1\nT2\nT3\nT4\nT5\nT6\nT7\n");
    let indices: Vec<usize> = output.outcomes.iter().map(|o| o.index).collect();
    assert_eq!(indices, (0..8).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_run_concurrently_withRepeatedChunk_shouldMatchRerunOutput() {
    let dir = create_temp_dir().unwrap();
    let store_path = dir.path().join("p.json");
    let options = OrchestratorOptions {
        concurrency: 2,
        ..Default::default()
    };
    let repeated = || vec![Chunk::new(0, "Yes."), Chunk::new(1, "Yes.")];

    let first_provider = Arc::new(NumberingProvider::default());
    let (first, _) = orchestrator(vec![first_provider.clone() as Arc<dyn Provider>], &store_path, options.clone()).unwrap();
    let first_output = first.run(repeated()).await.unwrap();

    let second_provider = Arc::new(NumberingProvider::default());
    let (second, store) = orchestrator(vec![second_provider.clone() as Arc<dyn Provider>], &store_path, options).unwrap();
    let second_output = second.run(repeated()).await.unwrap();

    assert_eq!(first_provider.calls.load(Ordering::SeqCst), 2);
    assert_eq!(second_provider.calls.load(Ordering::SeqCst), 0);
    assert_eq!(first_output.outcomes[0].translated_text, first_output.outcomes[1].translated_text);
    assert_eq!(second_output.text, first_output.text);
    let stored = store.get("Yes.").unwrap();
    assert_eq!(first_output.text, format!("{}\n{}\n", stored, stored));
}

#[tokio::test]
async fn test_translateDocument_withChapters_shouldSkipEmptyAndLimitAcrossChapters() {
    let dir = create_temp_dir().unwrap();
    let provider = Arc::new(EchoProvider::default());
    let (mut orchestrator, _) = orchestrator(
        vec![provider.clone() as Arc<dyn Provider>],
        &dir.path().join("p.json"),
        OrchestratorOptions::default(),
    )
    .unwrap();
    let source = InMemorySource::new(&[("c1", "One. Two."), ("c2", "   "), ("c3", "Three. Four.")]);
    let preparation = TextPreparation {
        glossary: None,
        max_chunk_size: 5,
    };
    let mut sink = RecordingSink::default();

    let output = translate_document(&source, Some(&mut sink), &mut orchestrator, &preparation, Some(3))
        .await
        .unwrap();

    assert_eq!(provider.calls(), 3);
    assert_eq!(output.stats.total, 3);
    assert_eq!(output.text, "<One.>\n< Two.>\n<Three.>\n");

    let ids: Vec<&str> = sink.chapters.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c3"]);
    assert_eq!(sink.chapters[0].1.media, vec!["<img src=\"c1.png\">".to_string()]);
    assert_eq!(sink.chapters[1].1.text, "<Three.>\n");
}

#[tokio::test]
async fn test_translateDocument_withPlainSource_shouldNotTouchSink() {
    let dir = create_temp_dir().unwrap();
    let path = crate::common::create_test_file(dir.path(), "book.txt", "Plain. Text.").unwrap();
    let source = bookwai::document::open_source(&path, &Default::default()).unwrap();
    let (mut orchestrator, _) = orchestrator(
        vec![Arc::new(EchoProvider::default()) as Arc<dyn Provider>],
        &dir.path().join("p.json"),
        OrchestratorOptions::default(),
    )
    .unwrap();
    let preparation = TextPreparation {
        glossary: None,
        max_chunk_size: 100,
    };

    let output = translate_document(source.as_ref(), None, &mut orchestrator, &preparation, None)
        .await
        .unwrap();
    assert_eq!(output.text, "<Plain. Text.>\n");
}
