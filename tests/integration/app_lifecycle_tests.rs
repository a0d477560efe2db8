/*!
 * Controller runs against files on disk
 */

use std::fs;

use bookwai::app_config::{Config, ProviderConfig, TranslationProvider};
use bookwai::app_controller::{Controller, RunOptions};
use bookwai::file_utils::FileManager;

use crate::common::{common_config, create_temp_dir, create_test_file, init_test_logging};

/// Config whose only provider refuses connections immediately
fn unreachable_config() -> Config {
    let mut provider = ProviderConfig::new(TranslationProvider::Ollama);
    provider.endpoint = "http://127.0.0.1:9".to_string();
    provider.timeout_secs = 2;

    let mut config = Config::default();
    config.translation.providers = vec![provider];
    config.translation.common = common_config(false);
    config
}

#[tokio::test]
async fn test_run_withUnsupportedFormat_shouldFailBeforeCreatingCache() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "book.epub", "binary").unwrap();
    let controller = Controller::with_config(unreachable_config()).unwrap();

    let result = controller.run(&input, RunOptions::default()).await;

    assert!(result.is_err());
    assert!(!FileManager::file_exists(FileManager::cache_path(&input)));
    assert!(!FileManager::file_exists(FileManager::text_output_path(&input)));
}

#[tokio::test]
async fn test_run_withUnreachableProvider_shouldWriteOutputAndKeepCache() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "book.txt", "Hello. World.").unwrap();
    let mut config = unreachable_config();
    config.bilingual_output = true;
    config.sentence_line_breaks = false;
    config.max_chunk_size = 10;
    let controller = Controller::with_config(config).unwrap();
    init_test_logging();

    let summary = controller.run(&input, RunOptions::default()).await.unwrap();

    assert_eq!(summary.stats.total, 2);
    assert_eq!(summary.stats.failed, 2);
    assert!(summary.cache_kept);
    assert!(summary.document_output.is_none());

    // Failed chunks keep their source lines in bilingual output
    let text = fs::read_to_string(&summary.text_output).unwrap();
    assert_eq!(text, "Hello.\n\n World.\n\n");
    assert_eq!(summary.text_output, dir.path().join("book_translated.txt"));
}

#[tokio::test]
async fn test_run_inTestMode_shouldStopAfterThreeChunks() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "book.txt", "A. B. C. D. E.").unwrap();
    let mut config = unreachable_config();
    config.max_chunk_size = 2;
    let controller = Controller::with_config(config).unwrap();

    let options = RunOptions {
        test_mode: true,
        ..Default::default()
    };
    let summary = controller.run(&input, options).await.unwrap();
    assert_eq!(summary.stats.total, 3);
}

#[tokio::test]
async fn test_run_withMarkdownInput_shouldFinalizeHtmlDocument() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "book.md", "# One\nFirst.\n# Two\nSecond.").unwrap();
    let controller = Controller::with_config(unreachable_config()).unwrap();

    let summary = controller.run(&input, RunOptions::default()).await.unwrap();

    let html_path = summary.document_output.unwrap();
    assert_eq!(html_path, dir.path().join("book_translated.html"));
    let html = fs::read_to_string(html_path).unwrap();
    assert!(html.contains("<section id=\"chapter_001\">"));
    assert!(html.contains("<section id=\"chapter_002\">"));
}

#[test]
fn test_withConfig_withInvalidConfig_shouldFail() {
    let mut config = unreachable_config();
    config.translation.providers.clear();
    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_checkProviders_withUnreachableProvider_shouldReportFailure() {
    let controller = Controller::with_config(unreachable_config()).unwrap();
    let results = tokio_test::block_on(async { controller.check_providers().await.unwrap() });
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "ollama/llama3.1:latest");
    assert!(results[0].1.is_err());
}
