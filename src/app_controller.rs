use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::document::{self, ChapterContent, DocumentFormat, DocumentSink, DocumentSource};
use crate::errors::ProviderError;
use crate::file_utils::FileManager;
use crate::glossary::Glossary;
use crate::translation::segmenter;
use crate::translation::{MemoizationStore, Orchestrator, OrchestratorOptions, ProviderClient, RunStats};

// @module: Application controller for book translation

/// Chunks translated in test mode, counted across chapters
pub const TEST_MODE_CHUNKS: usize = 3;

/// Per-run switches from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    // @field: Only translate the first chunks
    pub test_mode: bool,
    // @field: Apply the proper-noun table before segmentation
    pub use_glossary: bool,
}

/// Result of a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: RunStats,
    pub text_output: PathBuf,
    pub document_output: Option<PathBuf>,
    /// The cache file stays when chunks failed, so a rerun retries only those
    pub cache_kept: bool,
    pub elapsed: Duration,
}

/// Text preparation applied before segmentation
#[derive(Debug, Clone, Default)]
pub struct TextPreparation {
    pub glossary: Option<Glossary>,
    pub max_chunk_size: usize,
}

impl TextPreparation {
    /// Normalize, substitute glossary terms, then segment
    pub fn chunks(&self, text: &str) -> Vec<segmenter::Chunk> {
        let normalized = segmenter::normalize(text);
        let substituted = match &self.glossary {
            Some(glossary) => glossary.apply(&normalized),
            None => normalized,
        };
        segmenter::segment_normalized(&substituted, self.max_chunk_size)
    }

    /// Heading chunk first, then the body, reindexed in chapter order
    pub fn chapter_chunks(&self, chapter: &document::Chapter) -> Vec<segmenter::Chunk> {
        chapter
            .heading
            .iter()
            .flat_map(|heading| self.chunks(heading))
            .chain(self.chunks(&chapter.text))
            .enumerate()
            .map(|(index, chunk)| segmenter::Chunk::new(index, chunk.text))
            .collect()
    }
}

/// Translated document text with run counts
#[derive(Debug, Clone, Default)]
pub struct DocumentOutput {
    pub text: String,
    pub stats: RunStats,
}

/// Main application controller for book translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a controller, validating the configuration once
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            source_language: self.config.source_language.clone(),
            target_language: self.config.target_language.clone(),
            bilingual: self.config.bilingual_output,
            sentence_line_breaks: self.config.sentence_line_breaks,
            concurrency: self.config.translation.common.concurrent_requests,
            limit: None,
        }
    }

    fn build_client(&self) -> Result<ProviderClient> {
        ProviderClient::from_config(&self.config.translation.providers, &self.config.translation.common)
            .context("Failed to initialize translation providers")
    }

    /// Probe every configured provider in order
    pub async fn check_providers(&self) -> Result<Vec<(String, Result<(), ProviderError>)>> {
        let client = self.build_client()?;
        let mut results = Vec::new();
        for provider in client.providers() {
            let result = provider.test_connection().await;
            match &result {
                Ok(()) => info!("Provider {} is reachable", provider.id()),
                Err(e) => warn!("Provider {} failed the connection test: {}", provider.id(), e),
            }
            results.push((provider.id().to_string(), result));
        }
        Ok(results)
    }

    /// Translate `input_file` and write the outputs next to it
    pub async fn run(&self, input_file: &Path, options: RunOptions) -> Result<RunSummary> {
        let start_time = Instant::now();

        // Unsupported formats fail before any work exists to protect
        let format = DocumentFormat::from_path(input_file)?;
        let source = document::open_source(input_file, &self.config.document)?;
        let title = source.title();
        info!("Translating '{}' into {}", title, self.config.target_language);

        let preparation = TextPreparation {
            glossary: if options.use_glossary { self.load_glossary()? } else { None },
            max_chunk_size: self.config.max_chunk_size,
        };

        let store = Arc::new(MemoizationStore::load(FileManager::cache_path(input_file))?);
        let client = Arc::new(self.build_client()?);
        let mut orchestrator = Orchestrator::new(client, Arc::clone(&store), self.orchestrator_options());

        let mut sink = document::open_sink(format, &title, &self.config.target_language_code);
        let limit = options.test_mode.then_some(TEST_MODE_CHUNKS);

        let output = translate_document(source.as_ref(), sink.as_deref_mut(), &mut orchestrator, &preparation, limit)
            .await?;

        let text_output = FileManager::text_output_path(input_file);
        FileManager::write_to_file(&text_output, &output.text)?;

        let document_output = match sink.as_mut() {
            Some(sink) => {
                let path = FileManager::document_output_path(input_file, "html");
                sink.finalize(&path)?;
                Some(path)
            }
            None => None,
        };

        let cache_kept = output.stats.failed > 0;
        if cache_kept {
            warn!(
                "{} chunks failed; keeping {} so a rerun retries them",
                output.stats.failed,
                store.path().display()
            );
        } else {
            store.discard()?;
        }

        let elapsed = start_time.elapsed();
        info!(
            "Done in {}: {} chunks ({} cached, {} translated, {} failed) -> {}",
            format_duration(elapsed),
            output.stats.total,
            output.stats.cached,
            output.stats.translated,
            output.stats.failed,
            text_output.display()
        );

        Ok(RunSummary {
            stats: output.stats,
            text_output,
            document_output,
            cache_kept,
            elapsed,
        })
    }

    fn load_glossary(&self) -> Result<Option<Glossary>> {
        match &self.config.glossary.path {
            Some(path) => Ok(Some(Glossary::load(path, self.config.glossary.case_sensitive)?)),
            None => {
                warn!("Glossary requested but no glossary path is configured");
                Ok(None)
            }
        }
    }
}

/// Translate a whole document through `orchestrator`.
///
/// Chaptered sources are segmented and orchestrated per chapter, each
/// chapter handed to `sink`; empty chapters are skipped. `limit` caps the
/// number of chunks across the whole document.
pub async fn translate_document(
    source: &dyn DocumentSource,
    mut sink: Option<&mut (dyn DocumentSink + '_)>,
    orchestrator: &mut Orchestrator,
    preparation: &TextPreparation,
    limit: Option<usize>,
) -> Result<DocumentOutput> {
    let sections: Vec<(Option<document::Chapter>, Vec<segmenter::Chunk>)> = if source.has_chapters() {
        source
            .iterate_chapters()?
            .into_iter()
            .map(|chapter| {
                let chunks = preparation.chapter_chunks(&chapter);
                (Some(chapter), chunks)
            })
            .filter(|(_, chunks)| !chunks.is_empty())
            .collect()
    } else {
        let text = source.extract_plain_text()?;
        vec![(None, preparation.chunks(&text))]
    };

    let available: usize = sections.iter().map(|(_, chunks)| chunks.len()).sum();
    let total = limit.map_or(available, |l| l.min(available));
    debug!("{} chunks to process ({} in document)", total, available);

    let progress_bar = progress_bar(total as u64);
    let mut output = DocumentOutput::default();
    let mut remaining = limit;

    for (chapter, chunks) in sections {
        if remaining == Some(0) {
            break;
        }

        let offset = output.stats.total;
        let bar = progress_bar.clone();
        orchestrator.set_limit(remaining);
        orchestrator.set_progress(Some(Box::new(move |done, _| bar.set_position((offset + done) as u64))));

        let run = orchestrator.run(chunks).await?;
        remaining = remaining.map(|r| r.saturating_sub(run.outcomes.len()));
        output.stats.merge(run.stats);

        if let (Some(chapter), Some(sink)) = (chapter, sink.as_deref_mut()) {
            let content = ChapterContent {
                media: chapter.media,
                text: run.text.clone(),
            };
            sink.write_chapter_content(&chapter.id, &content)?;
        }
        output.text.push_str(&run.text);
    }

    orchestrator.set_progress(None);
    progress_bar.finish_and_clear();
    Ok(output)
}

fn progress_bar(total: u64) -> ProgressBar {
    let progress_bar = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {eta}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%)"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("█▓▒░"));
    progress_bar
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, duration.subsec_millis())
    }
}
