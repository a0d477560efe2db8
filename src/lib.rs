/*!
 * # bookwai - resumable book translation with LLM providers
 *
 * A Rust library for translating long documents through large language models.
 *
 * ## Features
 *
 * - Sentence-safe segmentation for Latin and CJK text
 * - Ordered provider fallback:
 *   - Ollama (local LLM)
 *   - OpenAI API and LM Studio
 *   - Anthropic API
 * - Total extraction of the answer from free-form model output
 * - Optional refine pass over each translation
 * - Persisted memoization store, so interrupted runs resume
 * - Bilingual or monolingual output, chaptered documents
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document`: Document sources and sinks
 * - `glossary`: Proper-noun substitution table
 * - `translation`: The translation pipeline:
 *   - `translation::segmenter`: Chunking
 *   - `translation::extractor`: Response extraction
 *   - `translation::core`: Provider fallback
 *   - `translation::cache`: Memoization store
 *   - `translation::orchestrator`: Chunk state machine and assembly
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for LLM providers
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod glossary;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, RunOptions, RunSummary};
pub use errors::{DocumentError, GlossaryError, ProviderError, StoreError};
pub use glossary::Glossary;
pub use language_utils::{get_language_name, normalize_to_part2t};
pub use translation::{Chunk, MemoizationStore, Orchestrator, ProviderClient, TranslationRecord};
