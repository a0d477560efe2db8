/*!
 * Book translation pipeline.
 *
 * - `segmenter`: Sentence-safe chunking of normalized text
 * - `extractor`: Total extraction of the answer field from model output
 * - `prompts`: System prompt templates for both passes
 * - `core`: Ordered provider fallback, translate and refine
 * - `cache`: Persisted memoization store for resumable runs
 * - `orchestrator`: Per-chunk state machine and output assembly
 */

// Re-export main types for easier usage
pub use self::cache::MemoizationStore;
pub use self::core::{ProviderClient, ProviderOutcome, TranslationRecord};
pub use self::extractor::{Extraction, extract};
pub use self::orchestrator::{ChunkOutcome, ChunkState, Orchestrator, OrchestratorOptions, RunOutput, RunStats};
pub use self::prompts::PromptTemplate;
pub use self::segmenter::{Chunk, segment};

// Submodules
pub mod cache;
pub mod core;
pub mod extractor;
pub mod orchestrator;
pub mod prompts;
pub mod segmenter;
