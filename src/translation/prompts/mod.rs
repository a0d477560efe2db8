/*!
 * Prompt construction for the translate and refine passes.
 */

pub mod templates;

// Re-export main types
pub use templates::{PromptTemplate, user_payload};
