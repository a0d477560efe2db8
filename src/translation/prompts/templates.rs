/*!
 * Prompt templates for book translation.
 *
 * Both passes ask for exactly one JSON field so the response extractor has
 * a predictable target.
 */

/// System prompt template with `{placeholder}` substitution.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for translating a chunk.
    pub const BOOK_TRANSLATOR: &'static str = r#"You are a professional literary translator working from {source_language} into {target_language}.

## Rules
- Translate the text faithfully and naturally into {target_language}
- Write the translation in {target_language} only
- Keep proper nouns (people, places, organizations, titles) in their original form, untranslated
- Do not summarize, omit or add content
- Do not explain your translation

## Output
Return only valid JSON with exactly one field, like this example:
{"{response_key}": "translated text here"}
Escape double quotes inside the value and use \n instead of literal line breaks."#;

    /// The default system prompt for the refine pass.
    pub const BOOK_EDITOR: &'static str = r#"You are a senior {target_language} editor.

## Rules
- Correct typos, punctuation and grammar in the text
- Improve clarity and flow, splitting overly long sentences
- Keep the tone, style, terminology and meaning of the text
- Keep proper nouns exactly as written
- Do not translate the text into another language
- Provide only the corrected text, without explanations

## Output
Return only valid JSON with exactly one field, like this example:
{"{response_key}": "corrected text here"}
Escape double quotes inside the value and use \n instead of literal line breaks."#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default translator template.
    pub fn book_translator() -> Self {
        Self::new(Self::BOOK_TRANSLATOR)
    }

    /// Create the default editor template.
    pub fn book_editor() -> Self {
        Self::new(Self::BOOK_EDITOR)
    }

    /// Render the template with the given variables.
    pub fn render(&self, source_language: &str, target_language: &str, response_key: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
            .replace("{response_key}", response_key)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::book_translator()
    }
}

/// Build the user message for a chunk, optionally fenced
pub fn user_payload(text: &str, fenced: bool) -> String {
    if fenced {
        format!("```\n{}\n```", text)
    } else {
        text.to_string()
    }
}
