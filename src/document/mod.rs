/*!
 * Document sources and sinks.
 *
 * A source yields plain text, or a sequence of chapters for container
 * formats. A sink receives translated chapter content and writes the final
 * document. Plain text output is a flat write of the assembled buffer and
 * needs no sink.
 */

use std::path::Path;

use crate::app_config::DocumentConfig;
use crate::errors::DocumentError;

pub mod html_sink;
pub mod markdown;
pub mod plain_text;

pub use html_sink::HtmlSink;
pub use markdown::MarkdownSource;
pub use plain_text::PlainTextSource;

/// Title reported when a document has none or it cannot be read
pub const UNKNOWN_TITLE: &str = "Unknown title";

/// One chapter of a container document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub id: String,
    /// Chapter heading without markup, translated as its own chunk
    pub heading: Option<String>,
    pub text: String,
    /// Embedded media, as html fragments
    pub media: Vec<String>,
}

/// Translated content handed to a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterContent {
    pub media: Vec<String>,
    /// Assembled text with `\n` line breaks
    pub text: String,
}

impl ChapterContent {
    /// Media first, then the text with line breaks as `<br>`
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for fragment in &self.media {
            html.push_str(fragment);
            html.push_str("<br>");
        }
        html.push_str(&escape_html(&self.text).replace('\n', "<br>"));
        html
    }
}

pub trait DocumentSource: Send + Sync {
    /// Document title, `UNKNOWN_TITLE` on any failure
    fn title(&self) -> String;

    fn extract_plain_text(&self) -> Result<String, DocumentError>;

    fn has_chapters(&self) -> bool {
        false
    }

    fn iterate_chapters(&self) -> Result<Vec<Chapter>, DocumentError> {
        Ok(Vec::new())
    }
}

pub trait DocumentSink: Send {
    fn write_chapter_content(&mut self, chapter_id: &str, content: &ChapterContent) -> Result<(), DocumentError>;

    fn finalize(&mut self, output_path: &Path) -> Result<(), DocumentError>;
}

/// Input formats recognized by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Markdown,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "txt" | "text" => Ok(Self::PlainText),
            "md" | "markdown" => Ok(Self::Markdown),
            "" => Err(DocumentError::UnsupportedFormat(format!(
                "{} has no file extension",
                path.display()
            ))),
            other => Err(DocumentError::UnsupportedFormat(format!(
                ".{} ({})",
                other,
                path.display()
            ))),
        }
    }

    /// Whether the format produces a structured output alongside the text
    pub fn has_structured_output(&self) -> bool {
        matches!(self, Self::Markdown)
    }
}

/// Open `path` with the source matching its extension
pub fn open_source(path: &Path, config: &DocumentConfig) -> Result<Box<dyn DocumentSource>, DocumentError> {
    let source: Box<dyn DocumentSource> = match DocumentFormat::from_path(path)? {
        DocumentFormat::PlainText => Box::new(PlainTextSource::open(path, config)?),
        DocumentFormat::Markdown => Box::new(MarkdownSource::open(path)?),
    };
    Ok(source)
}

/// Sink for formats with structured output
pub fn open_sink(format: DocumentFormat, title: &str, language_code: &str) -> Option<Box<dyn DocumentSink>> {
    match format {
        DocumentFormat::Markdown => Some(Box::new(HtmlSink::new(title, language_code))),
        DocumentFormat::PlainText => None,
    }
}

/// Title derived from a file name
pub(crate) fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
