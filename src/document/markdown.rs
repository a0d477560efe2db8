use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::DocumentError;
use super::{Chapter, DocumentSource, escape_html, title_from_path};

static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)[^)]*\)").expect("valid regex"));

/// Markdown file treated as a chaptered document.
///
/// Every level-one heading starts a chapter; text before the first heading
/// forms a leading chapter. Images become the chapter's media.
#[derive(Debug)]
pub struct MarkdownSource {
    path: PathBuf,
    content: String,
}

impl MarkdownSource {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let content = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_content(path, content))
    }

    pub fn from_content(path: &Path, content: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            content: content.into(),
        }
    }
}

fn heading(line: &str) -> Option<&str> {
    line.strip_prefix("# ").map(str::trim).filter(|h| !h.is_empty())
}

/// Split markdown into chapters at level-one headings
pub fn split_chapters(content: &str) -> Vec<Chapter> {
    let mut sections: Vec<Vec<&str>> = vec![Vec::new()];
    for line in content.lines() {
        if heading(line).is_some() && sections.last().is_some_and(|s| !s.is_empty()) {
            sections.push(Vec::new());
        }
        if let Some(section) = sections.last_mut() {
            section.push(line);
        }
    }

    sections
        .into_iter()
        .filter(|lines| !lines.is_empty())
        .enumerate()
        .map(|(i, mut lines)| {
            let heading = lines.first().copied().and_then(heading).map(str::to_string);
            if heading.is_some() {
                lines.remove(0);
            }
            let raw = lines.join("\n");
            let media = IMAGE
                .captures_iter(&raw)
                .map(|c| format!(r#"<img src="{}" alt="{}">"#, escape_html(&c[2]), escape_html(&c[1])))
                .collect();
            let text = IMAGE.replace_all(&raw, "").into_owned();
            Chapter {
                id: format!("chapter_{:03}", i + 1),
                heading,
                text: text.trim().to_string(),
                media,
            }
        })
        .collect()
}

impl DocumentSource for MarkdownSource {
    fn title(&self) -> String {
        self.content
            .lines()
            .find_map(heading)
            .map(str::to_string)
            .unwrap_or_else(|| title_from_path(&self.path))
    }

    fn extract_plain_text(&self) -> Result<String, DocumentError> {
        Ok(split_chapters(&self.content)
            .into_iter()
            .flat_map(|c| c.heading.into_iter().chain(std::iter::once(c.text)))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn has_chapters(&self) -> bool {
        true
    }

    fn iterate_chapters(&self) -> Result<Vec<Chapter>, DocumentError> {
        Ok(split_chapters(&self.content))
    }
}
