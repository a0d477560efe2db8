use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::app_config::DocumentConfig;
use crate::errors::DocumentError;
use super::{DocumentSource, title_from_path};

/// Pages in plain text are separated by form feeds
const PAGE_BREAK: char = '\u{000C}';

/// Flat UTF-8 text file
#[derive(Debug)]
pub struct PlainTextSource {
    path: PathBuf,
    text: String,
}

impl PlainTextSource {
    /// Read the file, keeping only the configured page range
    pub fn open(path: &Path, config: &DocumentConfig) -> Result<Self, DocumentError> {
        let raw = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            text: select_pages(&raw, config.start_page, config.end_page),
        })
    }
}

/// Keep pages `start..=end` (1-based); `end == -1` means through the last page
pub fn select_pages(text: &str, start_page: u32, end_page: i32) -> String {
    if !text.contains(PAGE_BREAK) {
        return text.to_string();
    }

    let pages: Vec<&str> = text.split(PAGE_BREAK).collect();
    let start = (start_page.max(1) - 1) as usize;
    let end = if end_page < 0 {
        pages.len()
    } else {
        (end_page as usize).min(pages.len())
    };
    debug!("Selecting pages {}..{} of {}", start + 1, end, pages.len());

    if start >= end {
        return String::new();
    }
    pages[start..end].join("\n")
}

impl DocumentSource for PlainTextSource {
    fn title(&self) -> String {
        title_from_path(&self.path)
    }

    fn extract_plain_text(&self) -> Result<String, DocumentError> {
        Ok(self.text.clone())
    }
}
