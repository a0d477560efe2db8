use std::fs;
use std::path::Path;

use log::info;

use crate::errors::DocumentError;
use super::{ChapterContent, DocumentSink, escape_html};

/// Collects translated chapters into a single html book
#[derive(Debug)]
pub struct HtmlSink {
    title: String,
    language_code: String,
    sections: Vec<(String, String)>,
}

impl HtmlSink {
    pub fn new(title: &str, language_code: &str) -> Self {
        Self {
            title: title.to_string(),
            language_code: language_code.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn chapter_count(&self) -> usize {
        self.sections.len()
    }

    pub fn render(&self) -> String {
        let mut html = format!(
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n",
            escape_html(&self.language_code),
            escape_html(&self.title)
        );
        for (id, body) in &self.sections {
            html.push_str(&format!("<section id=\"{}\">\n{}\n</section>\n", escape_html(id), body));
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

impl DocumentSink for HtmlSink {
    fn write_chapter_content(&mut self, chapter_id: &str, content: &ChapterContent) -> Result<(), DocumentError> {
        self.sections.push((chapter_id.to_string(), content.to_html()));
        Ok(())
    }

    fn finalize(&mut self, output_path: &Path) -> Result<(), DocumentError> {
        fs::write(output_path, self.render()).map_err(|source| DocumentError::Io {
            path: output_path.to_path_buf(),
            source,
        })?;
        info!("Wrote {} chapters to {}", self.sections.len(), output_path.display());
        Ok(())
    }
}
