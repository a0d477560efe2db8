/*!
 * Tests for document sources and sinks
 */

use std::fs;

use bookwai::app_config::DocumentConfig;
use bookwai::document::{self, ChapterContent, DocumentFormat, DocumentSink, HtmlSink, UNKNOWN_TITLE};
use bookwai::errors::DocumentError;

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_openSource_withPlainText_shouldExtractText() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "story.txt", "Once upon a time.\nThe end.").unwrap();

    let source = document::open_source(&path, &DocumentConfig::default()).unwrap();
    assert_eq!(source.title(), "story");
    assert!(!source.has_chapters());
    assert_eq!(source.extract_plain_text().unwrap(), "Once upon a time.\nThe end.");
}

#[test]
fn test_openSource_withPageRange_shouldKeepSelectedPages() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "paged.txt", "cover\u{000C}page two\u{000C}page three").unwrap();
    let config = DocumentConfig {
        start_page: 2,
        end_page: -1,
    };

    let source = document::open_source(&path, &config).unwrap();
    assert_eq!(source.extract_plain_text().unwrap(), "page two\npage three");
}

#[test]
fn test_openSource_withMarkdown_shouldIterateChapters() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "book.md", "# Part One\nIt begins.\n# Part Two\nIt ends.").unwrap();

    let source = document::open_source(&path, &DocumentConfig::default()).unwrap();
    assert!(source.has_chapters());
    assert_eq!(source.title(), "Part One");
    assert_eq!(source.iterate_chapters().unwrap().len(), 2);
}

#[test]
fn test_openSource_withEpub_shouldFailBeforeReading() {
    let dir = create_temp_dir().unwrap();
    // The file does not even exist: format rejection comes first
    let result = document::open_source(&dir.path().join("book.epub"), &DocumentConfig::default());
    assert!(matches!(result, Err(DocumentError::UnsupportedFormat(_))));
}

#[test]
fn test_openSource_withMissingTextFile_shouldReturnIoError() {
    let dir = create_temp_dir().unwrap();
    let result = document::open_source(&dir.path().join("absent.txt"), &DocumentConfig::default());
    assert!(matches!(result, Err(DocumentError::Io { .. })));
}

#[test]
fn test_documentFormat_structuredOutput_onlyForMarkdown() {
    assert!(DocumentFormat::Markdown.has_structured_output());
    assert!(!DocumentFormat::PlainText.has_structured_output());
    assert!(document::open_sink(DocumentFormat::PlainText, "t", "zh").is_none());
}

#[test]
fn test_htmlSink_shouldRenderMediaBeforeText() {
    let dir = create_temp_dir().unwrap();
    let out = dir.path().join("out.html");
    let mut sink = HtmlSink::new(UNKNOWN_TITLE, "zh");
    let content = ChapterContent {
        media: vec![r#"<img src="cover.png">"#.to_string()],
        text: "第一行\n第二行\n".to_string(),
    };
    sink.write_chapter_content("chapter_001", &content).unwrap();
    sink.finalize(&out).unwrap();

    let html = fs::read_to_string(&out).unwrap();
    assert!(html.contains(r#"<img src="cover.png"><br>第一行<br>第二行<br>"#));
    assert!(html.contains("<html lang=\"zh\">"));
    assert_eq!(sink.chapter_count(), 1);
}
