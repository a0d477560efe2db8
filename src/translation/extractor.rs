/*!
 * Total extraction of a structured field from free-form model output.
 *
 * Providers are asked to answer with a one-field JSON object, but nothing
 * forces them to. Extraction runs in stages and always produces a string:
 *
 * 1. Reasoning spans (`<think>`, `<thinking>`, `<reasoning>`) are removed.
 * 2. The remaining text is parsed as a JSON object.
 * 3. The first balanced `{...}` span that parses is used.
 * 4. A minimal object is rebuilt from the non-brace lines.
 * 5. Otherwise the stripped text is returned verbatim.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static REASONING_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<think>.*?</think>|<thinking>.*?</thinking>|<reasoning>.*?</reasoning>")
        .expect("valid regex")
});

const DANGLING_CLOSERS: &[&str] = &["</think>", "</thinking>", "</reasoning>"];

/// Outcome of an extraction, tagged with how much repair was needed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The text (or an embedded object) parsed and carried the key
    Parsed(String),
    /// The value was recovered heuristically
    Repaired(String),
    /// Nothing structured was found; the stripped text itself
    Raw(String),
}

impl Extraction {
    pub fn value(&self) -> &str {
        match self {
            Self::Parsed(v) | Self::Repaired(v) | Self::Raw(v) => v,
        }
    }

    pub fn into_value(self) -> String {
        match self {
            Self::Parsed(v) | Self::Repaired(v) | Self::Raw(v) => v,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Parsed(_))
    }
}

/// Extract `expected_key` from raw model output. Never fails.
pub fn extract(raw: &str, expected_key: &str) -> String {
    let extraction = extract_tagged(raw, expected_key);
    match &extraction {
        Extraction::Parsed(_) => {}
        Extraction::Repaired(_) => debug!("Model output for '{}' needed repair", expected_key),
        Extraction::Raw(_) => warn!("Model output carried no '{}' field, using raw text", expected_key),
    }
    extraction.into_value()
}

/// Staged extraction returning the tagged outcome
pub fn extract_tagged(raw: &str, expected_key: &str) -> Extraction {
    let text = strip_reasoning(raw);
    let trimmed = text.trim();

    if let Some(found) = parse_object(trimmed, expected_key) {
        return found;
    }

    for span in balanced_spans(trimmed) {
        if let Some(found) = parse_object(span, expected_key) {
            return found;
        }
    }

    if let Some(rebuilt) = rebuild_from_lines(trimmed, expected_key) {
        return Extraction::Repaired(rebuilt);
    }

    Extraction::Raw(trimmed.to_string())
}

/// Remove reasoning spans, including an unopened trailing closer
pub fn strip_reasoning(raw: &str) -> String {
    let mut text = REASONING_SPAN.replace_all(raw, "").into_owned();
    for closer in DANGLING_CLOSERS {
        if let Some(pos) = text.rfind(closer) {
            text = text[pos + closer.len()..].to_string();
        }
    }
    text
}

fn parse_object(text: &str, expected_key: &str) -> Option<Extraction> {
    let value: Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;

    if let Some(field) = object.get(expected_key) {
        return Some(Extraction::Parsed(unwrap_nested(field_to_string(field), expected_key)));
    }

    // A single string field under another name is still the answer
    single_string_field(object).map(|v| Extraction::Repaired(unwrap_nested(v, expected_key)))
}

fn single_string_field(object: &Map<String, Value>) -> Option<String> {
    if object.len() != 1 {
        return None;
    }
    object.values().next()?.as_str().map(str::to_string)
}

fn field_to_string(field: &Value) -> String {
    match field {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(field_to_string)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

// Some models double-encode: {"translation": "{\"translation\": \"...\"}"}
fn unwrap_nested(value: String, expected_key: &str) -> String {
    let trimmed = value.trim();
    if !trimmed.starts_with('{') {
        return value;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(inner)) => match inner.get(expected_key) {
            Some(field) => field_to_string(field),
            None => value,
        },
        _ => value,
    }
}

/// Outermost balanced `{...}` spans, in document order.
///
/// One pass with a stack of open braces. A span that closes around earlier
/// spans replaces them, so the result is disjoint and an unclosed outer brace
/// still exposes the spans inside it. Braces inside JSON string literals do
/// not count.
pub fn balanced_spans(text: &str) -> Vec<&str> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(i),
            '}' => {
                if let Some(start) = open.pop() {
                    while spans.last().is_some_and(|&(s, _)| s > start) {
                        spans.pop();
                    }
                    spans.push((start, i + c.len_utf8()));
                }
            }
            _ => {}
        }
    }

    spans.into_iter().map(|(start, end)| &text[start..end]).collect()
}

fn rebuild_from_lines(text: &str, expected_key: &str) -> Option<String> {
    let quoted_key = format!("\"{}\"", expected_key);
    if !text.contains('{') && !text.contains('}') && !text.contains(&quoted_key) {
        return None;
    }

    let fragments: Vec<String> = text
        .lines()
        .filter_map(|line| clean_line(line, &quoted_key))
        .collect();

    if fragments.is_empty() {
        return None;
    }
    Some(fragments.join(" "))
}

fn clean_line(line: &str, quoted_key: &str) -> Option<String> {
    let mut line = line.trim();
    if line.is_empty() || line.starts_with("```") {
        return None;
    }

    line = line.trim_start_matches('{').trim_end_matches('}').trim();
    if let Some(rest) = line.strip_prefix(quoted_key) {
        line = rest.trim_start().trim_start_matches(':').trim_start();
    }
    let line = line.trim_end_matches(',').trim();
    let line = line.strip_prefix('"').unwrap_or(line);
    let line = line.strip_suffix('"').unwrap_or(line);
    let line = line.replace("\\\"", "\"").replace("\\n", "\n");

    if line.trim().is_empty() { None } else { Some(line.trim().to_string()) }
}
