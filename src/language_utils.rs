use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Validates the configured target language code and turns codes into
/// display names for prompts.
/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

fn bibliographic_to_terminologic(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 if Language::from_639_1(&normalized_code).is_some() => Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&normalized_code).is_some() => Ok(LanguageCodeType::Part2T),
        3 if bibliographic_to_terminologic(&normalized_code).is_some() => Ok(LanguageCodeType::Part2B),
        _ => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
        if let Some(part2t) = bibliographic_to_terminologic(&normalized_code) {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Label to put in prompts: codes become names, names pass through
pub fn prompt_label(language: &str) -> String {
    let trimmed = language.trim();
    if trimmed.len() <= 3 {
        if let Ok(name) = get_language_name(trimmed) {
            return name;
        }
    }
    trimmed.to_string()
}
