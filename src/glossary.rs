/*!
 * Proper-noun substitution table.
 *
 * The table is a JSON file, either an object (`{"Smeagol": "Sméagol"}`) or an
 * array of `[source, replacement]` pairs. Terms are applied longest first as
 * whole words, before the document is segmented.
 */

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, info};
use regex::{NoExpand, Regex, RegexBuilder};
use serde::Deserialize;

use crate::errors::GlossaryError;

#[derive(Deserialize)]
#[serde(untagged)]
enum TableFile {
    Map(BTreeMap<String, String>),
    Pairs(Vec<(String, String)>),
}

/// One compiled substitution
#[derive(Debug, Clone)]
struct Term {
    source: String,
    replacement: String,
    pattern: Regex,
}

/// Ordered substitution table
#[derive(Debug, Clone, Default)]
pub struct Glossary {
    terms: Vec<Term>,
}

impl Glossary {
    /// Load a table from a JSON file
    pub fn load(path: &Path, case_sensitive: bool) -> Result<Self, GlossaryError> {
        let content = fs::read_to_string(path).map_err(|source| GlossaryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let glossary = Self::from_json(&content, case_sensitive).map_err(|e| match e {
            GlossaryError::Parse { message, .. } => GlossaryError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        info!("Loaded {} glossary terms from {}", glossary.len(), path.display());
        Ok(glossary)
    }

    /// Parse a table from JSON text
    pub fn from_json(content: &str, case_sensitive: bool) -> Result<Self, GlossaryError> {
        let table: TableFile = serde_json::from_str(content).map_err(|e| GlossaryError::Parse {
            path: Default::default(),
            message: e.to_string(),
        })?;
        let pairs = match table {
            TableFile::Map(map) => map.into_iter().collect(),
            TableFile::Pairs(pairs) => pairs,
        };
        Self::from_pairs(pairs, case_sensitive)
    }

    /// Build a table from (source, replacement) pairs
    pub fn from_pairs<I>(pairs: I, case_sensitive: bool) -> Result<Self, GlossaryError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut terms = pairs
            .into_iter()
            .filter(|(source, _)| !source.trim().is_empty())
            .map(|(source, replacement)| {
                let pattern = RegexBuilder::new(&whole_word(&source))
                    .case_insensitive(!case_sensitive)
                    .build()
                    .map_err(|e| GlossaryError::InvalidTerm {
                        term: source.clone(),
                        message: e.to_string(),
                    })?;
                Ok(Term {
                    source,
                    replacement,
                    pattern,
                })
            })
            .collect::<Result<Vec<_>, GlossaryError>>()?;

        // Longest first so "New York City" wins over "New York"
        terms.sort_by(|a, b| {
            b.source
                .chars()
                .count()
                .cmp(&a.source.chars().count())
                .then_with(|| a.source.cmp(&b.source))
        });

        Ok(Self { terms })
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Apply every term in order
    pub fn apply(&self, text: &str) -> String {
        let mut result = text.to_string();
        for term in &self.terms {
            if term.pattern.is_match(&result) {
                debug!("Glossary: {} -> {}", term.source, term.replacement);
                result = term
                    .pattern
                    .replace_all(&result, NoExpand(&term.replacement))
                    .into_owned();
            }
        }
        result
    }
}

// Word boundaries only make sense next to word characters
fn whole_word(term: &str) -> String {
    let escaped = regex::escape(term);
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let lead = if term.chars().next().is_some_and(is_word) { r"\b" } else { "" };
    let tail = if term.chars().last().is_some_and(is_word) { r"\b" } else { "" };
    format!("{}{}{}", lead, escaped, tail)
}
