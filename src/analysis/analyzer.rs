//! Analyzers used for full-text fields.

use std::fmt;
use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::inversion::Inversion;
use crate::analysis::token::Token;
use crate::error::{IndexError, Result};

/// Transforms a token stream, typically by splitting and normalizing.
pub trait Analyzer: Send + Sync + fmt::Debug {
    /// Name under which the analyzer is recorded in a schema.
    fn name(&self) -> &str;

    fn transform(&self, inversion: Inversion) -> Result<Inversion>;

    /// Analyze raw text.
    fn transform_text(&self, text: &str) -> Result<Inversion> {
        self.transform(Inversion::from_text(text))
    }

    /// Analyze raw text and return just the token texts.
    fn split(&self, text: &str) -> Result<Vec<String>> {
        Ok(self
            .transform_text(text)?
            .into_tokens()
            .into_iter()
            .map(|t| t.text)
            .collect())
    }
}

/// Splits on Unicode word boundaries and lowercases.
#[derive(Debug, Clone, Default)]
pub struct StandardAnalyzer;

impl StandardAnalyzer {
    pub fn new() -> Self {
        StandardAnalyzer
    }
}

impl Analyzer for StandardAnalyzer {
    fn name(&self) -> &str {
        "standard"
    }

    fn transform(&self, inversion: Inversion) -> Result<Inversion> {
        let mut out = Inversion::new();
        for source in inversion.into_tokens() {
            let base = source.start_offset;
            for (offset, word) in source.text.split_word_bound_indices() {
                if !word.chars().any(char::is_alphanumeric) {
                    continue;
                }
                let start = base + offset as u32;
                let mut token = Token::new(word.to_lowercase(), start, start + word.len() as u32);
                token.boost = source.boost;
                out.append(token)?;
            }
        }
        Ok(out)
    }
}

/// Splits on whitespace only, preserving case.
#[derive(Debug, Clone, Default)]
pub struct WhitespaceAnalyzer;

impl WhitespaceAnalyzer {
    pub fn new() -> Self {
        WhitespaceAnalyzer
    }
}

impl Analyzer for WhitespaceAnalyzer {
    fn name(&self) -> &str {
        "whitespace"
    }

    fn transform(&self, inversion: Inversion) -> Result<Inversion> {
        let mut out = Inversion::new();
        for source in inversion.into_tokens() {
            let text = source.text.as_str();
            let mut start = None;
            for (idx, ch) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
                match (start, ch.is_whitespace()) {
                    (None, false) => start = Some(idx),
                    (Some(s), true) => {
                        let begin = source.start_offset + s as u32;
                        let end = source.start_offset + idx as u32;
                        out.append(Token::new(&text[s..idx], begin, end))?;
                        start = None;
                    }
                    _ => {}
                }
            }
        }
        Ok(out)
    }
}

/// Look up a built-in analyzer by its recorded name.
pub fn analyzer_by_name(name: &str) -> Result<Arc<dyn Analyzer>> {
    match name {
        "standard" => Ok(Arc::new(StandardAnalyzer)),
        "whitespace" => Ok(Arc::new(WhitespaceAnalyzer)),
        other => Err(IndexError::not_found(format!("Unknown analyzer '{other}'"))),
    }
}
