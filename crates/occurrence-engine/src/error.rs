//! Error types for occurrence-engine operations.

use serde::Serialize;
use thiserror::Error;

use crate::cascade::{RuleName, Unresolved};

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum EngineError {
    #[error("Malformed time token: {0}")]
    MalformedTimeToken(String),

    #[error("Malformed date token: {0}")]
    MalformedDateToken(String),

    #[error("Unknown weekday name: {0}")]
    UnknownWeekdayName(String),

    #[error("No pattern matched: {0}")]
    NoPatternMatched(String),

    #[error("Missing title: {0}")]
    MissingTitle(String),

    #[error("Missing date token: {0}")]
    MissingDateToken(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid anchor: {0}")]
    InvalidAnchor(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// A skipped fragment or listing block.
///
/// Diagnostics never abort a batch; the caller decides what a batch with no
/// successfully parsed fragments means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Position of the fragment/block within its batch.
    pub index: usize,
    /// The cascade rule that claimed the fragment, if any did.
    pub rule: Option<RuleName>,
    /// The substring that rule matched.
    pub matched: Option<String>,
    pub error: EngineError,
}

impl Diagnostic {
    pub fn new(index: usize, error: EngineError) -> Self {
        Self {
            index,
            rule: None,
            matched: None,
            error,
        }
    }

    pub fn from_unresolved(index: usize, unresolved: Unresolved) -> Self {
        Self {
            index,
            rule: unresolved.rule,
            matched: unresolved.matched,
            error: unresolved.error,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fragment {}: {}", self.index, self.error)?;
        if let Some(rule) = self.rule {
            write!(f, " (rule {rule}")?;
            if let Some(matched) = &self.matched {
                write!(f, " matched '{matched}'")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Clip a fragment for inclusion in an error message.
pub(crate) fn excerpt(text: &str) -> String {
    const LIMIT: usize = 60;
    let trimmed = text.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("'{}...'", &trimmed[..idx]),
        None => format!("'{trimmed}'"),
    }
}
