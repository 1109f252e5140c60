//! Paragraph front end.
//!
//! Feeds publish one event per paragraph: an emphasized leading phrase for the
//! title, free prose with a date/time expression and usually a location
//! ending in a parenthetical neighbourhood, and sometimes a link. Markup
//! traversal happens upstream; this module receives the already-extracted
//! pieces as a [`Paragraph`].

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cascade::resolve_fragment;
use crate::config::EngineConfig;
use crate::error::{excerpt, Diagnostic, EngineError};
use crate::occurrence::{BatchOutcome, EventDraft};

/// One paragraph of feed text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Full plain text of the paragraph, title included.
    pub text: String,
    /// The bolded/emphasized leading phrase, used as the title.
    #[serde(default)]
    pub emphasized: Option<String>,
    /// First outbound link in the paragraph.
    #[serde(default)]
    pub link: Option<String>,
}

static MARKED_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(?P<title>.+?)\*\*").expect("valid title pattern"));

static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s<>()]+").expect("valid link pattern"));

/// A location is introduced by a sentence boundary, `to`, `at`, or `in`, and
/// ends with a parenthetical (usually the neighbourhood).
static LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\.\s|:\s|\bto\s|\bat\s|\bin\s)(?P<location>[^()]*?\s\([^()]*\))")
        .expect("valid location pattern")
});

/// Boundaries that may not appear inside a location; the location is what
/// follows the last of them.
static LOCATION_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.\s|:\s|\sto\s|\sat\s|\sin\s").expect("valid location boundary pattern")
});

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_emphasized(mut self, emphasized: impl Into<String>) -> Self {
        self.emphasized = Some(emphasized.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Build a paragraph from lightly marked-up text: the first `**phrase**`
    /// is the emphasized title and the first `http(s)://` URL is the link.
    /// The markers are stripped from `text`.
    pub fn from_marked_text(raw: &str) -> Self {
        let emphasized = MARKED_TITLE
            .captures(raw)
            .and_then(|caps| caps.name("title"))
            .map(|m| m.as_str().trim().to_string());
        let link = LINK
            .find(raw)
            .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':']).to_string());
        let text = raw.replace("**", "").trim().to_string();

        Self {
            text,
            emphasized,
            link,
        }
    }
}

/// Find the location phrase in a paragraph, skipping candidates that
/// contain an exclusion keyword.
pub fn extract_location(text: &str, config: &EngineConfig) -> Option<String> {
    LOCATION
        .captures_iter(text)
        .filter_map(|caps| caps.name("location").map(|m| m.as_str()))
        .map(innermost_location)
        .find(|candidate| !candidate.is_empty() && !config.is_excluded_location(candidate))
        .map(str::to_string)
}

fn innermost_location(candidate: &str) -> &str {
    let cut = LOCATION_BOUNDARY
        .find_iter(candidate)
        .last()
        .map_or(0, |m| m.end());
    candidate[cut..].trim()
}

/// Turn one paragraph into an event draft.
///
/// # Errors
///
/// [`EngineError::MissingTitle`] when the paragraph has no emphasized phrase,
/// otherwise whatever the cascade reports for the paragraph text.
pub fn extract_event(
    paragraph: &Paragraph,
    index: usize,
    anchor: NaiveDate,
    config: &EngineConfig,
) -> Result<EventDraft, Diagnostic> {
    let title = paragraph
        .emphasized
        .as_deref()
        .map(|t| t.trim().trim_end_matches(':').trim())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            Diagnostic::new(index, EngineError::MissingTitle(excerpt(&paragraph.text)))
        })?;

    let resolution = resolve_fragment(&paragraph.text, anchor, config)
        .map_err(|unresolved| Diagnostic::from_unresolved(index, unresolved))?;

    let description = match &paragraph.link {
        Some(link) => format!("{}\n\n{}", paragraph.text, link),
        None => paragraph.text.clone(),
    };

    Ok(EventDraft {
        title: title.to_string(),
        description,
        location: extract_location(&paragraph.text, config),
        occurrences: resolution.occurrences,
        source: config.feed_source.clone(),
    })
}

/// Resolve a batch of paragraphs. Failures are logged and collected as
/// diagnostics; they never stop the batch.
///
/// Paragraphs are independent of one another, so callers holding very large
/// batches may split them and resolve the parts concurrently.
pub fn parse_paragraphs(
    paragraphs: &[Paragraph],
    anchor: NaiveDate,
    config: &EngineConfig,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for (index, paragraph) in paragraphs.iter().enumerate() {
        match extract_event(paragraph, index, anchor, config) {
            Ok(draft) if draft.occurrences.is_empty() => {
                log::info!("paragraph {index} resolved to no occurrences; dropping '{}'", draft.title);
            }
            Ok(draft) => outcome.events.push(draft),
            Err(diagnostic) => {
                log::warn!("skipping paragraph: {diagnostic}");
                outcome.diagnostics.push(diagnostic);
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::RuleName;
    use crate::occurrence::EventSource;

    fn friday() -> NaiveDate {
        // Friday, June 7, 2024
        NaiveDate::from_ymd_opt(2024, 6, 7).unwrap()
    }

    #[test]
    fn test_location_after_at() {
        let config = EngineConfig::default();
        let loc = extract_location("Sat-Sun 11am-6pm at the Pier (Brooklyn).", &config);
        assert_eq!(loc.as_deref(), Some("the Pier (Brooklyn)"));
    }

    #[test]
    fn test_location_after_sentence_boundary() {
        let config = EngineConfig::default();
        let loc = extract_location(
            "Free outdoor yoga. Sunset Park (brooklyn), sat 9am.",
            &config,
        );
        assert_eq!(loc.as_deref(), Some("Sunset Park (brooklyn)"));
    }

    #[test]
    fn test_location_uses_innermost_boundary() {
        let config = EngineConfig::default();
        let loc = extract_location(
            "Block party: dancing and food trucks at the Plaza (queens). Sat 2pm.",
            &config,
        );
        assert_eq!(loc.as_deref(), Some("the Plaza (queens)"));
    }

    #[test]
    fn test_location_boundary_after_non_ascii_text() {
        let config = EngineConfig::default();
        let loc = extract_location(
            "Fête: İstanbul night AT Café Ünal (queens). Sat 9pm.",
            &config,
        );
        assert_eq!(loc.as_deref(), Some("Café Ünal (queens)"));
    }

    #[test]
    fn test_location_skips_excluded_candidate() {
        let config = EngineConfig::default();
        let loc = extract_location(
            "Jazz night. featuring the Trio (quartet), Fri 8pm at Smalls (manhattan).",
            &config,
        );
        assert_eq!(loc.as_deref(), Some("Smalls (manhattan)"));
    }

    #[test]
    fn test_location_absent_without_parenthetical() {
        let config = EngineConfig::default();
        assert_eq!(extract_location("Fri 8pm at the bar.", &config), None);
    }

    #[test]
    fn test_marked_text_extracts_title_and_link() {
        let p = Paragraph::from_marked_text(
            "**Pier party:** Sat-Sun 11am-6pm at the Pier (Brooklyn). more: https://example.com/pier.",
        );
        assert_eq!(p.emphasized.as_deref(), Some("Pier party:"));
        assert_eq!(p.link.as_deref(), Some("https://example.com/pier"));
        assert!(p.text.starts_with("Pier party: Sat-Sun"));
    }

    #[test]
    fn test_extract_event_end_to_end() {
        let config = EngineConfig::default();
        let p = Paragraph::new("Pier party: Sat-Sun 11am-6pm at the Pier (Brooklyn).")
            .with_emphasized("Pier party:")
            .with_link("https://example.com/pier");
        let draft = extract_event(&p, 0, friday(), &config).unwrap();
        assert_eq!(draft.title, "Pier party");
        assert_eq!(draft.location.as_deref(), Some("the Pier (Brooklyn)"));
        assert!(draft.description.ends_with("\n\nhttps://example.com/pier"));
        assert_eq!(draft.occurrences.len(), 2);
        assert!(draft.occurrences.iter().all(|o| o.has_time));
        assert!(draft
            .occurrences
            .iter()
            .all(|o| o.matched_rule == RuleName::DateThenTime));
    }

    #[test]
    fn test_missing_title_is_diagnosed() {
        let config = EngineConfig::default();
        let p = Paragraph::new("Sat 8pm at the bar (queens).");
        let diag = extract_event(&p, 3, friday(), &config).unwrap_err();
        assert_eq!(diag.index, 3);
        assert!(matches!(diag.error, EngineError::MissingTitle(_)));
    }

    #[test]
    fn test_batch_continues_past_failures() {
        let config = EngineConfig {
            feed_source: Some(EventSource {
                title: "the skint".to_string(),
                url: "https://theskint.com/".to_string(),
            }),
            ..EngineConfig::default()
        };
        let paragraphs = vec![
            Paragraph::new("no title here, fri 8pm"),
            Paragraph::new("Poetry: a lovely evening").with_emphasized("Poetry"),
            Paragraph::new("Comedy: Friday 6pm + 9pm at the Cellar (manhattan).")
                .with_emphasized("Comedy"),
            Paragraph::new("Bad date: 2/30 8pm.").with_emphasized("Bad date"),
        ];
        let outcome = parse_paragraphs(&paragraphs, friday(), &config);

        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].title, "Comedy");
        assert_eq!(outcome.events[0].source, config.feed_source);
        assert_eq!(outcome.occurrence_count(), 2);

        let indexes: Vec<_> = outcome.diagnostics.iter().map(|d| d.index).collect();
        assert_eq!(indexes, vec![0, 1, 3]);
        assert!(matches!(
            outcome.diagnostics[1].error,
            EngineError::NoPatternMatched(_)
        ));
        assert_eq!(outcome.diagnostics[2].rule, Some(RuleName::DateThenTime));
    }

    #[test]
    fn test_open_ended_paragraph() {
        let config = EngineConfig::default();
        let anchor = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        let p = Paragraph::new("Art show: thru Sunday.").with_emphasized("Art show");
        let draft = extract_event(&p, 0, anchor, &config).unwrap();
        assert_eq!(draft.occurrences.len(), 1);
        assert!(!draft.occurrences[0].has_time);
        assert_eq!(
            draft.occurrences[0].end_date(),
            NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
        );
    }
}
