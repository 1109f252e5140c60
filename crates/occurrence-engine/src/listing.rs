//! Plain-text weekly listing front end.
//!
//! A listing is a sequence of blocks shaped like
//!
//! ```text
//! FRIDAY, JUNE 7
//!
//! Rooftop Cinema
//!
//! Some description.
//!
//! Roof Garden, 12 Main St
//! 8pm; $15
//! ```
//!
//! Listings name the weekday but not the week, and repeat weekday names as
//! they roll into the following week. [`WeekTracker`] infers the week from the
//! order in which weekday names appear, so blocks must be processed strictly
//! in source order.

use chrono::{Duration, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::calendar_date::{next_weekday_on_or_after, DateSpan};
use crate::cascade::RuleName;
use crate::config::EngineConfig;
use crate::error::{excerpt, Diagnostic, EngineError};
use crate::expand::expand;
use crate::occurrence::{build_occurrences, BatchOutcome, EventDraft, Occurrence};
use crate::time_of_day::parse_time_range;

/// Full weekday names recognised on a listing date line.
const LISTING_WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

static LISTING_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d{1,2}(?::\d{2})?(?:am|pm|a|p)?(?:-\d{1,2}(?::\d{2})?)?(?:am|pm|a|p)\b")
        .expect("valid listing time pattern")
});

/// One listing entry: its blank-line separated parts, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingBlock {
    pub parts: Vec<String>,
}

impl ListingBlock {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    fn date_line(&self) -> &str {
        self.parts.first().map(String::as_str).unwrap_or("")
    }
}

/// Week inference state threaded through one listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekTracker {
    first_weekday: Option<Weekday>,
    seen_different: bool,
    week_increment: u32,
}

impl WeekTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weeks past the anchor's week that the current block belongs to.
    pub fn week_increment(&self) -> u32 {
        self.week_increment
    }

    /// Record the weekday of the next block.
    ///
    /// The increment advances only when the first weekday seen recurs after
    /// at least one different weekday.
    pub fn observe(&mut self, weekday: Weekday) {
        match self.first_weekday {
            None => self.first_weekday = Some(weekday),
            Some(first) if first == weekday && self.seen_different => {
                self.seen_different = false;
                self.week_increment += 1;
            }
            Some(first) if first != weekday => self.seen_different = true,
            Some(_) => {}
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The weekday named on a date line, case-insensitively. When several names
/// appear the earliest one wins.
pub fn find_listing_weekday(line: &str) -> Option<Weekday> {
    let lower = line.to_lowercase();
    LISTING_WEEKDAYS
        .iter()
        .filter_map(|(name, weekday)| lower.find(name).map(|pos| (pos, *weekday)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, weekday)| weekday)
}

/// Split raw listing text into blocks.
///
/// Blocks are separated by a line consisting of `---`; parts within a block
/// are separated by one or more blank lines. Empty blocks are dropped.
pub fn split_listing_text(text: &str) -> Vec<ListingBlock> {
    let mut blocks = Vec::new();
    let mut parts: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed == "---" {
            flush_part(&mut parts, &mut current);
            if !parts.is_empty() {
                blocks.push(ListingBlock {
                    parts: std::mem::take(&mut parts),
                });
            }
        } else if trimmed.is_empty() {
            flush_part(&mut parts, &mut current);
        } else {
            current.push(line.trim_end());
        }
    }
    flush_part(&mut parts, &mut current);
    if !parts.is_empty() {
        blocks.push(ListingBlock { parts });
    }

    blocks
}

fn flush_part(parts: &mut Vec<String>, current: &mut Vec<&str>) {
    if !current.is_empty() {
        parts.push(current.join("\n"));
        current.clear();
    }
}

/// Location lines and candidate time lines from a block's last part.
fn scan_location_and_times(part: &str, config: &EngineConfig) -> (Option<String>, Vec<String>) {
    let mut location_lines = Vec::new();
    let mut time_lines = Vec::new();
    let mut collecting = true;

    for line in part.lines() {
        if line.contains(config.time_separator) {
            time_lines.push(line.to_string());
        }
        if line.contains(config.price_marker) {
            collecting = false;
        }
        if collecting {
            location_lines.push(line.trim());
        }
    }

    let location = location_lines.join("\n").trim().to_string();
    ((!location.is_empty()).then_some(location), time_lines)
}

fn block_occurrences(
    date: NaiveDate,
    time_lines: &[String],
    config: &EngineConfig,
) -> Result<Vec<Occurrence>, EngineError> {
    let joined = time_lines.join("\n");
    let tokens: Vec<&str> = LISTING_TIME.find_iter(&joined).map(|m| m.as_str()).collect();
    let days = expand(DateSpan::single(date), None);

    if tokens.is_empty() {
        return Ok(build_occurrences(
            days,
            None,
            config.default_duration(),
            RuleName::ListingEntry,
        ));
    }

    let mut occurrences = Vec::with_capacity(tokens.len());
    for token in tokens {
        let time = parse_time_range(token)?;
        occurrences.extend(build_occurrences(
            days.clone(),
            Some(&time),
            config.default_duration(),
            RuleName::ListingEntry,
        ));
    }
    Ok(occurrences)
}

fn parse_block(
    block: &ListingBlock,
    weekday: Weekday,
    week_increment: u32,
    anchor: NaiveDate,
    config: &EngineConfig,
) -> Result<EventDraft, EngineError> {
    if block.parts.len() < 3 {
        log::warn!(
            "listing block {} has only {} part(s); treating the last as location/time",
            excerpt(block.date_line()),
            block.parts.len()
        );
    }

    let title = block
        .parts
        .get(1)
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| EngineError::MissingTitle(excerpt(block.date_line())))?;

    let date = next_weekday_on_or_after(anchor, weekday)
        + Duration::weeks(i64::from(week_increment));

    let last = block.parts.last().map(String::as_str).unwrap_or("");
    let (location, time_lines) = scan_location_and_times(last, config);
    let occurrences = block_occurrences(date, &time_lines, config)?;

    Ok(EventDraft {
        title: title.to_string(),
        description: block.parts.join("\n\n"),
        location,
        occurrences,
        source: config.listing_source.clone(),
    })
}

/// Resolve a whole listing, block by block in source order.
///
/// A date line containing the configured upcoming marker resets week
/// tracking after that block's weekday has been observed, so the block itself
/// resolves in the anchor's week.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use occurrence_engine::listing::{parse_listing, ListingBlock};
/// use occurrence_engine::EngineConfig;
///
/// let blocks = vec![
///     ListingBlock::new(["MONDAY", "Open mic", "The Basement\n8pm; free"]),
///     ListingBlock::new(["TUESDAY", "Trivia", "The Pub\n7pm; free"]),
///     ListingBlock::new(["MONDAY", "Open mic", "The Basement\n8pm; free"]),
/// ];
/// let anchor = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(); // a Monday
/// let outcome = parse_listing(&blocks, anchor, &EngineConfig::default());
///
/// let first = outcome.events[0].occurrences[0].start_date();
/// let third = outcome.events[2].occurrences[0].start_date();
/// assert_eq!((third - first).num_days(), 7);
/// ```
pub fn parse_listing(
    blocks: &[ListingBlock],
    anchor: NaiveDate,
    config: &EngineConfig,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    let mut tracker = WeekTracker::new();
    let upcoming = config.upcoming_marker.to_lowercase();

    for (index, block) in blocks.iter().enumerate() {
        let date_line = block.date_line();
        let weekday = find_listing_weekday(date_line);
        if let Some(weekday) = weekday {
            tracker.observe(weekday);
        }
        if !upcoming.is_empty() && date_line.to_lowercase().contains(&upcoming) {
            log::debug!("upcoming marker in block {index}; resetting week tracking");
            tracker.reset();
        }

        let result = weekday
            .ok_or_else(|| EngineError::MissingDateToken(excerpt(date_line)))
            .and_then(|weekday| {
                parse_block(block, weekday, tracker.week_increment(), anchor, config)
            });

        match result {
            Ok(draft) => outcome.events.push(draft),
            Err(error) => {
                let diagnostic = Diagnostic::new(index, error);
                log::warn!("skipping listing block: {diagnostic}");
                outcome.diagnostics.push(diagnostic);
            }
        }
    }

    outcome
}
