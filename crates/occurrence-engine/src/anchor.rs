//! Anchor date parsing.
//!
//! The anchor is the "today" every relative expression resolves against. Feeds
//! publish it as an RFC 2822 `pubDate`, pasted listings usually come with a
//! plain ISO date, and both need to land on a civil date in the engine's zone.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

use crate::error::EngineError;

/// Parse an anchor into the civil date it denotes in `tz`.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 (`2024-06-07T09:00:00-04:00`), or RFC 2822
/// (`Fri, 07 Jun 2024 09:00:00 -0400`). Instants are converted into `tz`
/// before the date is taken, so a late-evening UTC timestamp lands on the
/// local calendar day.
///
/// # Errors
///
/// Returns [`EngineError::InvalidAnchor`] if none of the formats parse.
pub fn parse_anchor(text: &str, tz: &Tz) -> Result<NaiveDate, EngineError> {
    let s = text.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(tz).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Ok(dt.with_timezone(tz).date_naive());
    }

    Err(EngineError::InvalidAnchor(format!("'{s}'")))
}
