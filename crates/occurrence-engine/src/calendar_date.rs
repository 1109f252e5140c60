//! Calendar-date resolution.
//!
//! Resolves a date token (`Fri`, `sat-sun`, `6/7`, `6/7-9`, `6/28-7/2`,
//! `thru Sunday`) into a [`DateSpan`] of absolute civil dates. The anchor date
//! supplies everything the token leaves out: the year of a month/day, the
//! week of a bare weekday, and the start of an open-ended `thru` range.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::error::{excerpt, EngineError};

/// Recognized weekday spellings, longest first within each day so regex
/// alternations built from this table prefer the full word.
pub const WEEKDAY_NAMES: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("mon", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("tues", Weekday::Tue),
    ("tue", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("weds", Weekday::Wed),
    ("wed", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("thurs", Weekday::Thu),
    ("thur", Weekday::Thu),
    ("thu", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("fri", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sat", Weekday::Sat),
    ("sunday", Weekday::Sun),
    ("sun", Weekday::Sun),
];

/// An inclusive range of civil dates; `end >= start` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateSpan {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateSpan {
    /// Build a span, returning `None` if `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both ends.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

/// Parse a weekday name (case-insensitive; trailing punctuation ignored).
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    let s = s
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase();
    WEEKDAY_NAMES
        .iter()
        .find(|(name, _)| *name == s)
        .map(|(_, weekday)| *weekday)
}

/// The first date on or after `anchor` that falls on `weekday`.
pub fn next_weekday_on_or_after(anchor: NaiveDate, weekday: Weekday) -> NaiveDate {
    let delta = (7 + weekday.num_days_from_monday() as i64
        - anchor.weekday().num_days_from_monday() as i64)
        % 7;
    anchor + Duration::days(delta)
}

/// Resolve a `month/day` token, assigning it to next year when its month is
/// earlier in the calendar than the anchor's.
pub fn resolve_month_day(token: &str, anchor: NaiveDate) -> Result<NaiveDate, EngineError> {
    let (month_str, day_str) = token
        .trim()
        .split_once('/')
        .ok_or_else(|| malformed(token))?;
    let month = parse_number(month_str).ok_or_else(|| malformed(token))?;
    let day = parse_number(day_str).ok_or_else(|| malformed(token))?;

    let year = if month < anchor.month() {
        anchor.year() + 1
    } else {
        anchor.year()
    };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| malformed(token))
}

/// Resolve a date token into a [`DateSpan`].
///
/// Grammar (case-insensitive, trailing `.`/`:`/`,` ignored):
///
/// - `weekday`: next occurrence on/after the anchor
/// - `weekday-weekday`, `weekday thru weekday`
/// - `month/day`, `month/day-day`, `month/day-month/day`, `month/day thru month/day`
/// - `thru <date>`: open-ended; the anchor itself is the implicit start
///
/// A weekday range end that precedes the start rolls forward by whole weeks
/// and a bare day number rolls into the next month. An explicit month/day end
/// follows the same year rule as any month/day and is never rolled.
///
/// # Errors
///
/// [`EngineError::UnknownWeekdayName`] for an alphabetic token that is not a
/// weekday, [`EngineError::MalformedDateToken`] for anything else unparseable
/// (including impossible dates like `2/30`, or a month/day end before the
/// start).
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use occurrence_engine::calendar_date::resolve_date_token;
///
/// let anchor = NaiveDate::from_ymd_opt(2024, 6, 7).unwrap(); // a Friday
/// let span = resolve_date_token("Sat-Sun", anchor).unwrap();
/// assert_eq!(span.start(), NaiveDate::from_ymd_opt(2024, 6, 8).unwrap());
/// assert_eq!(span.end(), NaiveDate::from_ymd_opt(2024, 6, 9).unwrap());
/// ```
pub fn resolve_date_token(token: &str, anchor: NaiveDate) -> Result<DateSpan, EngineError> {
    let normalized = normalize_token(token);
    if normalized.is_empty() {
        return Err(malformed(token));
    }

    if let Some(rest) = strip_thru_prefix(&normalized) {
        let end = resolve_range_end(rest, anchor, anchor)?;
        return span(anchor, end, token);
    }

    let (start_str, end_str) = split_range(&normalized);
    let start = resolve_single(start_str, anchor)?;
    let end = match end_str {
        Some(e) => resolve_range_end(e, start, anchor)?,
        None => start,
    };
    span(start, end, token)
}

fn span(start: NaiveDate, end: NaiveDate, token: &str) -> Result<DateSpan, EngineError> {
    DateSpan::new(start, end).ok_or_else(|| malformed(token))
}

fn malformed(token: &str) -> EngineError {
    EngineError::MalformedDateToken(excerpt(token))
}

fn normalize_token(token: &str) -> String {
    token
        .trim()
        .trim_end_matches(['.', ':', ',', ';'])
        .trim()
        .to_lowercase()
}

fn strip_thru_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("thru ")
        .or_else(|| s.strip_prefix("through "))
        .map(str::trim)
}

/// Split `start-end` / `start thru end`; the word form wins so that a hyphen
/// inside either side is left alone.
fn split_range(s: &str) -> (&str, Option<&str>) {
    for sep in [" thru ", " through "] {
        if let Some((start, end)) = s.split_once(sep) {
            return (start.trim(), Some(end.trim()));
        }
    }
    match s.split_once('-') {
        Some((start, end)) => (start.trim(), Some(end.trim())),
        None => (s, None),
    }
}

fn parse_number(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() || s.len() > 2 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn resolve_single(token: &str, anchor: NaiveDate) -> Result<NaiveDate, EngineError> {
    if token.contains('/') {
        return resolve_month_day(token, anchor);
    }
    if !token.is_empty() && token.chars().all(|c| c.is_alphabetic()) {
        let weekday = parse_weekday(token)
            .ok_or_else(|| EngineError::UnknownWeekdayName(format!("'{token}'")))?;
        return Ok(next_weekday_on_or_after(anchor, weekday));
    }
    Err(malformed(token))
}

fn resolve_range_end(
    token: &str,
    start: NaiveDate,
    anchor: NaiveDate,
) -> Result<NaiveDate, EngineError> {
    // Bare day number: inherits the start's month, or the following month if
    // that would land before the start (`6/28-2`).
    if let Some(day) = parse_number(token) {
        let same_month = NaiveDate::from_ymd_opt(start.year(), start.month(), day);
        return match same_month {
            Some(end) if end >= start => Ok(end),
            _ => {
                let (year, month) = if start.month() == 12 {
                    (start.year() + 1, 1)
                } else {
                    (start.year(), start.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| malformed(token))
            }
        };
    }

    // An explicit month/day keeps the year rule; an end before the start is
    // rejected by `span`.
    if token.contains('/') {
        return resolve_month_day(token, anchor);
    }

    let mut end = resolve_single(token, anchor)?;
    while end < start {
        end += Duration::weeks(1);
    }
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn friday() -> NaiveDate {
        // Friday, June 7, 2024
        date(2024, 6, 7)
    }

    #[test]
    fn test_weekday_same_day_is_anchor() {
        let span = resolve_date_token("Friday", friday()).unwrap();
        assert_eq!(span, DateSpan::single(friday()));
    }

    #[test]
    fn test_weekday_later_in_week() {
        let span = resolve_date_token("sat", friday()).unwrap();
        assert_eq!(span.start(), date(2024, 6, 8));
        assert!(span.is_single_day());
    }

    #[test]
    fn test_weekday_wraps_into_next_week() {
        let span = resolve_date_token("Thurs", friday()).unwrap();
        assert_eq!(span.start(), date(2024, 6, 13));
    }

    #[test]
    fn test_weekday_abbreviations() {
        for (token, expected) in [
            ("mon", date(2024, 6, 10)),
            ("tues", date(2024, 6, 11)),
            ("weds", date(2024, 6, 12)),
            ("WED", date(2024, 6, 12)),
            ("thu", date(2024, 6, 13)),
            ("sun.", date(2024, 6, 9)),
        ] {
            let span = resolve_date_token(token, friday()).unwrap();
            assert_eq!(span.start(), expected, "token {token}");
        }
    }

    #[test]
    fn test_weekday_range() {
        let span = resolve_date_token("Sat-Sun", friday()).unwrap();
        assert_eq!(span.start(), date(2024, 6, 8));
        assert_eq!(span.end(), date(2024, 6, 9));
    }

    #[test]
    fn test_weekday_range_end_rolls_forward_by_weeks() {
        // Thursday resolves to the 13th, Sunday independently to the 9th,
        // so the end is pushed a week out.
        let span = resolve_date_token("Thu-Sun", friday()).unwrap();
        assert_eq!(span.start(), date(2024, 6, 13));
        assert_eq!(span.end(), date(2024, 6, 16));
    }

    #[test]
    fn test_weekday_thru_weekday() {
        let span = resolve_date_token("Fri thru Sun", friday()).unwrap();
        assert_eq!(span.start(), friday());
        assert_eq!(span.end(), date(2024, 6, 9));
    }

    #[test]
    fn test_open_ended_thru_weekday() {
        // Wednesday, June 5
        let anchor = date(2024, 6, 5);
        let span = resolve_date_token("thru Sunday.", anchor).unwrap();
        assert_eq!(span.start(), anchor);
        assert_eq!(span.end(), date(2024, 6, 9));
    }

    #[test]
    fn test_open_ended_thru_month_day() {
        let span = resolve_date_token("thru 6/30", friday()).unwrap();
        assert_eq!(span.start(), friday());
        assert_eq!(span.end(), date(2024, 6, 30));
        assert_eq!(span.len_days(), 24);
    }

    #[test]
    fn test_month_day_same_year() {
        let span = resolve_date_token("6/15", friday()).unwrap();
        assert_eq!(span, DateSpan::single(date(2024, 6, 15)));
        let span = resolve_date_token("11/2", friday()).unwrap();
        assert_eq!(span.start(), date(2024, 11, 2));
    }

    #[test]
    fn test_month_day_earlier_month_is_next_year() {
        let span = resolve_date_token("1/4", friday()).unwrap();
        assert_eq!(span.start(), date(2025, 1, 4));
    }

    #[test]
    fn test_month_day_range_with_bare_end_day() {
        let span = resolve_date_token("6/7-9", friday()).unwrap();
        assert_eq!(span.start(), date(2024, 6, 7));
        assert_eq!(span.end(), date(2024, 6, 9));
    }

    #[test]
    fn test_bare_end_day_before_start_rolls_into_next_month() {
        let span = resolve_date_token("6/28-2", friday()).unwrap();
        assert_eq!(span.end(), date(2024, 7, 2));
    }

    #[test]
    fn test_month_day_range_across_months() {
        let span = resolve_date_token("6/28-7/2", friday()).unwrap();
        assert_eq!(span.start(), date(2024, 6, 28));
        assert_eq!(span.end(), date(2024, 7, 2));
    }

    #[test]
    fn test_month_day_range_across_year_end() {
        let anchor = date(2024, 12, 20);
        let span = resolve_date_token("12/28-1/3", anchor).unwrap();
        assert_eq!(span.start(), date(2024, 12, 28));
        assert_eq!(span.end(), date(2025, 1, 3));
    }

    #[test]
    fn test_month_day_end_before_start_is_malformed() {
        // May resolves into next year but June stays in this one.
        assert!(matches!(
            resolve_date_token("5/30-6/2", friday()),
            Err(EngineError::MalformedDateToken(_))
        ));
        // 6/3 is in the anchor's month, so it stays in 2024, before the anchor.
        assert!(matches!(
            resolve_date_token("thru 6/3.", friday()),
            Err(EngineError::MalformedDateToken(_))
        ));
    }

    #[test]
    fn test_month_day_thru_month_day() {
        let span = resolve_date_token("6/7 thru 6/16", friday()).unwrap();
        assert_eq!(span.len_days(), 10);
    }

    #[test]
    fn test_unknown_weekday_name() {
        let err = resolve_date_token("Funday", friday()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownWeekdayName(_)));
        let err = resolve_date_token("sat-someday", friday()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownWeekdayName(_)));
    }

    #[test]
    fn test_impossible_month_day_is_malformed() {
        assert!(matches!(
            resolve_date_token("2/30", friday()),
            Err(EngineError::MalformedDateToken(_))
        ));
        assert!(matches!(
            resolve_date_token("13/1", friday()),
            Err(EngineError::MalformedDateToken(_))
        ));
        assert!(matches!(
            resolve_date_token("", friday()),
            Err(EngineError::MalformedDateToken(_))
        ));
    }

    #[test]
    fn test_parse_weekday_table() {
        assert_eq!(parse_weekday("Thursday"), Some(Weekday::Thu));
        assert_eq!(parse_weekday("SAT"), Some(Weekday::Sat));
        assert_eq!(parse_weekday("satur"), None);
    }

    #[test]
    fn test_next_weekday_never_before_anchor() {
        let anchor = date(2024, 6, 5);
        for (_, weekday) in WEEKDAY_NAMES {
            let resolved = next_weekday_on_or_after(anchor, *weekday);
            assert_eq!(resolved.weekday(), *weekday);
            assert!(resolved >= anchor);
            assert!((resolved - anchor).num_days() < 7);
        }
    }
}
