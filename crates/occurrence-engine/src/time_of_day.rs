//! Time-of-day resolution.
//!
//! Turns a clock token such as `8pm`, `11am-6pm`, `(7:30-10p)` or `10pm-2am`
//! into a [`TimeRange`]. Listings routinely state the AM/PM qualifier only
//! once per range. An unqualified start borrows the end's qualifier; an
//! unqualified end is always PM, so `10pm-2` ends at 14:00 the next day and
//! `10am-2` ends at 14:00 the same day.

use std::fmt;

use chrono::NaiveTime;
use serde::Serialize;

use crate::error::{excerpt, EngineError};

/// A wall-clock time on a 24-hour dial.
///
/// Field order matters: the derived `Ord` compares hour first, then minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn to_naive(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// A start time with an optional end.
///
/// `end == None` means the duration was not stated; the occurrence builder
/// substitutes the configured default span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: Option<TimeOfDay>,
    /// The end falls on the calendar day after the start (`10pm-2am`).
    pub carries_to_next_day: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

/// One side of a range before the qualifier is settled.
#[derive(Debug, Clone, Copy)]
struct ClockSide {
    hour: u32,
    minute: u32,
    meridiem: Option<Meridiem>,
}

impl ClockSide {
    fn resolve(self, meridiem: Meridiem) -> TimeOfDay {
        let hour = ((12 + self.hour) % 12) + if meridiem == Meridiem::Pm { 12 } else { 0 };
        TimeOfDay {
            hour,
            minute: self.minute,
        }
    }
}

/// Parse a time or time-range token.
///
/// Grammar: `H(:MM)?(am|pm|a|p)?(-H(:MM)?(am|pm|a|p)?)?`, optionally wrapped
/// in parentheses, case-insensitive.
///
/// # Errors
///
/// Returns [`EngineError::MalformedTimeToken`] if the token is empty, an hour
/// falls outside 1–12, or a minute outside 0–59.
///
/// # Examples
///
/// ```
/// use occurrence_engine::time_of_day::parse_time_range;
///
/// let range = parse_time_range("10pm-2am").unwrap();
/// assert_eq!(range.start.hour, 22);
/// assert_eq!(range.end.unwrap().hour, 2);
/// assert!(range.carries_to_next_day);
/// ```
pub fn parse_time_range(token: &str) -> Result<TimeRange, EngineError> {
    let cleaned: String = token
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '.') && !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    if cleaned.is_empty() {
        return Err(EngineError::MalformedTimeToken(excerpt(token)));
    }

    let (start_str, end_str) = match cleaned.split_once('-') {
        Some((s, e)) => (s, Some(e)),
        None => (cleaned.as_str(), None),
    };

    let start = parse_clock_side(start_str).ok_or_else(|| malformed(token))?;
    let end = end_str
        .map(|e| parse_clock_side(e).ok_or_else(|| malformed(token)))
        .transpose()?;

    let start_meridiem = start
        .meridiem
        .or(end.and_then(|e| e.meridiem))
        .unwrap_or(Meridiem::Pm);
    let start_time = start.resolve(start_meridiem);

    // Only the start borrows; an unqualified end is PM.
    let end_time = end.map(|e| e.resolve(e.meridiem.unwrap_or(Meridiem::Pm)));

    Ok(TimeRange {
        start: start_time,
        end: end_time,
        carries_to_next_day: end_time.is_some_and(|e| e < start_time),
    })
}

fn malformed(token: &str) -> EngineError {
    EngineError::MalformedTimeToken(excerpt(token))
}

/// Parse `H`, `H:MM`, each optionally suffixed with `am`/`pm`/`a`/`p`.
fn parse_clock_side(s: &str) -> Option<ClockSide> {
    let (digits, meridiem) = if let Some(rest) = s.strip_suffix("am") {
        (rest, Some(Meridiem::Am))
    } else if let Some(rest) = s.strip_suffix("pm") {
        (rest, Some(Meridiem::Pm))
    } else if let Some(rest) = s.strip_suffix('a') {
        (rest, Some(Meridiem::Am))
    } else if let Some(rest) = s.strip_suffix('p') {
        (rest, Some(Meridiem::Pm))
    } else {
        (s, None)
    };

    let (hour_str, minute_str) = match digits.split_once(':') {
        Some((h, m)) => (h, Some(m)),
        None => (digits, None),
    };

    if hour_str.is_empty() || !hour_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = hour_str.parse().ok()?;
    if !(1..=12).contains(&hour) {
        return None;
    }

    let minute = match minute_str {
        Some(m) if !m.is_empty() && m.len() <= 2 && m.chars().all(|c| c.is_ascii_digit()) => {
            m.parse::<u32>().ok().filter(|m| *m < 60)?
        }
        Some(_) => return None,
        None => 0,
    };

    Some(ClockSide {
        hour,
        minute,
        meridiem,
    })
}
