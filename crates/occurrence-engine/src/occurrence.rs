//! Occurrence and event records.
//!
//! These are the engine's output contract. An [`Occurrence`] carries civil
//! start/end times in the engine's single zone; [`CalendarTime`] is the
//! rendering a calendar API expects (date-only for all-day entries, a zoned
//! date-time for timed ones).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::cascade::RuleName;
use crate::error::Diagnostic;
use crate::expand::consecutive_runs;
use crate::time_of_day::TimeRange;

/// One concrete instance of an event.
///
/// For all-day occurrences (`has_time == false`) both ends sit at midnight and
/// `end` is exclusive: one day past the last covered date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub has_time: bool,
    /// Which cascade rule produced this occurrence. Diagnostic only.
    pub matched_rule: RuleName,
}

impl Occurrence {
    /// An all-day occurrence covering `first..=last`.
    pub fn all_day(first: NaiveDate, last: NaiveDate, rule: RuleName) -> Self {
        let end = last.succ_opt().unwrap_or(last);
        Self {
            start: first.and_time(NaiveTime::MIN),
            end: end.and_time(NaiveTime::MIN),
            has_time: false,
            matched_rule: rule,
        }
    }

    /// A timed occurrence on `day`.
    ///
    /// Without an end time the occurrence lasts `default_duration`; an end
    /// that carries to the next day is placed on the following date.
    pub fn timed(day: NaiveDate, time: &TimeRange, default_duration: Duration, rule: RuleName) -> Self {
        let start = day.and_time(time.start.to_naive());
        let end = match time.end {
            Some(end) => {
                let end_day = if time.carries_to_next_day {
                    day.succ_opt().unwrap_or(day)
                } else {
                    day
                };
                end_day.and_time(end.to_naive())
            }
            None => start + default_duration,
        };
        Self {
            start,
            end,
            has_time: true,
            matched_rule: rule,
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }

    pub fn calendar_start(&self, tz: &Tz) -> CalendarTime {
        CalendarTime::render(self.start, self.has_time, tz)
    }

    pub fn calendar_end(&self, tz: &Tz) -> CalendarTime {
        CalendarTime::render(self.end, self.has_time, tz)
    }
}

/// Build occurrences for a set of expanded days.
///
/// Timed input yields one occurrence per day. All-day input is grouped into
/// runs of consecutive days, each run becoming a single all-day occurrence.
pub fn build_occurrences(
    days: impl IntoIterator<Item = NaiveDate>,
    time: Option<&TimeRange>,
    default_duration: Duration,
    rule: RuleName,
) -> Vec<Occurrence> {
    match time {
        Some(time) => days
            .into_iter()
            .map(|day| Occurrence::timed(day, time, default_duration, rule))
            .collect(),
        None => consecutive_runs(days)
            .into_iter()
            .map(|(first, last)| Occurrence::all_day(first, last, rule))
            .collect(),
    }
}

/// How a calendar API wants an occurrence boundary expressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CalendarTime {
    Date {
        date: NaiveDate,
    },
    #[serde(rename_all = "camelCase")]
    DateTime {
        /// RFC 3339 with the zone's offset at that instant.
        date_time: String,
        time_zone: String,
    },
}

impl CalendarTime {
    fn render(naive: NaiveDateTime, has_time: bool, tz: &Tz) -> Self {
        if !has_time {
            return CalendarTime::Date { date: naive.date() };
        }
        CalendarTime::DateTime {
            date_time: localize(naive, tz).to_rfc3339(),
            time_zone: tz.name().to_string(),
        }
    }
}

/// Attach `tz` to a civil time. Ambiguous times take the earlier instant;
/// times inside a spring-forward gap move past it.
fn localize(naive: NaiveDateTime, tz: &Tz) -> DateTime<Tz> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// Where a draft came from, for attribution on the calendar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSource {
    pub title: String,
    pub url: String,
}

/// A titled event with every occurrence resolved from its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub occurrences: Vec<Occurrence>,
    pub source: Option<EventSource>,
}

/// One calendar insertion: a draft flattened against a single occurrence.
///
/// Title, location, start, and end together are the lookup key a calendar
/// collaborator uses to decide whether the entry already exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    pub summary: String,
    pub description: String,
    pub location: Option<String>,
    pub start: CalendarTime,
    pub end: CalendarTime,
    pub source: Option<EventSource>,
}

impl EventDraft {
    pub fn calendar_entries(&self, tz: &Tz) -> Vec<CalendarEntry> {
        self.occurrences
            .iter()
            .map(|occurrence| CalendarEntry {
                summary: self.title.clone(),
                description: self.description.clone(),
                location: self.location.clone(),
                start: occurrence.calendar_start(tz),
                end: occurrence.calendar_end(tz),
                source: self.source.clone(),
            })
            .collect()
    }
}

/// Everything a front end produced from one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub events: Vec<EventDraft>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BatchOutcome {
    pub fn occurrence_count(&self) -> usize {
        self.events.iter().map(|e| e.occurrences.len()).sum()
    }

    pub fn calendar_entries(&self, tz: &Tz) -> Vec<CalendarEntry> {
        self.events
            .iter()
            .flat_map(|event| event.calendar_entries(tz))
            .collect()
    }
}
