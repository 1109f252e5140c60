//! Range expansion.
//!
//! A [`DateSpan`] is expanded lazily into individual days, optionally keeping
//! only the days a [`WeekdayFilter`] admits. The iterator is `Clone`, so a
//! caller can walk the same expansion twice (once per parallel time, for
//! instance) without re-resolving the span.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::calendar_date::{parse_weekday, DateSpan};

/// Restricts an expanded range to a subset of weekdays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekdayFilter {
    /// Saturday and Sunday.
    Weekends,
    /// Monday through Friday.
    Weekdays,
    /// A single named weekday ("Fridays").
    Only(Weekday),
}

impl WeekdayFilter {
    pub fn admits(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday();
        match self {
            WeekdayFilter::Weekends => matches!(weekday, Weekday::Sat | Weekday::Sun),
            WeekdayFilter::Weekdays => !matches!(weekday, Weekday::Sat | Weekday::Sun),
            WeekdayFilter::Only(only) => weekday == *only,
        }
    }

    /// Parse a filter keyword: `weekends`, `weekdays`, or a plural weekday
    /// (`fridays`, `sats`). Case-insensitive.
    pub fn parse(keyword: &str) -> Option<Self> {
        let keyword = keyword.trim().to_lowercase();
        match keyword.as_str() {
            "weekends" | "weekend" => Some(WeekdayFilter::Weekends),
            "weekdays" => Some(WeekdayFilter::Weekdays),
            other => other
                .strip_suffix('s')
                .and_then(parse_weekday)
                .map(WeekdayFilter::Only),
        }
    }
}

/// Lazily walks the days of a span in ascending order.
#[derive(Debug, Clone)]
pub struct Days {
    next: Option<NaiveDate>,
    end: NaiveDate,
    filter: Option<WeekdayFilter>,
}

impl Iterator for Days {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        while let Some(current) = self.next {
            if current > self.end {
                self.next = None;
                break;
            }
            self.next = current.succ_opt();
            if self.filter.is_none_or(|f| f.admits(current)) {
                return Some(current);
            }
        }
        None
    }
}

/// Expand `span` into its days, start to end inclusive.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use occurrence_engine::calendar_date::DateSpan;
/// use occurrence_engine::expand::{expand, WeekdayFilter};
///
/// let start = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(); // Monday
/// let end = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap(); // Sunday
/// let span = DateSpan::new(start, end).unwrap();
/// assert_eq!(expand(span, None).count(), 7);
/// assert_eq!(expand(span, Some(WeekdayFilter::Weekends)).count(), 2);
/// ```
pub fn expand(span: DateSpan, filter: Option<WeekdayFilter>) -> Days {
    Days {
        next: Some(span.start()),
        end: span.end(),
        filter,
    }
}

/// Group ascending days into runs of consecutive dates, returned as
/// `(first, last)` pairs.
pub fn consecutive_runs(days: impl IntoIterator<Item = NaiveDate>) -> Vec<(NaiveDate, NaiveDate)> {
    let mut runs: Vec<(NaiveDate, NaiveDate)> = Vec::new();
    for day in days {
        match runs.last_mut() {
            Some((_, last)) if last.succ_opt() == Some(day) => *last = day,
            _ => runs.push((day, day)),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn span(start: NaiveDate, end: NaiveDate) -> DateSpan {
        DateSpan::new(start, end).unwrap()
    }

    #[test]
    fn test_single_day_yields_one_date() {
        let days: Vec<_> = expand(DateSpan::single(date(2024, 6, 7)), None).collect();
        assert_eq!(days, vec![date(2024, 6, 7)]);
    }

    #[test]
    fn test_three_day_span_in_order() {
        let days: Vec<_> = expand(span(date(2024, 6, 30), date(2024, 7, 2)), None).collect();
        assert_eq!(days, vec![date(2024, 6, 30), date(2024, 7, 1), date(2024, 7, 2)]);
    }

    #[test]
    fn test_weekend_filter_over_week() {
        let days: Vec<_> = expand(
            span(date(2024, 6, 3), date(2024, 6, 9)),
            Some(WeekdayFilter::Weekends),
        )
        .collect();
        assert_eq!(days, vec![date(2024, 6, 8), date(2024, 6, 9)]);
    }

    #[test]
    fn test_single_weekday_filter_over_month() {
        let fridays: Vec<_> = expand(
            span(date(2024, 6, 1), date(2024, 6, 30)),
            Some(WeekdayFilter::Only(Weekday::Fri)),
        )
        .collect();
        assert_eq!(fridays.len(), 4);
        assert!(fridays.iter().all(|d| d.weekday() == Weekday::Fri));
    }

    #[test]
    fn test_filter_with_no_matching_day_is_empty() {
        let days: Vec<_> = expand(
            span(date(2024, 6, 3), date(2024, 6, 5)),
            Some(WeekdayFilter::Weekends),
        )
        .collect();
        assert!(days.is_empty());
    }

    #[test]
    fn test_expansion_is_restartable() {
        let days = expand(span(date(2024, 6, 3), date(2024, 6, 9)), None);
        let first: Vec<_> = days.clone().collect();
        let second: Vec<_> = days.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_long_span_is_linear() {
        let days = expand(span(date(2024, 1, 1), date(2024, 12, 31)), None);
        assert_eq!(days.count(), 366);
    }

    #[test]
    fn test_parse_filter_keywords() {
        assert_eq!(WeekdayFilter::parse("Weekends"), Some(WeekdayFilter::Weekends));
        assert_eq!(WeekdayFilter::parse("weekdays"), Some(WeekdayFilter::Weekdays));
        assert_eq!(
            WeekdayFilter::parse("FRIDAYS"),
            Some(WeekdayFilter::Only(Weekday::Fri))
        );
        assert_eq!(
            WeekdayFilter::parse("sats"),
            Some(WeekdayFilter::Only(Weekday::Sat))
        );
        assert_eq!(WeekdayFilter::parse("friday"), None);
        assert_eq!(WeekdayFilter::parse("holidays"), None);
    }

    #[test]
    fn test_consecutive_runs_splits_on_gaps() {
        let runs = consecutive_runs(expand(
            span(date(2024, 6, 1), date(2024, 6, 16)),
            Some(WeekdayFilter::Weekends),
        ));
        assert_eq!(
            runs,
            vec![
                (date(2024, 6, 1), date(2024, 6, 2)),
                (date(2024, 6, 8), date(2024, 6, 9)),
                (date(2024, 6, 15), date(2024, 6, 16)),
            ]
        );
    }

    #[test]
    fn test_consecutive_runs_unfiltered_is_one_run() {
        let runs = consecutive_runs(expand(span(date(2024, 6, 5), date(2024, 6, 9)), None));
        assert_eq!(runs, vec![(date(2024, 6, 5), date(2024, 6, 9))]);
    }
}
