//! The pattern cascade.
//!
//! A fragment of event prose usually holds several things that look like
//! dates and times, and more than one grammar rule can match overlapping
//! parts of it. Rules are therefore tried in a fixed priority order, most
//! specific first, and the first rule with an accepted match owns the whole
//! fragment; only that first match is used.
//!
//! | # | rule | example |
//! |---|------|---------|
//! | 1 | [`RuleName::OpenEndedRange`] | `thru Sunday.` |
//! | 2 | [`RuleName::DateTwoTimes`] | `Fri 6pm + 9pm` |
//! | 3 | [`RuleName::TwoDates`] | `Fri + Sat 8pm`, `6/7 + 6/14` |
//! | 4 | [`RuleName::FilteredTimeThenDate`] | `Saturdays 2pm 6/1-6/29` |
//! | 4 | [`RuleName::FilteredDateThenTime`] | `weekends 6/1-6/30 11am-6pm` |
//! | 5 | [`RuleName::TimeThenDate`] | `8pm Friday` |
//! | 6 | [`RuleName::DateThenTime`] | `Sat-Sun 11am-6pm`, `6/15.` |

use std::collections::BTreeSet;
use std::fmt;

use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::calendar_date::{resolve_date_token, DateSpan, WEEKDAY_NAMES};
use crate::config::EngineConfig;
use crate::error::{excerpt, EngineError, Result};
use crate::expand::{expand, WeekdayFilter};
use crate::occurrence::{build_occurrences, Occurrence};
use crate::time_of_day::{parse_time_range, TimeRange};

/// Identifies the cascade rule that produced an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleName {
    OpenEndedRange,
    DateTwoTimes,
    TwoDates,
    FilteredTimeThenDate,
    FilteredDateThenTime,
    TimeThenDate,
    DateThenTime,
    /// Not a cascade rule: a weekday-keyed block of a plain-text listing.
    ListingEntry,
}

impl RuleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleName::OpenEndedRange => "open-ended-range",
            RuleName::DateTwoTimes => "date-two-times",
            RuleName::TwoDates => "two-dates",
            RuleName::FilteredTimeThenDate => "filtered-time-then-date",
            RuleName::FilteredDateThenTime => "filtered-date-then-time",
            RuleName::TimeThenDate => "time-then-date",
            RuleName::DateThenTime => "date-then-time",
            RuleName::ListingEntry => "listing-entry",
        }
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The occurrences a fragment resolved to, with the rule and text that
/// produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub rule: RuleName,
    pub matched: String,
    pub occurrences: Vec<Occurrence>,
}

/// Why a fragment produced nothing. `rule`/`matched` are set when a rule
/// claimed the fragment but its tokens failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unresolved {
    pub rule: Option<RuleName>,
    pub matched: Option<String>,
    pub error: EngineError,
}

struct Context {
    anchor: NaiveDate,
    default_duration: Duration,
}

type Builder = fn(&Captures<'_>, &Context) -> Result<Vec<Occurrence>>;

struct Rule {
    name: RuleName,
    pattern: Regex,
    /// Second-stage check on a raw match; a rejected match is skipped and
    /// the search continues after it.
    accept: fn(&Captures<'_>) -> bool,
    build: Builder,
}

impl Rule {
    fn new(name: RuleName, pattern: &str, build: Builder) -> Self {
        Self {
            name,
            pattern: compile(pattern),
            accept: |_| true,
            build,
        }
    }

    fn with_accept(mut self, accept: fn(&Captures<'_>) -> bool) -> Self {
        self.accept = accept;
        self
    }

    fn first_match<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.pattern
            .captures_iter(text)
            .find(|caps| (self.accept)(caps))
    }
}

// ── Grammar fragments ───────────────────────────────────────────────────────

static WEEKDAY: Lazy<String> = Lazy::new(|| {
    let names: Vec<&str> = WEEKDAY_NAMES.iter().map(|(name, _)| *name).collect();
    format!(r"\b(?:{})\b", names.join("|"))
});

static WEEKDAY_RANGE: Lazy<String> =
    Lazy::new(|| format!(r"{wd}(?:\s*-\s*{wd}|\s+thru\s+{wd})?", wd = *WEEKDAY));

const MONTH_DAY: &str = r"\b\d{1,2}/\d{1,2}(?:(?:\s*-\s*|\s+thru\s+)\d{1,2}(?:/\d{1,2})?)?\b";

const SINGLE_MONTH_DAY: &str = r"\b\d{1,2}/\d{1,2}\b";

static DATE: Lazy<String> = Lazy::new(|| format!(r"(?:{}|{})", *WEEKDAY_RANGE, MONTH_DAY));

static DATE_ATOM: Lazy<String> = Lazy::new(|| format!(r"(?:{}|{})", *WEEKDAY, SINGLE_MONTH_DAY));

/// A trailing qualifier is required so bare numbers in prose are not taken
/// for times.
const TIME: &str =
    r"\(?\b\d{1,2}(?::\d{2})?(?:am|pm)?(?:\s*-\s*\d{1,2}(?::\d{2})?)?(?:am|pm)\b\)?";

const FILTER: &str =
    r"\b(?:weekends|weekdays|mondays|tuesdays|wednesdays|thursdays|fridays|saturdays|sundays)\b";

fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}"))
        .unwrap_or_else(|e| panic!("cascade pattern failed to compile: {e}"))
}

/// The cascade, in priority order.
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    let date = &*DATE;
    let atom = &*DATE_ATOM;
    vec![
        Rule::new(
            RuleName::OpenEndedRange,
            &format!(r"(?P<lead>{atom}\s+)?\b(?:thru|through)\s+(?P<date>{atom})(?:[.:,;!)]|\s|$)"),
            build_open_ended,
        )
        .with_accept(|caps| caps.name("lead").is_none()),
        Rule::new(
            RuleName::DateTwoTimes,
            &format!(
                r"(?P<date>{date})[,:]?\s+(?:at\s+)?(?P<first>{TIME})\s*[+&]\s*(?P<second>{TIME})"
            ),
            build_date_two_times,
        ),
        Rule::new(
            RuleName::TwoDates,
            &format!(
                r"(?P<first>{date})\s*[+&]\s*(?P<second>{date})(?:[,:]?\s+(?:at\s+)?(?P<time>{TIME}))?"
            ),
            build_two_dates,
        ),
        Rule::new(
            RuleName::FilteredTimeThenDate,
            &format!(
                r"(?P<filter>{FILTER})[,:]?\s+(?:at\s+)?(?P<time>{TIME})[,:]?\s+(?:from\s+)?(?P<date>{date})"
            ),
            build_filtered_time_then_date,
        ),
        Rule::new(
            RuleName::FilteredDateThenTime,
            &format!(
                r"(?:(?P<filter_a>{FILTER})[,:]?\s+(?:from\s+)?(?P<date_a>{date})|(?P<date_b>{date})[,:]?\s+(?P<filter_b>{FILTER}))(?:[,:]?\s+(?:at\s+)?(?P<time>{TIME}))?"
            ),
            build_filtered_date_then_time,
        ),
        Rule::new(
            RuleName::TimeThenDate,
            &format!(r"(?P<time>{TIME})[,:]?\s+(?:on\s+)?(?P<date>{date})"),
            build_time_then_date,
        ),
        Rule::new(
            RuleName::DateThenTime,
            &format!(
                r"(?P<date>{date})(?:[,:]?\s+(?:at\s+|from\s+)?(?P<time>{TIME})|[.:,;]|\s*$)"
            ),
            build_date_then_time,
        ),
    ]
});

/// The rule names in the order they are tried.
pub fn rule_order() -> Vec<RuleName> {
    RULES.iter().map(|rule| rule.name).collect()
}

/// Resolve a fragment of prose into occurrences.
///
/// # Errors
///
/// Returns [`Unresolved`] carrying [`EngineError::NoPatternMatched`] when no
/// rule matches, or the token error (with the owning rule and its matched
/// text) when a rule matched but its date or time could not be resolved.
/// The owning rule is never skipped in favour of a later one.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use occurrence_engine::cascade::{resolve_fragment, RuleName};
/// use occurrence_engine::EngineConfig;
///
/// let anchor = NaiveDate::from_ymd_opt(2024, 6, 7).unwrap();
/// let resolution =
///     resolve_fragment("Friday 6pm + 9pm at the bar.", anchor, &EngineConfig::default()).unwrap();
/// assert_eq!(resolution.rule, RuleName::DateTwoTimes);
/// assert_eq!(resolution.occurrences.len(), 2);
/// ```
pub fn resolve_fragment(
    text: &str,
    anchor: NaiveDate,
    config: &EngineConfig,
) -> std::result::Result<Resolution, Unresolved> {
    let ctx = Context {
        anchor,
        default_duration: config.default_duration(),
    };

    for rule in RULES.iter() {
        let Some(caps) = rule.first_match(text) else {
            continue;
        };
        let matched = caps
            .get(0)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        log::debug!("rule {} claimed fragment via '{}'", rule.name, matched);

        return match (rule.build)(&caps, &ctx) {
            Ok(occurrences) => Ok(Resolution {
                rule: rule.name,
                matched,
                occurrences,
            }),
            Err(error) => Err(Unresolved {
                rule: Some(rule.name),
                matched: Some(matched),
                error,
            }),
        };
    }

    Err(Unresolved {
        rule: None,
        matched: None,
        error: EngineError::NoPatternMatched(excerpt(text)),
    })
}

// ── Builders ────────────────────────────────────────────────────────────────

fn group<'t>(caps: &Captures<'t>, name: &str) -> Result<&'t str> {
    caps.name(name)
        .map(|m| m.as_str())
        .ok_or_else(|| EngineError::NoPatternMatched(format!("missing capture '{name}'")))
}

fn optional_time(caps: &Captures<'_>) -> Result<Option<TimeRange>> {
    caps.name("time")
        .map(|m| parse_time_range(m.as_str()))
        .transpose()
}

fn filter(keyword: &str) -> Result<WeekdayFilter> {
    WeekdayFilter::parse(keyword)
        .ok_or_else(|| EngineError::UnknownWeekdayName(format!("'{keyword}'")))
}

/// Shared tail of every single-span rule: expand, filter, attach the time.
fn span_occurrences(
    span: DateSpan,
    day_filter: Option<WeekdayFilter>,
    caps: &Captures<'_>,
    ctx: &Context,
    rule: RuleName,
) -> Result<Vec<Occurrence>> {
    let time = optional_time(caps)?;
    Ok(build_occurrences(
        expand(span, day_filter),
        time.as_ref(),
        ctx.default_duration,
        rule,
    ))
}

fn build_open_ended(caps: &Captures<'_>, ctx: &Context) -> Result<Vec<Occurrence>> {
    let date = group(caps, "date")?;
    let span = resolve_date_token(&format!("thru {date}"), ctx.anchor)?;
    Ok(vec![Occurrence::all_day(
        span.start(),
        span.end(),
        RuleName::OpenEndedRange,
    )])
}

fn build_date_two_times(caps: &Captures<'_>, ctx: &Context) -> Result<Vec<Occurrence>> {
    let span = resolve_date_token(group(caps, "date")?, ctx.anchor)?;
    let first = parse_time_range(group(caps, "first")?)?;
    let second = parse_time_range(group(caps, "second")?)?;

    let days = expand(span, None);
    let mut occurrences = build_occurrences(
        days.clone(),
        Some(&first),
        ctx.default_duration,
        RuleName::DateTwoTimes,
    );
    occurrences.extend(build_occurrences(
        days,
        Some(&second),
        ctx.default_duration,
        RuleName::DateTwoTimes,
    ));
    Ok(occurrences)
}

fn build_two_dates(caps: &Captures<'_>, ctx: &Context) -> Result<Vec<Occurrence>> {
    let first = resolve_date_token(group(caps, "first")?, ctx.anchor)?;
    let second = resolve_date_token(group(caps, "second")?, ctx.anchor)?;
    let time = optional_time(caps)?;

    let days: BTreeSet<NaiveDate> = expand(first, None).chain(expand(second, None)).collect();
    Ok(build_occurrences(
        days,
        time.as_ref(),
        ctx.default_duration,
        RuleName::TwoDates,
    ))
}

fn build_filtered_time_then_date(caps: &Captures<'_>, ctx: &Context) -> Result<Vec<Occurrence>> {
    let day_filter = filter(group(caps, "filter")?)?;
    let span = resolve_date_token(group(caps, "date")?, ctx.anchor)?;
    span_occurrences(
        span,
        Some(day_filter),
        caps,
        ctx,
        RuleName::FilteredTimeThenDate,
    )
}

fn build_filtered_date_then_time(caps: &Captures<'_>, ctx: &Context) -> Result<Vec<Occurrence>> {
    let (keyword, date) = match (caps.name("filter_a"), caps.name("date_a")) {
        (Some(f), Some(d)) => (f.as_str(), d.as_str()),
        _ => (group(caps, "filter_b")?, group(caps, "date_b")?),
    };
    let day_filter = filter(keyword)?;
    let span = resolve_date_token(date, ctx.anchor)?;
    span_occurrences(
        span,
        Some(day_filter),
        caps,
        ctx,
        RuleName::FilteredDateThenTime,
    )
}

fn build_time_then_date(caps: &Captures<'_>, ctx: &Context) -> Result<Vec<Occurrence>> {
    let span = resolve_date_token(group(caps, "date")?, ctx.anchor)?;
    span_occurrences(span, None, caps, ctx, RuleName::TimeThenDate)
}

fn build_date_then_time(caps: &Captures<'_>, ctx: &Context) -> Result<Vec<Occurrence>> {
    let span = resolve_date_token(group(caps, "date")?, ctx.anchor)?;
    span_occurrences(span, None, caps, ctx, RuleName::DateThenTime)
}
