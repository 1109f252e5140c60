//! # occurrence-engine
//!
//! Resolves loosely-structured event prose into concrete calendar
//! occurrences.
//!
//! Given already-extracted text (a feed paragraph or a block of a weekly
//! listing) and an anchor date standing in for "today", the engine infers
//! absolute dates from relative expressions, fills in missing AM/PM
//! qualifiers, detects ranges that cross midnight, expands date ranges into
//! days, and picks among overlapping phrasings by a fixed priority order.
//! It performs no I/O.
//!
//! ## Modules
//!
//! - [`time_of_day`]: time tokens (`7-9pm`, `10pm-2am`) → [`TimeRange`]
//! - [`calendar_date`]: weekday names, `m/d` tokens, and ranges → [`DateSpan`]
//! - [`expand`]: date spans → individual days, weekday filters
//! - [`cascade`]: the ordered pattern rules that claim a fragment
//! - [`occurrence`]: output records and calendar rendering
//! - [`fragment`]: paragraph front end (title, link, location)
//! - [`listing`]: plain-text weekly listing front end with week tracking
//! - [`anchor`]: anchor date parsing
//! - [`config`]: engine configuration
//! - [`error`]: error and diagnostic types

pub mod anchor;
pub mod calendar_date;
pub mod cascade;
pub mod config;
pub mod error;
pub mod expand;
pub mod fragment;
pub mod listing;
pub mod occurrence;
pub mod time_of_day;

pub use anchor::parse_anchor;
pub use calendar_date::{next_weekday_on_or_after, resolve_date_token, DateSpan};
pub use cascade::{resolve_fragment, Resolution, RuleName, Unresolved};
pub use config::{parse_timezone, EngineConfig};
pub use error::{Diagnostic, EngineError};
pub use expand::{expand, WeekdayFilter};
pub use fragment::{parse_paragraphs, Paragraph};
pub use listing::{parse_listing, split_listing_text, ListingBlock, WeekTracker};
pub use occurrence::{
    BatchOutcome, CalendarEntry, CalendarTime, EventDraft, EventSource, Occurrence,
};
pub use time_of_day::{parse_time_range, TimeOfDay, TimeRange};
