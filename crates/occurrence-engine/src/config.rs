//! Engine configuration.
//!
//! Everything here is a heuristic knob of the front ends or the rendering
//! zone. Defaults reproduce the behavior of the feeds the engine was built
//! for; a JSON file may override any subset of fields.

use std::path::Path;

use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::occurrence::EventSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// IANA zone all timed occurrences are rendered in.
    pub time_zone: String,
    /// Span given to a time with no stated end.
    pub default_duration_minutes: i64,
    /// Location candidates containing any of these words are rejected.
    pub location_exclusions: Vec<String>,
    /// Listing parser stops collecting location text once a line contains this.
    pub price_marker: char,
    /// Listing lines containing this character are scanned for times.
    pub time_separator: char,
    /// Listing date lines containing this word reset week tracking.
    pub upcoming_marker: String,
    /// Attribution attached to drafts from the paragraph front end.
    pub feed_source: Option<EventSource>,
    /// Attribution attached to drafts from the listing front end.
    pub listing_source: Option<EventSource>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_zone: "America/New_York".to_string(),
            default_duration_minutes: 60,
            location_exclusions: vec!["featuring".to_string(), "host".to_string()],
            price_marker: '$',
            time_separator: ';',
            upcoming_marker: "upcoming".to_string(),
            feed_source: None,
            listing_source: None,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document, filling unspecified fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.tz()?;
        if self.default_duration_minutes <= 0 {
            return Err(EngineError::InvalidConfig(format!(
                "default_duration_minutes must be positive, got {}",
                self.default_duration_minutes
            )));
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, EngineError> {
        parse_timezone(&self.time_zone)
    }

    pub fn default_duration(&self) -> Duration {
        Duration::minutes(self.default_duration_minutes)
    }

    /// True if `candidate` contains one of the configured exclusion words.
    pub(crate) fn is_excluded_location(&self, candidate: &str) -> bool {
        let lower = candidate.to_lowercase();
        self.location_exclusions
            .iter()
            .any(|word| lower.contains(&word.to_lowercase()))
    }
}

/// Parse an IANA timezone string into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz, EngineError> {
    s.parse::<Tz>()
        .map_err(|_| EngineError::InvalidTimezone(format!("'{}'", s)))
}
