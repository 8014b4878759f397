use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// A UTC instant that renders with the fractional precision it was written with.
/// Equality and ordering look at the instant only.
#[derive(Debug, Clone, Copy)]
pub struct TimeInstant {
    pub at: DateTime<Utc>,
    precision: SecondsFormat,
}

impl TimeInstant {
    pub fn parse(text: &str) -> Result<TimeInstant, String> {
        let text = text.trim();
        let at = DateTime::parse_from_rfc3339(text).map_err(|e| e.to_string())?.with_timezone(&Utc);
        Ok(TimeInstant { at, precision: precision_of(text) })
    }
}

/// Smallest chrono format holding every fractional digit of `text`.
fn precision_of(text: &str) -> SecondsFormat {
    let digits = text
        .split_once('.')
        .map(|(_, fraction)| fraction.chars().take_while(char::is_ascii_digit).count())
        .unwrap_or(0);
    match digits {
        0 => SecondsFormat::Secs,
        1..=3 => SecondsFormat::Millis,
        4..=6 => SecondsFormat::Micros,
        _ => SecondsFormat::Nanos,
    }
}

impl PartialEq for TimeInstant {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl Eq for TimeInstant {}

impl PartialOrd for TimeInstant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeInstant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at)
    }
}

impl fmt::Display for TimeInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.at.to_rfc3339_opts(self.precision, true))
    }
}

/// Closed `start/end` interval, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    pub start: TimeInstant,
    pub end: TimeInstant,
}

impl TimeInterval {
    pub fn parse(text: &str) -> Result<TimeInterval, String> {
        let (start, end) = text.trim().split_once('/').ok_or_else(|| format!("missing '/' in {}", text))?;
        let start = TimeInstant::parse(start)?;
        let end = TimeInstant::parse(end)?;
        if end < start {
            return Err(format!("interval end {} is before start {}", end, start));
        }
        Ok(TimeInterval { start, end })
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeValue {
    Instant(TimeInstant),
    Interval(TimeInterval),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    Instant,
    Interval,
}

impl TimeFormat {
    pub fn describe(&self) -> &'static str {
        match self {
            TimeFormat::Instant => "time instant",
            TimeFormat::Interval => "time interval",
        }
    }

    pub fn parse(&self, text: &str) -> Result<TimeValue, String> {
        match self {
            TimeFormat::Instant => TimeInstant::parse(text).map(TimeValue::Instant),
            TimeFormat::Interval => TimeInterval::parse(text).map(TimeValue::Interval),
        }
    }
}

/// One failed attempt of `TimeValue::parse_first`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeAttempt {
    pub format: TimeFormat,
    pub reason: String,
}

impl TimeValue {
    /// Tries `formats` in order and returns the first success, or every failure in attempt order.
    pub fn parse_first(text: &str, formats: &[TimeFormat]) -> Result<TimeValue, Vec<TimeAttempt>> {
        let mut failures = Vec::with_capacity(formats.len());
        for format in formats {
            match format.parse(text) {
                Ok(value) => return Ok(value),
                Err(reason) => failures.push(TimeAttempt { format: *format, reason }),
            }
        }
        Err(failures)
    }

    pub fn as_instant(&self) -> Option<&TimeInstant> {
        match self {
            TimeValue::Instant(i) => Some(i),
            TimeValue::Interval(_) => None,
        }
    }

    pub fn as_interval(&self) -> Option<&TimeInterval> {
        match self {
            TimeValue::Interval(i) => Some(i),
            TimeValue::Instant(_) => None,
        }
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeValue::Instant(i) => fmt::Display::fmt(i, f),
            TimeValue::Interval(i) => fmt::Display::fmt(i, f),
        }
    }
}

macro_rules! serialize_as_display {
    ($($t:ty),*) => {
        $(
            impl Serialize for $t {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.collect_str(self)
                }
            }
        )*
    };
}

serialize_as_display!(TimeInstant, TimeInterval, TimeValue);
