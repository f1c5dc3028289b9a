//! Durations and time tokens for sleep and wait operations.
//!
//! The orchestrator accepts relative time as compact tokens such as `"30s"`,
//! `"1m"` or `"6d1h"`. Callers may supply such a token directly, in which
//! case it is passed through untouched, or a [`Duration`] / absolute instant
//! that is formatted into a token here.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;
const SECONDS_PER_DAY: u64 = 86400;

/// Units used when formatting a token, largest first.
const PERIODS: [(char, u64); 4] = [
    ('d', SECONDS_PER_DAY),
    ('h', SECONDS_PER_HOUR),
    ('m', SECONDS_PER_MINUTE),
    ('s', 1),
];

/// Duration type representing a time interval in seconds.
///
/// # Example
///
/// ```
/// use durable_step_sdk::Duration;
///
/// let duration = Duration::from_days(6).saturating_add(Duration::from_hours(1));
/// assert_eq!(duration.to_seconds(), 522000);
/// assert_eq!(duration.to_time_str(), "6d1h");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Duration {
    seconds: u64,
}

impl Duration {
    /// Creates a new Duration from the given number of seconds.
    pub fn from_seconds(seconds: u64) -> Self {
        Self { seconds }
    }

    /// Creates a new Duration from the given number of minutes.
    pub fn from_minutes(minutes: u64) -> Self {
        Self {
            seconds: minutes.saturating_mul(SECONDS_PER_MINUTE),
        }
    }

    /// Creates a new Duration from the given number of hours.
    pub fn from_hours(hours: u64) -> Self {
        Self {
            seconds: hours.saturating_mul(SECONDS_PER_HOUR),
        }
    }

    /// Creates a new Duration from the given number of days.
    pub fn from_days(days: u64) -> Self {
        Self {
            seconds: days.saturating_mul(SECONDS_PER_DAY),
        }
    }

    /// Creates a new Duration from the given number of weeks.
    pub fn from_weeks(weeks: u64) -> Self {
        Self {
            seconds: weeks.saturating_mul(7 * SECONDS_PER_DAY),
        }
    }

    /// Returns the time remaining from `now` until `target`.
    ///
    /// Sub-second remainders are truncated; a target at or before `now`
    /// yields a zero duration.
    pub fn until(target: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let remaining = target.signed_duration_since(now).num_seconds();
        Self {
            seconds: u64::try_from(remaining).unwrap_or(0),
        }
    }

    /// Returns the total number of seconds in this duration.
    pub fn to_seconds(&self) -> u64 {
        self.seconds
    }

    /// Adds two durations, saturating at the maximum.
    pub fn saturating_add(self, other: Duration) -> Self {
        Self {
            seconds: self.seconds.saturating_add(other.seconds),
        }
    }

    /// Formats this duration as a compact token using the largest units first.
    ///
    /// Zero-valued units are omitted; a zero duration formats as `"0s"`.
    pub fn to_time_str(&self) -> String {
        let mut remaining = self.seconds;
        let mut token = String::new();
        for (suffix, period) in PERIODS {
            let count = remaining / period;
            if count > 0 {
                token.push_str(&count.to_string());
                token.push(suffix);
                remaining %= period;
            }
        }
        if token.is_empty() {
            token.push_str("0s");
        }
        token
    }
}

impl From<std::time::Duration> for Duration {
    fn from(duration: std::time::Duration) -> Self {
        Self {
            seconds: duration.as_secs(),
        }
    }
}

impl From<Duration> for std::time::Duration {
    fn from(duration: Duration) -> Self {
        std::time::Duration::from_secs(duration.seconds)
    }
}

/// A relative time token as accepted by the orchestrator.
///
/// Tokens supplied as strings are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeStr(String);

impl TimeStr {
    /// Returns the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the token.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for TimeStr {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl From<String> for TimeStr {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<Duration> for TimeStr {
    fn from(duration: Duration) -> Self {
        Self(duration.to_time_str())
    }
}

impl std::fmt::Display for TimeStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A timeout for `wait_for_event`: either a relative token or an absolute instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timeout {
    /// A relative token, passed through verbatim as the TTL
    After(TimeStr),
    /// An absolute instant, converted to a TTL token against the clock
    At(DateTime<Utc>),
}

impl Timeout {
    /// Resolves this timeout into a TTL token relative to `now`.
    pub fn to_ttl(&self, now: DateTime<Utc>) -> String {
        match self {
            Self::After(token) => token.as_str().to_string(),
            Self::At(instant) => time_str_until(*instant, now),
        }
    }
}

impl From<&str> for Timeout {
    fn from(token: &str) -> Self {
        Self::After(token.into())
    }
}

impl From<String> for Timeout {
    fn from(token: String) -> Self {
        Self::After(token.into())
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Self::After(duration.into())
    }
}

impl From<DateTime<Utc>> for Timeout {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::At(instant)
    }
}

/// Formats the time remaining from `now` until `target` as a compact token.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use durable_step_sdk::duration::time_str_until;
///
/// let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let target = Utc.with_ymd_and_hms(2024, 1, 7, 1, 0, 30).unwrap();
/// assert_eq!(time_str_until(target, now), "6d1h30s");
/// ```
pub fn time_str_until(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    Duration::until(target, now).to_time_str()
}

/// Formats an absolute instant in a stable form for op identity.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use durable_step_sdk::duration::instant_key;
///
/// let instant = Utc.with_ymd_and_hms(2024, 1, 7, 1, 0, 30).unwrap();
/// assert_eq!(instant_key(instant), "2024-01-07T01:00:30.000Z");
/// ```
pub fn instant_key(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
