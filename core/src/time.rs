//! Time related utils.

use crate::{Error, Result};
use chrono::{SecondsFormat, TimeZone, Utc};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The point in time used across this workspace.
pub type DateTime = chrono::DateTime<Utc>;

/// Return the current time in UTC.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format a time into the date form used in credential scope: `20220313`.
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format a time into the compact ISO 8601 form used by SigV4: `20220313T072004Z`.
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format a time into RFC 3339 with second precision: `2022-03-13T07:20:04Z`.
pub fn format_rfc3339(t: DateTime) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a time from RFC 3339: `2022-03-13T07:20:04Z`.
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    let t = chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| Error::unexpected(format!("failed to parse time {s}")).with_source(e))?;
    Ok(t.with_timezone(&Utc))
}

/// Clock supplies the current time to components that need to reason about
/// expiry, so tests can substitute a controllable source.
///
/// Production code uses [`SystemClock`]; tests use [`ManualClock`].
pub trait Clock: Debug + Send + Sync + 'static {
    /// The current time.
    fn now(&self) -> DateTime;
}

/// Clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime {
        Utc::now()
    }
}

/// A clock that only moves when told to. For tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2021, 8, 31, 0, 0, 0).unwrap())
    }
}

impl ManualClock {
    /// Create a clock fixed at the given time.
    pub fn new(start: DateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, d: Duration) {
        let mut now = self.now.lock().expect("lock poisoned");
        *now += chrono::TimeDelta::from_std(d).expect("duration in bounds");
    }

    /// Set the clock to an absolute time.
    pub fn set(&self, t: DateTime) {
        *self.now.lock().expect("lock poisoned") = t;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime {
        *self.now.lock().expect("lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime {
        Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap()
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(test_time()), "20220301");
    }

    #[test]
    fn test_format_iso8601() {
        assert_eq!(format_iso8601(test_time()), "20220301T081234Z");
    }

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(parse_rfc3339("2022-03-01T08:12:34Z").unwrap(), test_time());
        assert_eq!(
            parse_rfc3339("2022-03-01T09:12:34+01:00").unwrap(),
            test_time()
        );
        assert!(parse_rfc3339("20220301T081234Z").is_err());
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(test_time());
        assert_eq!(clock.now(), test_time());

        clock.advance(Duration::from_secs(600));
        assert_eq!(
            clock.now(),
            test_time() + chrono::TimeDelta::try_seconds(600).unwrap()
        );
    }
}
