use crate::Credential;
use awsauth_core::time::DateTime;
use std::time::Duration;

/// Session credentials are considered expired this long before their
/// actual expiration, so callers never sign with a credential about to
/// lapse in flight.
pub(crate) const REFRESH_BUFFER_SECS: i64 = 60;

/// Upper bound between background refresh cycles.
pub(crate) const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(3 * 60);

/// Poll interval while the cache is empty or no context has been seen.
pub(crate) const EMPTY_POLL_PERIOD: Duration = Duration::from_secs(5);

/// Default LRU capacity.
pub(crate) const DEFAULT_CAPACITY: usize = 100;

/// A value paired with its expiration instant.
#[derive(Debug, Clone)]
pub(crate) struct ExpiringValue<T> {
    pub value: T,
    pub expires_at: DateTime,
}

impl<T> ExpiringValue<T> {
    /// Whether the value has passed its expiration minus the refresh
    /// buffer.
    pub fn is_expired(&self, now: DateTime) -> bool {
        let buffer = chrono::TimeDelta::try_seconds(REFRESH_BUFFER_SECS).expect("in bounds");
        now >= self.expires_at - buffer
    }

    /// Instant at which this value enters the refresh buffer.
    pub fn refresh_at(&self) -> DateTime {
        let buffer = chrono::TimeDelta::try_seconds(REFRESH_BUFFER_SECS).expect("in bounds");
        self.expires_at - buffer
    }
}

/// Cache key: session credentials are scoped to both the bucket and the
/// base credentials that created them.
pub(crate) type SessionKey = (String, Credential);

#[derive(Debug)]
pub(crate) struct SessionEntry {
    pub expiring: ExpiringValue<Credential>,
    pub used_since_last_refresh: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsauth_core::time::parse_rfc3339;

    #[test]
    fn test_is_expired_includes_buffer() {
        let expiring = ExpiringValue {
            value: (),
            expires_at: parse_rfc3339("2021-08-31T12:10:00Z").unwrap(),
        };

        let fresh = parse_rfc3339("2021-08-31T12:08:59Z").unwrap();
        let in_buffer = parse_rfc3339("2021-08-31T12:09:00Z").unwrap();

        assert!(!expiring.is_expired(fresh));
        assert!(expiring.is_expired(in_buffer));
    }
}
