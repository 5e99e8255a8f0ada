//! Internal implementation of sticky session identifiers.

use crate::{SessionIdError, SessionIdResult};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::fmt;

const MICROS_PER_SEC: i64 = 1_000_000;

/// Upper bound on integer digits accepted by [`StickySessionId::parse`].
///
/// Twelve digits of seconds reaches tens of thousands of years, comfortably inside the range
/// chrono can represent.
const MAX_SECONDS_DIGITS: usize = 12;

/// A timestamp-derived identifier for one upload attempt.
///
/// Format: `<seconds>.<microseconds>` where `<microseconds>` is always six digits, e.g.
/// `1767225600.000042`.
///
/// # Construction
/// - [`SessionIdGenerator::next_id`] issues fresh identifiers.
/// - [`StickySessionId::at`] encodes a specific instant.
/// - [`StickySessionId::parse`] validates an identifier echoed back by a client.
///
/// Ordering follows the embedded timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StickySessionId {
    micros: i64,
}

impl StickySessionId {
    /// Returns the identifier for a specific instant.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            micros: instant.timestamp_micros(),
        }
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`SessionIdError::InvalidInput`] unless `input` is 1 to 12 ASCII digits, a
    /// `.`, and exactly six ASCII digits.
    pub fn parse(input: &str) -> SessionIdResult<Self> {
        let invalid = || {
            SessionIdError::InvalidInput(format!(
                "session id must look like '<seconds>.<6 digit micros>', got: '{}'",
                input
            ))
        };

        let (secs, frac) = input.split_once('.').ok_or_else(invalid)?;

        let digits_only = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !digits_only(secs) || secs.len() > MAX_SECONDS_DIGITS {
            return Err(invalid());
        }
        if !digits_only(frac) || frac.len() != 6 {
            return Err(invalid());
        }

        let secs: i64 = secs.parse().map_err(|_| invalid())?;
        let frac: i64 = frac.parse().map_err(|_| invalid())?;

        Ok(Self {
            micros: secs * MICROS_PER_SEC + frac,
        })
    }
}

impl fmt::Display for StickySessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:06}",
            self.micros.div_euclid(MICROS_PER_SEC),
            self.micros.rem_euclid(MICROS_PER_SEC)
        )
    }
}

/// Hands out session ids that are strictly increasing for the lifetime of the generator.
///
/// Safe to share between threads; the last issued value is kept in an atomic.
#[derive(Debug)]
pub struct SessionIdGenerator {
    last_micros: AtomicI64,
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIdGenerator {
    pub const fn new() -> Self {
        Self {
            last_micros: AtomicI64::new(i64::MIN),
        }
    }

    /// Returns a fresh identifier based on the current time.
    pub fn next_id(&self) -> StickySessionId {
        self.next_id_at(Utc::now())
    }

    /// Returns a fresh identifier for `now`, bumped past the previous one if the clock has not
    /// advanced.
    pub fn next_id_at(&self, now: DateTime<Utc>) -> StickySessionId {
        let now = StickySessionId::at(now).micros;
        let bump = |last: i64| if now > last { now } else { last + 1 };
        let prev = self
            .last_micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(bump(last)))
            .unwrap_or_else(|last| last);
        StickySessionId { micros: bump(prev) }
    }
}

/// Reads a directory name as fractional UNIX seconds.
///
/// Looser than [`StickySessionId::parse`]: any float literal counts, including `inf` and
/// `nan`. Names that return `None` are not session directories and must be left alone.
pub fn timestamp_secs(name: &str) -> Option<f64> {
    name.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_microseconds() {
        let id = StickySessionId::parse("1767225600.000042").unwrap();
        assert_eq!(id.to_string(), "1767225600.000042");
    }

    #[test]
    fn test_at_formats_known_instant() {
        let instant = DateTime::from_timestamp(1_700_000_000, 5_000).unwrap();
        let id = StickySessionId::at(instant);
        assert_eq!(id.to_string(), "1700000000.000005");
    }

    #[test]
    fn test_issued_id_round_trips_through_parse() {
        let id = SessionIdGenerator::new().next_id();
        let parsed = StickySessionId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_rejects_non_canonical() {
        for input in [
            "",
            "1767225600",
            "1767225600.",
            ".123456",
            "1767225600.12345",
            "1767225600.1234567",
            "-1.000000",
            "1e9.000000",
            "1767225600.12345a",
            "1234567890123.000000",
            "../1.000000",
        ] {
            assert!(
                StickySessionId::parse(input).is_err(),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_error_message() {
        match StickySessionId::parse("tampered") {
            Err(SessionIdError::InvalidInput(msg)) => assert!(msg.contains("tampered")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_generator_bumps_when_clock_stalls() {
        let generator = SessionIdGenerator::new();
        let instant = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let a = generator.next_id_at(instant);
        let b = generator.next_id_at(instant);
        let c = generator.next_id_at(instant);

        assert_eq!(a.to_string(), "1700000000.000000");
        assert_eq!(b.to_string(), "1700000000.000001");
        assert_eq!(c.to_string(), "1700000000.000002");
    }

    #[test]
    fn test_generator_follows_clock_forward() {
        let generator = SessionIdGenerator::new();
        let earlier = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let later = DateTime::from_timestamp(1_700_000_100, 0).unwrap();

        generator.next_id_at(earlier);
        assert_eq!(
            generator.next_id_at(later).to_string(),
            "1700000100.000000"
        );
    }

    #[test]
    fn test_generator_shared_across_threads() {
        let generator = std::sync::Arc::new(SessionIdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || {
                    (0..250).map(|_| generator.next_id()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<StickySessionId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_timestamp_secs_is_lenient() {
        assert_eq!(timestamp_secs("1767225600.123456"), Some(1767225600.123456));
        assert_eq!(timestamp_secs("42"), Some(42.0));
        assert_eq!(timestamp_secs("1e3"), Some(1000.0));
        assert_eq!(timestamp_secs("inf"), Some(f64::INFINITY));
        assert!(timestamp_secs("NaN").is_some_and(f64::is_nan));
    }

    #[test]
    fn test_timestamp_secs_rejects_non_numeric() {
        assert_eq!(timestamp_secs("keep-me"), None);
        assert_eq!(timestamp_secs(""), None);
        assert_eq!(timestamp_secs("1.2.3"), None);
    }
}
