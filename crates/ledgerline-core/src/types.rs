//! Strong type definitions for Ledgerline.
//!
//! Identifiers and ordering keys are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier of the ledger topic events are published to (e.g. `0.0.4512`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(String);

impl TopicId {
    /// Create a topic identifier. Surrounding whitespace is dropped.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_string())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger-assigned total-order key for a message: `seconds.nanoseconds`.
///
/// Ordering is numeric (seconds, then nanoseconds), never lexicographic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsensusTimestamp {
    seconds: u64,
    nanos: u32,
}

impl ConsensusTimestamp {
    /// Create a timestamp. Nanoseconds must be below one second.
    pub fn new(seconds: u64, nanos: u32) -> Option<Self> {
        (nanos < 1_000_000_000).then_some(Self { seconds, nanos })
    }

    /// A timestamp on a whole second.
    pub const fn from_seconds(seconds: u64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// Whole seconds since the Unix epoch.
    pub const fn seconds(&self) -> u64 {
        self.seconds
    }

    /// Nanoseconds within the second.
    pub const fn nanos(&self) -> u32 {
        self.nanos
    }

    /// The next representable instant.
    pub fn successor(&self) -> Self {
        if self.nanos == 999_999_999 {
            Self {
                seconds: self.seconds + 1,
                nanos: 0,
            }
        } else {
            Self {
                seconds: self.seconds,
                nanos: self.nanos + 1,
            }
        }
    }
}

impl fmt::Debug for ConsensusTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsensusTimestamp({})", self)
    }
}

impl fmt::Display for ConsensusTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

/// Error returned for malformed consensus timestamps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid consensus timestamp: {0:?}")]
pub struct ParseTimestampError(pub String);

impl FromStr for ConsensusTimestamp {
    type Err = ParseTimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTimestampError(s.to_string());
        let (secs, frac) = match s.split_once('.') {
            Some((secs, frac)) => (secs, Some(frac)),
            None => (s, None),
        };

        if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let seconds: u64 = secs.parse().map_err(|_| err())?;

        let nanos = match frac {
            None => 0,
            Some(frac) => {
                if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(err());
                }
                // Right-pad so "1.5" means 500ms.
                let padded = format!("{:0<9}", frac);
                padded.parse::<u32>().map_err(|_| err())?
            }
        };

        Ok(Self { seconds, nanos })
    }
}

impl Serialize for ConsensusTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ConsensusTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Watermark of the last accepted message, used to request only newer ones.
///
/// Monotonically non-decreasing: [`ReplayCursor::advance`] never moves it back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCursor(Option<ConsensusTimestamp>);

impl ReplayCursor {
    /// A cursor that has not seen any message.
    pub const fn start() -> Self {
        Self(None)
    }

    /// The watermark, if any message has been accepted.
    pub const fn position(&self) -> Option<ConsensusTimestamp> {
        self.0
    }

    /// Move the watermark forward to `ts` if it is newer.
    ///
    /// Returns true if the cursor moved.
    pub fn advance(&mut self, ts: ConsensusTimestamp) -> bool {
        match self.0 {
            Some(current) if current >= ts => false,
            _ => {
                self.0 = Some(ts);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> ConsensusTimestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_timestamp_parse_and_display() {
        let t = ts("1700000000.000000042");
        assert_eq!(t.seconds(), 1_700_000_000);
        assert_eq!(t.nanos(), 42);
        assert_eq!(t.to_string(), "1700000000.000000042");
    }

    #[test]
    fn test_timestamp_short_fraction_is_right_padded() {
        assert_eq!(ts("3.5").nanos(), 500_000_000);
    }

    #[test]
    fn test_timestamp_without_fraction() {
        assert_eq!(ts("30"), ConsensusTimestamp::new(30, 0).unwrap());
        assert_eq!(ts("30"), ConsensusTimestamp::from_seconds(30));
    }

    #[test]
    fn test_timestamp_orders_numerically() {
        // Lexicographically "9.0" > "10.0".
        assert!(ts("9.0") < ts("10.0"));
        assert!(ts("10.000000001") > ts("10"));
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        for bad in ["", ".", "1.", "-1.0", "1.0000000001", "abc", "1.2.3", " 1"] {
            assert!(bad.parse::<ConsensusTimestamp>().is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_timestamp_successor_rolls_over() {
        assert_eq!(ts("1.999999999").successor(), ts("2.0"));
        assert_eq!(ts("1.1").successor(), ts("1.100000001"));
    }

    #[test]
    fn test_cursor_never_regresses() {
        let mut cursor = ReplayCursor::start();
        assert!(cursor.advance(ts("20")));
        assert!(!cursor.advance(ts("10")));
        assert!(!cursor.advance(ts("20")));
        assert_eq!(cursor.position(), Some(ts("20")));
        assert!(cursor.advance(ts("21")));
    }

    #[test]
    fn test_topic_id_trims() {
        assert_eq!(TopicId::new("  0.0.1234 \n").as_str(), "0.0.1234");
    }
}
