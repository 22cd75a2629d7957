//! Logical clock time for causal ordering
//!
//! Thread-store timestamps are logical, never wall-clock: a monotonically
//! increasing per-store counter rendered as `t<N>`. Supplying an explicit
//! timestamp higher than the current clock fast-forwards the clock
//! (Lamport-style causal merge); the clock never rewinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A point in logical time, rendered as `t<N>`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LogicalTime(pub u64);

impl LogicalTime {
    /// The origin of logical time, `t0`.
    pub const ZERO: LogicalTime = LogicalTime(0);

    pub fn new(tick: u64) -> Self {
        Self(tick)
    }

    pub fn tick(&self) -> u64 {
        self.0
    }

    /// The next instant in logical time.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Parse a `t<N>` rendering. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('t')?;
        digits.parse::<u64>().ok().map(Self)
    }

    /// Order key for a timestamp string: parsed logical time, with
    /// unparseable strings sorting as `t0`.
    pub fn order_key(s: &str) -> u64 {
        Self::parse(s).map(|t| t.0).unwrap_or(0)
    }
}

impl fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl FromStr for LogicalTime {
    type Err = ParseLogicalTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseLogicalTimeError(s.to_string()))
    }
}

/// Error returned when a string is not a valid `t<N>` rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid logical time: {0}")]
pub struct ParseLogicalTimeError(pub String);
