use chrono::{DateTime, SecondsFormat, Utc};

use crate::CoreError;

/// Formats epoch milliseconds as an RFC 3339 UTC timestamp with millisecond
/// precision, e.g. `2024-05-01T09:30:00.000Z`.
pub fn format_millis(ms: i64) -> Result<String, CoreError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| CoreError::InvalidData(format!("timestamp out of range: {ms}")))
}

/// Source of the timestamps stamped onto projects.
pub trait Clock {
    /// Next timestamp. Successive calls never go backwards.
    fn tick(&mut self) -> Result<String, CoreError>;
}

/// Wall clock that never repeats or rewinds a millisecond.
#[derive(Debug, Default)]
pub struct SystemClock {
    last_ms: i64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn tick(&mut self) -> Result<String, CoreError> {
        let now = Utc::now().timestamp_millis();
        let ms = if now > self.last_ms { now } else { self.last_ms + 1 };
        self.last_ms = ms;
        format_millis(ms)
    }
}

/// Deterministic clock for tests: starts at a fixed instant and advances by a
/// fixed step on every tick.
#[derive(Debug, Clone)]
pub struct FixedClock {
    next_ms: i64,
    step_ms: i64,
}

impl FixedClock {
    pub fn new(start_ms: i64, step_ms: i64) -> Self {
        Self {
            next_ms: start_ms,
            step_ms,
        }
    }
}

impl Default for FixedClock {
    /// 2024-01-01T00:00:00.000Z, one second per tick.
    fn default() -> Self {
        Self::new(1_704_067_200_000, 1_000)
    }
}

impl Clock for FixedClock {
    fn tick(&mut self) -> Result<String, CoreError> {
        let ms = self.next_ms;
        self.next_ms += self.step_ms;
        format_millis(ms)
    }
}
