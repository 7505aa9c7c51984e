//! Timeline view options: zoom bounds and snapping.

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One minute in milliseconds.
const MINUTE_MS: u64 = 60 * 1000;

/// One hour in milliseconds.
const HOUR_MS: u64 = 60 * MINUTE_MS;

/// One day in milliseconds.
const DAY_MS: u64 = 24 * HOUR_MS;

/// Zoom and snap behavior of a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export, export_to = "bindings/")]
pub struct TimelineOptions {
    /// Narrowest visible span, in milliseconds.
    pub zoom_min_ms: u64,
    /// Widest visible span, in milliseconds.
    pub zoom_max_ms: u64,
    /// Round marker positions to the nearest minute.
    pub snap_to_minute: bool,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self::master()
    }
}

impl TimelineOptions {
    /// Options of the master timeline: one minute to one week.
    pub const fn master() -> Self {
        Self {
            zoom_min_ms: MINUTE_MS,
            zoom_max_ms: 7 * DAY_MS,
            snap_to_minute: true,
        }
    }

    /// Options of a single entity's lane timeline: one hour to 31 days.
    pub const fn entity() -> Self {
        Self {
            zoom_min_ms: HOUR_MS,
            zoom_max_ms: 31 * DAY_MS,
            snap_to_minute: true,
        }
    }

    /// Narrowest visible span.
    pub fn zoom_min(&self) -> Duration {
        millis(self.zoom_min_ms)
    }

    /// Widest visible span.
    pub fn zoom_max(&self) -> Duration {
        millis(self.zoom_max_ms)
    }

    /// Apply the snap rule to a marker position.
    pub fn snap(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        if self.snap_to_minute {
            snap_to_minute(time)
        } else {
            time
        }
    }
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

/// Round `time` to the nearest whole minute (half a minute rounds up).
pub fn snap_to_minute(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_round(Duration::minutes(1)).unwrap_or(time)
}
