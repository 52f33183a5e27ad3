// Instantaneous rates from cumulative counters, plus unit conversion for display.

use crate::models::Snapshot;

const KIBI: f64 = 1024.0;
const BYTES_PER_MEBIBYTE: f64 = 1024.0 * 1024.0;

/// Bytes per second between two readings of one cumulative counter.
///
/// Missing or non-finite readings give 0. A counter that did not advance (or went
/// backwards after a reset/wrap) gives 0; the rate is never negative and never
/// inferred from earlier samples. `delta_seconds` is floored at 1.
pub fn rate(current: Option<f64>, previous: Option<f64>, delta_seconds: f64) -> f64 {
    let (Some(current), Some(previous)) = (current, previous) else {
        return 0.0;
    };
    if !current.is_finite() || !previous.is_finite() {
        return 0.0;
    }
    let delta = current - previous;
    if !delta.is_finite() || delta <= 0.0 {
        return 0.0;
    }
    delta / delta_seconds.max(1.0)
}

/// Display units for derived rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    /// Network: bytes/s × 8 / 1024.
    KilobitsPerSec,
    /// Disk: bytes/s / 1024².
    MegabytesPerSec,
}

impl RateUnit {
    /// Exact conversion from bytes per second. Non-positive or non-finite input gives 0.
    pub fn convert(self, bytes_per_sec: f64) -> f64 {
        if !bytes_per_sec.is_finite() || bytes_per_sec <= 0.0 {
            return 0.0;
        }
        match self {
            Self::KilobitsPerSec => bytes_per_sec * 8.0 / KIBI,
            Self::MegabytesPerSec => bytes_per_sec / BYTES_PER_MEBIBYTE,
        }
    }

    /// Converted and rounded to 2 decimals, as charted.
    pub fn render(self, bytes_per_sec: f64) -> f64 {
        let v = (self.convert(bytes_per_sec) * 100.0).round() / 100.0;
        if v > 0.0 { v } else { 0.0 }
    }
}

/// One cumulative counter at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterReading {
    pub value: Option<f64>,
    /// Unix epoch milliseconds.
    pub at_ms: i64,
}

/// Cumulative byte counters carried in a snapshot's raw fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    NetIn,
    NetOut,
    DiskRead,
    DiskWrite,
}

impl Counter {
    pub const ALL: [Counter; 4] = [
        Counter::NetIn,
        Counter::NetOut,
        Counter::DiskRead,
        Counter::DiskWrite,
    ];

    pub fn raw_key(self) -> &'static str {
        match self {
            Self::NetIn => "netin",
            Self::NetOut => "netout",
            Self::DiskRead => "diskread",
            Self::DiskWrite => "diskwrite",
        }
    }

    pub fn unit(self) -> RateUnit {
        match self {
            Self::NetIn | Self::NetOut => RateUnit::KilobitsPerSec,
            Self::DiskRead | Self::DiskWrite => RateUnit::MegabytesPerSec,
        }
    }

    pub fn reading(self, snapshot: &Snapshot) -> CounterReading {
        CounterReading {
            value: snapshot.raw_value(self.raw_key()),
            at_ms: snapshot.collected_at,
        }
    }

    /// Display-unit rate between two snapshots `delta_seconds` apart.
    pub fn rate_between(self, current: &Snapshot, previous: &Snapshot, delta_seconds: f64) -> f64 {
        let cur = self.reading(current);
        let prev = self.reading(previous);
        self.unit().render(rate(cur.value, prev.value, delta_seconds))
    }
}

/// Seconds between two sample times, floored at 1.
pub fn delta_seconds(current_ms: i64, previous_ms: i64) -> f64 {
    ((current_ms - previous_ms) as f64 / 1000.0).max(1.0)
}
