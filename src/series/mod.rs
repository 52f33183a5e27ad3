// Snapshot window -> fixed-width, chart-ready series.
// Rates come from consecutive raw counters; cpu carries forward; memory is one rolling scalar.

pub mod memory;
pub mod rate;

use crate::models::{DerivedSeries, Snapshot, TIME_PLACEHOLDER};
use rate::Counter;

/// Largest window the query surface will build.
pub const MAX_WINDOW_SIZE: usize = 500;

/// Build a `DerivedSeries` of exactly `window_size` points from snapshots in any order.
///
/// Snapshots without a timestamp (`collected_at <= 0`) are discarded. Series longer than the
/// window keep the newest points; shorter ones are left-padded with 0 / `TIME_PLACEHOLDER`.
pub fn aggregate(snapshots: &[Snapshot], window_size: usize) -> DerivedSeries {
    let mut sorted: Vec<&Snapshot> = snapshots.iter().filter(|s| s.collected_at > 0).collect();
    if sorted.is_empty() {
        return DerivedSeries::empty(window_size);
    }
    sorted.sort_by_key(|s| s.collected_at);

    let n = sorted.len();
    let mut time = Vec::with_capacity(n);
    let mut cpu: Vec<f64> = Vec::with_capacity(n);
    let mut net_in = Vec::with_capacity(n);
    let mut net_out = Vec::with_capacity(n);
    let mut disk_read = Vec::with_capacity(n);
    let mut disk_write = Vec::with_capacity(n);
    let mut memory_percent = 0.0;
    let mut previous: Option<&Snapshot> = None;

    for snapshot in sorted {
        time.push(time_label(snapshot.collected_at));

        let cpu_value = match snapshot.cpu_percent.filter(|v| v.is_finite()) {
            Some(v) => memory::clamp_percent(v),
            None => cpu.last().copied().unwrap_or(0.0),
        };
        cpu.push(cpu_value);

        if let Some(p) = memory::memory_percent(snapshot) {
            memory_percent = p;
        }

        let [ni, no, dr, dw] = match previous {
            Some(prev) => {
                let dt = rate::delta_seconds(snapshot.collected_at, prev.collected_at);
                Counter::ALL.map(|c| c.rate_between(snapshot, prev, dt))
            }
            None => [0.0; 4],
        };
        net_in.push(ni);
        net_out.push(no);
        disk_read.push(dr);
        disk_write.push(dw);

        previous = Some(snapshot);
    }

    DerivedSeries {
        time: pad_window(time, window_size, TIME_PLACEHOLDER.to_string()),
        cpu: pad_window(cpu, window_size, 0.0),
        net_in: pad_window(net_in, window_size, 0.0),
        net_out: pad_window(net_out, window_size, 0.0),
        disk_read: pad_window(disk_read, window_size, 0.0),
        disk_write: pad_window(disk_write, window_size, 0.0),
        memory_percent: Some(memory_percent),
        last_timestamp: previous.map(|s| s.collected_at),
    }
}

/// Keep the newest `size` entries, or left-pad with `fill` up to `size`.
pub fn pad_window<T: Clone>(mut series: Vec<T>, size: usize, fill: T) -> Vec<T> {
    if series.len() >= size {
        return series.split_off(series.len() - size);
    }
    let mut out = vec![fill; size - series.len()];
    out.append(&mut series);
    out
}

/// `HH:MM:SS` in UTC.
fn time_label(collected_at_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(collected_at_ms)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| TIME_PLACEHOLDER.to_string())
}
