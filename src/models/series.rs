// Chart-ready series, recomputed on every read and never stored

use serde::{Deserialize, Serialize};

/// Label used to left-pad the time axis.
pub const TIME_PLACEHOLDER: &str = "--";

/// Fixed-width series: every vector has exactly the requested window length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedSeries {
    pub time: Vec<String>,
    /// Percent, clamped to [0, 100] for display.
    pub cpu: Vec<f64>,
    /// Kilobits per second.
    pub net_in: Vec<f64>,
    pub net_out: Vec<f64>,
    /// Megabytes per second.
    pub disk_read: Vec<f64>,
    pub disk_write: Vec<f64>,
    /// Most recently resolved memory percent; `None` only when there was no data at all.
    pub memory_percent: Option<f64>,
    /// `collected_at` of the newest contributing snapshot.
    pub last_timestamp: Option<i64>,
}

impl DerivedSeries {
    /// All-padding series of the given width.
    pub fn empty(window_size: usize) -> Self {
        Self {
            time: vec![TIME_PLACEHOLDER.to_string(); window_size],
            cpu: vec![0.0; window_size],
            net_in: vec![0.0; window_size],
            net_out: vec![0.0; window_size],
            disk_read: vec![0.0; window_size],
            disk_write: vec![0.0; window_size],
            memory_percent: None,
            last_timestamp: None,
        }
    }
}
