// raw_counters column codec: JSON object of numeric upstream fields.

use crate::models::RawCounters;

pub(super) fn encode(raw: &RawCounters) -> Result<String, serde_json::Error> {
    serde_json::to_string(raw)
}

/// Unreadable or legacy column content decodes to an empty map.
pub(super) fn decode(text: Option<&str>) -> RawCounters {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return RawCounters::new();
    };
    serde_json::from_str(text).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "raw counters (corrupt), using empty");
        RawCounters::new()
    })
}
