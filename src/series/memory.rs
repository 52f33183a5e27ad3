// Memory percent: one chain for guests, a separate one for hosts. They are not interchangeable.

use crate::models::{HostMemory, Snapshot};

pub fn clamp_percent(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

/// Guest memory percent: `used / max`, else `(max - free) / max`, clamped to [0, 100].
/// Each field falls back to the raw upstream field (`mem`, `freemem`, `maxmem`).
/// `None` when max is missing or not positive, or when neither used nor free is known.
pub fn memory_percent(snapshot: &Snapshot) -> Option<f64> {
    let max = finite(snapshot.memory.max)
        .or_else(|| snapshot.raw_value("maxmem"))
        .filter(|m| *m > 0.0)?;

    let used = finite(snapshot.memory.used).or_else(|| snapshot.raw_value("mem"));
    if let Some(used) = used {
        return Some(clamp_percent(used / max * 100.0));
    }

    let free = finite(snapshot.memory.free).or_else(|| snapshot.raw_value("freemem"))?;
    Some(clamp_percent((max - free) / max * 100.0))
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|v| v.is_finite())
}

/// Host memory percent: `used / total`, else `(total - free) / total` where free falls back to
/// `available`, clamped to [0, 100].
pub fn host_memory_percent(memory: &HostMemory) -> Option<f64> {
    let total = memory.total.filter(|t| t.is_finite() && *t > 0.0)?;
    if let Some(used) = memory.used.filter(|u| u.is_finite()) {
        return Some(clamp_percent(used / total * 100.0));
    }
    let free = memory
        .free
        .or(memory.available)
        .filter(|f| f.is_finite())?;
    Some(clamp_percent((total - free) / total * 100.0))
}
