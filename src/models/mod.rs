// Domain models: stored snapshots, derived series, host and guest listings

mod node;
mod series;
mod snapshot;

pub use node::{EnrichedGuest, GuestListing, HostMemory, NodeStatusPayload, NodeSummary};
pub use series::{DerivedSeries, TIME_PLACEHOLDER};
pub use snapshot::{EntityKey, MemoryReading, MetricRecord, RawCounters, Snapshot, SnapshotSummary};
