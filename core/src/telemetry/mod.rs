//! telemetry/mod.rs
//! Pool counters and their snapshots.

pub mod counters;
pub mod snapshot;

pub use counters::PoolCounters;
pub use snapshot::PoolSnapshot;
