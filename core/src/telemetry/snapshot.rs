//! telemetry/snapshot.rs
//!
//! Point-in-time view of a pool's counters.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub created: u64,
    pub reused: u64,
    pub released: u64,
    pub discarded: u64,
    /// Engines sitting in the free list when the snapshot was taken.
    pub idle: usize,
}

impl PoolSnapshot {
    /// Total successful acquisitions.
    pub fn acquired(&self) -> u64 {
        self.created + self.reused
    }

    /// Engines currently owned by live readers/writers (or leaked).
    pub fn in_flight(&self) -> u64 {
        self.acquired()
            .saturating_sub(self.released)
            .saturating_sub(self.discarded)
    }

    /// Fraction of acquisitions served from the free list.
    pub fn reuse_ratio(&self) -> f64 {
        let acquired = self.acquired();
        if acquired == 0 {
            0.0
        } else {
            self.reused as f64 / acquired as f64
        }
    }
}
