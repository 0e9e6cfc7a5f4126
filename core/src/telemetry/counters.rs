//! telemetry/counters.rs
//! Lock-free counters kept by every stream pool.
//!
//! Summary: records how often a pool allocated, reused, took back or dropped
//! an engine. Converted into an immutable `PoolSnapshot` on demand.
use std::sync::atomic::{AtomicU64, Ordering};

use crate::telemetry::snapshot::PoolSnapshot;

#[derive(Debug, Default)]
pub struct PoolCounters {
    created: AtomicU64,
    reused: AtomicU64,
    released: AtomicU64,
    discarded: AtomicU64,
}

impl PoolCounters {
    /// Record an engine built because the free list was empty.
    pub fn add_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an engine popped from the free list.
    pub fn add_reused(&self) {
        self.reused.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an engine reset and pushed back.
    pub fn add_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an engine dropped because it could not be reset.
    pub fn add_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, idle: usize) -> PoolSnapshot {
        PoolSnapshot {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            idle,
        }
    }
}
