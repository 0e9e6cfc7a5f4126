//! compression/pool.rs
//! Free-list pool of reusable compression engines.
//!
//! Industry notes:
//! - `acquire` pops an idle engine or builds a new one; it never blocks.
//! - `release` resets before pushing, so a stream that is leaked instead of
//!   closed only shrinks the pool and can never hand stale state to a later
//!   acquirer.
//! - An engine whose reset fails is dropped rather than pooled.
use std::fmt;
use std::io;
use std::sync::Arc;

use crossbeam::queue::SegQueue;
use tracing::{debug, trace, warn};

use crate::compression::types::{CodecError, Reset};
use crate::telemetry::{PoolCounters, PoolSnapshot};

type Factory<T> = Box<dyn Fn() -> io::Result<T> + Send + Sync>;

pub struct StreamPool<T> {
    name: &'static str,
    free: SegQueue<T>,
    factory: Factory<T>,
    counters: PoolCounters,
}

impl<T: Reset + Send> StreamPool<T> {
    pub fn new<F>(name: &'static str, factory: F) -> Arc<Self>
    where
        F: Fn() -> io::Result<T> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name,
            free: SegQueue::new(),
            factory: Box::new(factory),
            counters: PoolCounters::default(),
        })
    }

    /// Take exclusive ownership of an idle engine, building one on a miss.
    pub fn acquire(&self) -> Result<T, CodecError> {
        if let Some(item) = self.free.pop() {
            self.counters.add_reused();
            trace!(pool = self.name, "reusing pooled engine");
            return Ok(item);
        }

        let item = (self.factory)().map_err(|err| CodecError::init(self.name, err))?;
        self.counters.add_created();
        debug!(pool = self.name, "pool miss, built new engine");
        Ok(item)
    }

    /// Reset `item` and make it available to the next `acquire`.
    pub fn release(&self, mut item: T) {
        match item.reset() {
            Ok(()) => {
                self.free.push(item);
                self.counters.add_released();
                trace!(pool = self.name, "engine returned to pool");
            }
            Err(err) => {
                self.counters.add_discarded();
                warn!(pool = self.name, error = %err, "discarding engine that failed to reset");
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of engines currently waiting in the free list.
    pub fn idle(&self) -> usize {
        self.free.len()
    }

    pub fn stats(&self) -> PoolSnapshot {
        self.counters.snapshot(self.idle())
    }
}

impl<T> fmt::Debug for StreamPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamPool")
            .field("name", &self.name)
            .field("idle", &self.free.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Scratch {
        bytes: Vec<u8>,
        fail_reset: bool,
    }

    impl Reset for Scratch {
        fn reset(&mut self) -> io::Result<()> {
            if self.fail_reset {
                return Err(io::Error::new(io::ErrorKind::Other, "stuck"));
            }
            self.bytes.clear();
            Ok(())
        }
    }

    #[test]
    fn acquire_on_empty_pool_builds_engine() {
        let pool = StreamPool::new("scratch", || Ok(Scratch::default()));
        let _item = pool.acquire().unwrap();
        let stats = pool.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.reused, 0);
        assert_eq!(stats.idle, 0);
    }

    #[test]
    fn release_resets_before_reuse() {
        let pool = StreamPool::new("scratch", || Ok(Scratch::default()));
        let mut item = pool.acquire().unwrap();
        item.bytes.extend_from_slice(b"left over");
        pool.release(item);

        let item = pool.acquire().unwrap();
        assert!(item.bytes.is_empty());
        assert_eq!(pool.stats().reused, 1);
    }

    #[test]
    fn failed_reset_discards_engine() {
        let pool = StreamPool::new("scratch", || Ok(Scratch::default()));
        let mut item = pool.acquire().unwrap();
        item.fail_reset = true;
        pool.release(item);

        let stats = pool.stats();
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.idle, 0);
    }

    #[test]
    fn factory_error_is_init_failure() {
        let pool: Arc<StreamPool<Scratch>> = StreamPool::new("broken", || {
            Err(io::Error::new(io::ErrorKind::OutOfMemory, "no room"))
        });
        match pool.acquire() {
            Err(CodecError::CodecInitFailed { codec, .. }) => assert_eq!(codec, "broken"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
