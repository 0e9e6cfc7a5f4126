//! compression/mod.rs
//! Pluggable record-batch compression.
//!
//! Industry notes:
//! - Codecs are identified on the wire by a stable `i8` code.
//! - The registry resolves codes to shared codec instances.
//! - Each codec recycles its engines through a lock-free pool; streams borrow
//!   an engine for their lifetime and hand it back on close or drop.

pub mod codecs;
pub mod config;
pub mod constants;
pub mod pool;
pub mod registry;
pub mod stream;
pub mod types;

pub use config::CodecConfig;
pub use constants::codec_ids;
pub use pool::StreamPool;
pub use registry::{global, lookup, register_codec, CodecRegistry};
pub use stream::{Engine, PooledReader, PooledWriter, StreamPools};
pub use types::*;
