//! compress-core
//!
//! Pooled, pluggable codecs for record-batch compression.
//! Pure Rust API over flate2, snap, lz4_flex and zstd.

#![forbid(unsafe_code)]

// Shared and top level
pub mod utils;

pub mod compression;
pub mod telemetry;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::compression::codecs::{GzipCodec, Lz4Codec, NoopCodec, SnappyCodec, ZstdCodec};
    pub use crate::compression::{
        lookup, register_codec, Codec, CodecConfig, CodecError, CodecRegistry, CompressionCodec, ReadClose,
        WriteClose,
    };
    pub use crate::telemetry::PoolSnapshot;
}
