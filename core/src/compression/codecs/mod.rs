//! compression/codecs/mod.rs
//! Built-in codecs.
//!
//! Industry notes:
//! - Every codec draws its engines from its own `StreamPools`.
//! - Snappy decoding goes through the xerial framer, which also accepts
//!   plain unframed blocks.
//! - `NoopCodec` is a baseline only and is never registered by default.

pub mod gzip;
pub mod lz4;
pub mod noop;
pub mod snappy;
pub mod xerial;
pub mod zstd;

pub use gzip::{GzipCodec, GzipCompressor, GzipDecompressor};
pub use lz4::{Lz4Codec, Lz4Compressor, Lz4Decompressor};
pub use noop::{NoopCodec, NopReader, NopWriter};
pub use snappy::{SnappyCodec, SnappyCompressor, SnappyDecompressor};
pub use xerial::{is_xerial_header, XerialChunks};
pub use zstd::{ZstdCodec, ZstdCompressor, ZstdDecompressor};
