//! compression/config.rs
//! Producer-side codec selection.
//!
//! A `CodecConfig` names a codec plus optional tuning. Untuned configs resolve
//! to the shared registry instance so every producer draws from the same pools;
//! tuned configs build a dedicated codec with its own pools.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compression::codecs::{GzipCodec, SnappyCodec, ZstdCodec};
use crate::compression::constants::DEFAULT_XERIAL_BLOCK_SIZE;
use crate::compression::registry::{self, CodecRegistry};
use crate::compression::types::{Codec, CodecError, CompressionCodec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// `none`, `gzip`, `snappy`, `lz4` or `zstd`.
    pub codec: String,

    /// Compression level. gzip 0..=9, zstd 0..=22 (0 = library default).
    pub level: Option<i32>,

    /// Emit xerial-framed snappy instead of a single raw block.
    pub framed: bool,

    /// Uncompressed bytes per xerial chunk when `framed` is set.
    pub block_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::None.name().to_string(),
            level: None,
            framed: false,
            block_size: DEFAULT_XERIAL_BLOCK_SIZE,
        }
    }
}

impl CodecConfig {
    pub fn new(codec: impl Into<String>) -> Self {
        Self { codec: codec.into(), ..Self::default() }
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    /// Xerial framing with `block_size` byte chunks (snappy only).
    pub fn with_framing(mut self, block_size: usize) -> Self {
        self.framed = true;
        self.block_size = block_size;
        self
    }

    pub fn kind(&self) -> Result<CompressionCodec, CodecError> {
        self.codec.parse()
    }

    /// Check names and option combinations without building anything.
    pub fn validate(&self) -> Result<(), CodecError> {
        let kind = self.kind()?;
        if self.framed && kind != CompressionCodec::Snappy {
            return Err(CodecError::InvalidConfig(format!("{} does not support xerial framing", kind.name())));
        }
        if self.level.is_some() && matches!(kind, CompressionCodec::None | CompressionCodec::Snappy | CompressionCodec::Lz4) {
            return Err(CodecError::InvalidConfig(format!("{} does not take a compression level", kind.name())));
        }
        Ok(())
    }

    /// Resolve against the process-wide registry. `None` means "send uncompressed".
    pub fn build(&self) -> Result<Option<Arc<dyn Codec>>, CodecError> {
        self.build_in(registry::global())
    }

    pub fn build_in(&self, registry: &CodecRegistry) -> Result<Option<Arc<dyn Codec>>, CodecError> {
        self.validate()?;
        let kind = self.kind()?;

        let codec: Arc<dyn Codec> = match (kind, self.level) {
            (CompressionCodec::None, _) => return Ok(None),
            (CompressionCodec::Gzip, Some(level)) => {
                let level = u32::try_from(level)
                    .map_err(|_| CodecError::InvalidConfig(format!("gzip level {} is negative", level)))?;
                Arc::new(GzipCodec::with_level(level)?)
            }
            (CompressionCodec::Zstd, Some(level)) => Arc::new(ZstdCodec::with_level(level)?),
            (CompressionCodec::Snappy, _) if self.framed => Arc::new(SnappyCodec::framed(self.block_size)?),
            _ => return registry.lookup(kind.code()).map(Some),
        };

        debug!(codec = codec.name(), level = ?self.level, framed = self.framed, "built dedicated codec");
        Ok(Some(codec))
    }
}
