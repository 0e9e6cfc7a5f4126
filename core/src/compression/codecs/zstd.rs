//! codecs/zstd.rs
//! Zstd streaming compressor/decompressor.
//!
//! Design notes:
//! - Uses the raw `Operation` API so the pooled contexts can be `reinit`ed
//!   between streams instead of being rebuilt.
//! - Output is staged through a fixed scratch window and appended to the
//!   caller's buffer.
//! - Concatenated frames decode back to back; a stream that ends inside a
//!   frame is rejected on `finish`.
use std::io::{self, Read, Write};

use zstd::stream::raw::{Decoder, Encoder, Operation, OutBuffer};

use crate::compression::constants::{codec_ids, DEFAULT_LEVEL_ZSTD, MAX_LEVEL_ZSTD, SCRATCH_SIZE};
use crate::compression::registry::CodecRegistry;
use crate::compression::stream::{PooledReader, PooledWriter, StreamPools};
use crate::compression::types::{Codec, CodecError, Compressor, Decompressor, ReadClose, Reset, WriteClose};

const NAME: &str = "zstd";

/// Register the default zstd codec.
pub fn register(registry: &CodecRegistry) -> Result<(), CodecError> {
    registry.register(ZstdCodec::new).map(|_| ())
}

pub struct ZstdCodec {
    level: i32,
    pools: StreamPools<ZstdCompressor, ZstdDecompressor>,
}

impl ZstdCodec {
    pub fn new() -> Self {
        Self::build(DEFAULT_LEVEL_ZSTD)
    }

    /// Zstd codec compressing at `level`; 0 selects the library default.
    pub fn with_level(level: i32) -> Result<Self, CodecError> {
        if !(0..=MAX_LEVEL_ZSTD).contains(&level) {
            return Err(CodecError::InvalidConfig(format!(
                "zstd level {} out of range 0..={}",
                level, MAX_LEVEL_ZSTD
            )));
        }
        Ok(Self::build(level))
    }

    fn build(level: i32) -> Self {
        let pools = StreamPools::new(NAME, move || ZstdCompressor::new(level), ZstdDecompressor::new);
        Self { level, pools }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn pools(&self) -> &StreamPools<ZstdCompressor, ZstdDecompressor> {
        &self.pools
    }

    pub fn reader<R: Read>(&self, source: R) -> Result<PooledReader<ZstdDecompressor, R>, CodecError> {
        self.pools.reader(source)
    }

    pub fn writer<W: Write>(&self, sink: W) -> Result<PooledWriter<ZstdCompressor, W>, CodecError> {
        self.pools.writer(sink)
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ZstdCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZstdCodec").field("level", &self.level).finish()
    }
}

impl Codec for ZstdCodec {
    fn code(&self) -> i8 {
        codec_ids::ZSTD
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn new_reader<'a>(&self, source: Box<dyn Read + Send + 'a>) -> Result<Box<dyn ReadClose + 'a>, CodecError> {
        Ok(Box::new(self.reader(source)?))
    }

    fn new_writer<'a>(&self, sink: Box<dyn Write + Send + 'a>) -> Result<Box<dyn WriteClose + 'a>, CodecError> {
        Ok(Box::new(self.writer(sink)?))
    }
}

// ---------------------------------------------------------------------------
// Compressor
// ---------------------------------------------------------------------------

pub struct ZstdCompressor {
    raw: Encoder<'static>,
    scratch: Vec<u8>,
}

impl ZstdCompressor {
    /// # Errors
    /// Fails when zstd cannot allocate a compression context.
    pub fn new(level: i32) -> io::Result<Self> {
        Ok(Self { raw: Encoder::new(level)?, scratch: vec![0; SCRATCH_SIZE] })
    }
}

impl Compressor for ZstdCompressor {
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError> {
        let mut consumed = 0;
        while consumed < input.len() {
            let status = self
                .raw
                .run_on_buffers(&input[consumed..], &mut self.scratch)
                .map_err(|e| CodecError::process(NAME, e))?;
            out.extend_from_slice(&self.scratch[..status.bytes_written]);
            consumed += status.bytes_read;
            if status.bytes_read == 0 && status.bytes_written == 0 {
                return Err(CodecError::process(NAME, "encoder made no progress"));
            }
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        loop {
            let mut buffer = OutBuffer::around(&mut self.scratch[..]);
            let remaining = self
                .raw
                .finish(&mut buffer, false)
                .map_err(|e| CodecError::process(NAME, e))?;
            let written = buffer.pos();
            out.extend_from_slice(&self.scratch[..written]);
            if remaining == 0 {
                return Ok(());
            }
        }
    }
}

impl Reset for ZstdCompressor {
    fn reset(&mut self) -> io::Result<()> {
        self.raw.reinit()
    }
}

// ---------------------------------------------------------------------------
// Decompressor
// ---------------------------------------------------------------------------

pub struct ZstdDecompressor {
    raw: Decoder<'static>,
    scratch: Vec<u8>,
    /// True while the last byte seen sits inside an unfinished frame.
    in_frame: bool,
}

impl ZstdDecompressor {
    /// # Errors
    /// Fails when zstd cannot allocate a decompression context.
    pub fn new() -> io::Result<Self> {
        Ok(Self { raw: Decoder::new()?, scratch: vec![0; SCRATCH_SIZE], in_frame: false })
    }
}

impl Decompressor for ZstdDecompressor {
    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError> {
        let mut consumed = 0;
        loop {
            let status = self
                .raw
                .run_on_buffers(&input[consumed..], &mut self.scratch)
                .map_err(|e| CodecError::process(NAME, e))?;
            out.extend_from_slice(&self.scratch[..status.bytes_written]);
            consumed += status.bytes_read;
            self.in_frame = status.remaining != 0;

            // A full scratch window may hide more buffered output.
            if consumed == input.len() && status.bytes_written < self.scratch.len() {
                return Ok(());
            }
            if status.bytes_read == 0 && status.bytes_written == 0 {
                return Err(CodecError::process(NAME, "decoder made no progress"));
            }
        }
    }

    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<(), CodecError> {
        if self.in_frame {
            return Err(CodecError::process(NAME, "incomplete zstd frame"));
        }
        Ok(())
    }
}

impl Reset for ZstdDecompressor {
    fn reset(&mut self) -> io::Result<()> {
        self.in_frame = false;
        self.raw.reinit()
    }
}
