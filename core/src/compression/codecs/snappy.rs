//! codecs/snappy.rs
//! Snappy block codec with xerial frame compatibility.
//!
//! Snappy blocks are not streamable, so both engines buffer the whole payload
//! and do the work in `finish`. Decoding accepts xerial-framed and unframed
//! input; encoding emits one unframed block unless framing is configured.
use std::io::{self, Read, Write};

use snap::raw::{Decoder, Encoder};

use crate::compression::codecs::xerial;
use crate::compression::constants::{codec_ids, MAX_RETAINED_BUFFER};
use crate::compression::registry::CodecRegistry;
use crate::compression::stream::{PooledReader, PooledWriter, StreamPools};
use crate::compression::types::{Codec, CodecError, Compressor, Decompressor, ReadClose, Reset, WriteClose};

const NAME: &str = "snappy";

/// Register the default (unframed) snappy codec.
pub fn register(registry: &CodecRegistry) -> Result<(), CodecError> {
    registry.register(SnappyCodec::new).map(|_| ())
}

pub struct SnappyCodec {
    /// Chunk size when emitting xerial frames; `None` writes a single raw block.
    framing: Option<usize>,
    pools: StreamPools<SnappyCompressor, SnappyDecompressor>,
}

impl SnappyCodec {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Snappy codec whose writers emit xerial frames of `block_size` byte chunks.
    pub fn framed(block_size: usize) -> Result<Self, CodecError> {
        if block_size == 0 || u32::try_from(block_size).is_err() {
            return Err(CodecError::InvalidConfig(format!(
                "xerial block size {} out of range 1..={}",
                block_size,
                u32::MAX
            )));
        }
        Ok(Self::build(Some(block_size)))
    }

    fn build(framing: Option<usize>) -> Self {
        let pools = StreamPools::new(
            NAME,
            move || Ok(SnappyCompressor::new(framing)),
            || Ok(SnappyDecompressor::new()),
        );
        Self { framing, pools }
    }

    pub fn block_size(&self) -> Option<usize> {
        self.framing
    }

    pub fn is_framed(&self) -> bool {
        self.framing.is_some()
    }

    pub fn pools(&self) -> &StreamPools<SnappyCompressor, SnappyDecompressor> {
        &self.pools
    }

    pub fn reader<R: Read>(&self, source: R) -> Result<PooledReader<SnappyDecompressor, R>, CodecError> {
        self.pools.reader(source)
    }

    pub fn writer<W: Write>(&self, sink: W) -> Result<PooledWriter<SnappyCompressor, W>, CodecError> {
        self.pools.writer(sink)
    }
}

impl Default for SnappyCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SnappyCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnappyCodec").field("framing", &self.framing).finish()
    }
}

impl Codec for SnappyCodec {
    fn code(&self) -> i8 {
        codec_ids::SNAPPY
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

    // One-shot paths skip the stream buffers and hit the pooled engines directly.
    fn encode(&self, src: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.pools.with_compressor(|engine| {
            let mut out = Vec::new();
            engine.encode_into(src, &mut out)?;
            Ok(out)
        })
    }

    fn decode(&self, src: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.pools.with_decompressor(|engine| {
            let mut out = Vec::new();
            xerial::decode_into(&mut engine.decoder, src, &mut out)?;
            Ok(out)
        })
    }
}

// ---------------------------------------------------------------------------
// Compressor
// ---------------------------------------------------------------------------

pub struct SnappyCompressor {
    encoder: Encoder,
    framing: Option<usize>,
    buffered: Vec<u8>,
}

impl SnappyCompressor {
    pub fn new(framing: Option<usize>) -> Self {
        Self { encoder: Encoder::new(), framing, buffered: Vec::new() }
    }

    fn encode_into(&mut self, src: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError> {
        match self.framing {
            Some(block_size) => xerial::encode_framed_into(&mut self.encoder, src, block_size, out),
            None => xerial::encode_into(&mut self.encoder, src, out),
        }
    }
}

impl Compressor for SnappyCompressor {
    fn compress_chunk(&mut self, input: &[u8], _out: &mut Vec<u8>) -> Result<(), CodecError> {
        self.buffered.extend_from_slice(input);
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let payload = std::mem::take(&mut self.buffered);
        let result = self.encode_into(&payload, out);
        self.buffered = payload;
        self.buffered.clear();
        result
    }
}

impl Reset for SnappyCompressor {
    fn reset(&mut self) -> io::Result<()> {
        self.buffered.clear();
        self.buffered.shrink_to(MAX_RETAINED_BUFFER);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Decompressor
// ---------------------------------------------------------------------------

pub struct SnappyDecompressor {
    decoder: Decoder,
    buffered: Vec<u8>,
}

impl SnappyDecompressor {
    pub fn new() -> Self {
        Self { decoder: Decoder::new(), buffered: Vec::new() }
    }
}

impl Default for SnappyDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for SnappyDecompressor {
    fn decompress_chunk(&mut self, input: &[u8], _out: &mut Vec<u8>) -> Result<(), CodecError> {
        self.buffered.extend_from_slice(input);
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let result = xerial::decode_into(&mut self.decoder, &self.buffered, out);
        self.buffered.clear();
        result
    }
}

impl Reset for SnappyDecompressor {
    fn reset(&mut self) -> io::Result<()> {
        self.buffered.clear();
        self.buffered.shrink_to(MAX_RETAINED_BUFFER);
        Ok(())
    }
}
