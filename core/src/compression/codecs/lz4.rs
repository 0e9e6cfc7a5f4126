//! codecs/lz4.rs
//! LZ4 frame format over lz4_flex.
//!
//! The encoder streams: each write pushes whole blocks into the frame as soon
//! as lz4_flex's block buffer fills. The decoder collects the frame and
//! decodes it once the source is exhausted.
//!
//! lz4_flex treats a source that ends between two blocks as a finished frame,
//! so the collected input is walked first and every frame must reach its
//! zero end mark.
use std::io::{self, Read, Write};

use byteorder::{ByteOrder, LittleEndian};
use lz4_flex::frame::{FrameDecoder, FrameEncoder};

use crate::compression::constants::{codec_ids, MAX_RETAINED_BUFFER};
use crate::compression::registry::CodecRegistry;
use crate::compression::stream::{PooledReader, PooledWriter, StreamPools};
use crate::compression::types::{Codec, CodecError, Compressor, Decompressor, ReadClose, Reset, WriteClose};

const NAME: &str = "lz4";

const FRAME_MAGIC: u32 = 0x184D_2204;
const SKIPPABLE_MAGIC: u32 = 0x184D_2A50;
const SKIPPABLE_MASK: u32 = 0xFFFF_FFF0;

// Frame descriptor FLG bits.
const FLG_BLOCK_CHECKSUM: u8 = 0x10;
const FLG_CONTENT_SIZE: u8 = 0x08;
const FLG_CONTENT_CHECKSUM: u8 = 0x04;
const FLG_DICT_ID: u8 = 0x01;

const BLOCK_UNCOMPRESSED: u32 = 0x8000_0000;

/// Register the default lz4 codec.
pub fn register(registry: &CodecRegistry) -> Result<(), CodecError> {
    registry.register(Lz4Codec::new).map(|_| ())
}

pub struct Lz4Codec {
    pools: StreamPools<Lz4Compressor, Lz4Decompressor>,
}

impl Lz4Codec {
    pub fn new() -> Self {
        let pools = StreamPools::new(NAME, || Ok(Lz4Compressor::new()), || Ok(Lz4Decompressor::new()));
        Self { pools }
    }

    pub fn pools(&self) -> &StreamPools<Lz4Compressor, Lz4Decompressor> {
        &self.pools
    }

    pub fn reader<R: Read>(&self, source: R) -> Result<PooledReader<Lz4Decompressor, R>, CodecError> {
        self.pools.reader(source)
    }

    pub fn writer<W: Write>(&self, sink: W) -> Result<PooledWriter<Lz4Compressor, W>, CodecError> {
        self.pools.writer(sink)
    }
}

impl Default for Lz4Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Lz4Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lz4Codec").finish_non_exhaustive()
    }
}

impl Codec for Lz4Codec {
    fn code(&self) -> i8 {
        codec_ids::LZ4
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

pub struct Lz4Compressor {
    /// Open frame; created on first use since `finish` consumes it.
    encoder: Option<FrameEncoder<Vec<u8>>>,
    /// Output buffer recycled from the previous frame.
    spare: Vec<u8>,
}

impl Lz4Compressor {
    pub fn new() -> Self {
        Self { encoder: None, spare: Vec::new() }
    }

    fn open(&mut self) -> &mut FrameEncoder<Vec<u8>> {
        let spare = &mut self.spare;
        self.encoder.get_or_insert_with(|| FrameEncoder::new(std::mem::take(spare)))
    }
}

impl Default for Lz4Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for Lz4Compressor {
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError> {
        let encoder = self.open();
        encoder.write_all(input).map_err(|e| CodecError::process(NAME, e))?;
        let ready = encoder.get_mut();
        out.extend_from_slice(ready);
        ready.clear();
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        // An untouched compressor still emits a valid empty frame.
        let encoder = match self.encoder.take() {
            Some(encoder) => encoder,
            None => FrameEncoder::new(std::mem::take(&mut self.spare)),
        };
        let mut tail = encoder.finish().map_err(|e| CodecError::process(NAME, e))?;
        out.extend_from_slice(&tail);
        tail.clear();
        self.spare = tail;
        Ok(())
    }
}

impl Reset for Lz4Compressor {
    fn reset(&mut self) -> io::Result<()> {
        // An abandoned frame is dropped; its buffer is not worth salvaging.
        self.encoder = None;
        self.spare.clear();
        self.spare.shrink_to(MAX_RETAINED_BUFFER);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Decompressor
// ---------------------------------------------------------------------------

pub struct Lz4Decompressor {
    pending: Vec<u8>,
}

impl Lz4Decompressor {
    pub fn new() -> Self {
        Self { pending: Vec::new() }
    }
}

impl Default for Lz4Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for Lz4Decompressor {
    fn decompress_chunk(&mut self, input: &[u8], _out: &mut Vec<u8>) -> Result<(), CodecError> {
        self.pending.extend_from_slice(input);
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let start = out.len();
        let result = read_frames(&self.pending, out);
        self.pending.clear();
        if let Err(e) = result {
            out.truncate(start);
            return Err(CodecError::process(NAME, e));
        }
        Ok(())
    }
}

/// Decode every frame in `src`. The frame decoder reports EOF at each end
/// mark, so keep going until the input is used up.
fn read_frames(src: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
    check_frames(src)?;
    let mut frames = FrameDecoder::new(src);
    loop {
        frames.read_to_end(out)?;
        if frames.get_mut().is_empty() {
            return Ok(());
        }
    }
}

/// Walk the frame layout of `src` without decoding, failing on any frame
/// cut before its end mark (or content checksum).
fn check_frames(src: &[u8]) -> io::Result<()> {
    let mut pos = 0;
    while pos < src.len() {
        pos += frame_len(&src[pos..])?;
    }
    Ok(())
}

/// Length of the frame at the start of `src`, end mark included.
fn frame_len(src: &[u8]) -> io::Result<usize> {
    let magic = read_u32(src, 0)?;
    if magic & SKIPPABLE_MASK == SKIPPABLE_MAGIC {
        let len = 8 + read_u32(src, 4)? as usize;
        return within(src, len);
    }
    if magic != FRAME_MAGIC {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "invalid lz4 frame magic"));
    }

    let flg = *src.get(4).ok_or_else(truncated)?;
    // FLG, BD, optional content size and dictionary id, header checksum.
    let mut pos = 6;
    if flg & FLG_CONTENT_SIZE != 0 {
        pos += 8;
    }
    if flg & FLG_DICT_ID != 0 {
        pos += 4;
    }
    pos += 1;

    let block_trailer = if flg & FLG_BLOCK_CHECKSUM != 0 { 4 } else { 0 };
    loop {
        let header = read_u32(src, pos)?;
        pos += 4;
        if header == 0 {
            break;
        }
        let len = (header & !BLOCK_UNCOMPRESSED) as usize + block_trailer;
        pos = within(src, pos.saturating_add(len))?;
    }
    if flg & FLG_CONTENT_CHECKSUM != 0 {
        pos += 4;
    }
    within(src, pos)
}

fn read_u32(src: &[u8], pos: usize) -> io::Result<u32> {
    src.get(pos..pos + 4).map(LittleEndian::read_u32).ok_or_else(truncated)
}

fn within(src: &[u8], end: usize) -> io::Result<usize> {
    if end > src.len() {
        return Err(truncated());
    }
    Ok(end)
}

fn truncated() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "lz4 frame ends before its end mark")
}

impl Reset for Lz4Decompressor {
    fn reset(&mut self) -> io::Result<()> {
        self.pending.clear();
        self.pending.shrink_to(MAX_RETAINED_BUFFER);
        Ok(())
    }
}
