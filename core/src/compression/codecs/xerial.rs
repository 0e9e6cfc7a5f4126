//! codecs/xerial.rs
//! Xerial snappy framing used by legacy JVM producers.
//!
//! Layout: a 16-byte header (magic, version, min compatible version) followed
//! by chunks of `u32` big-endian length + raw snappy block. Input that does
//! not start with the full header is a single unframed snappy block.
use byteorder::{BigEndian, ByteOrder};
use snap::raw::{decompress_len, max_compress_len, Decoder, Encoder};
use tracing::{debug, trace};

use crate::compression::constants::{XERIAL_HEADER, XERIAL_HEADER_LEN, XERIAL_LEN_PREFIX};
use crate::compression::types::CodecError;

const NAME: &str = "snappy";

/// Upper bound on snappy expansion: a 3-byte copy emits at most 64 bytes.
const MAX_EXPANSION: usize = 22;
/// Slack for the length varint and a leading literal tag.
const EXPANSION_SLACK: usize = 32;

/// True when `src` starts with the complete 16-byte xerial header.
pub fn is_xerial_header(src: &[u8]) -> bool {
    src.len() >= XERIAL_HEADER_LEN && src[..XERIAL_HEADER_LEN] == XERIAL_HEADER
}

/// Iterator over the raw snappy chunks of a xerial-framed buffer.
///
/// Yields one `CorruptFrame` error and then stops when a length prefix is
/// truncated or points past the end of the buffer.
#[derive(Debug, Clone)]
pub struct XerialChunks<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> XerialChunks<'a> {
    /// `None` when `src` carries no xerial header.
    pub fn new(src: &'a [u8]) -> Option<Self> {
        is_xerial_header(src).then_some(Self { src, pos: XERIAL_HEADER_LEN })
    }

    /// Offset of the next length prefix.
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn fail(&mut self, reason: &'static str) -> Option<Result<&'a [u8], CodecError>> {
        let offset = self.pos;
        debug!(offset, reason, "rejecting corrupt xerial frame");
        self.pos = self.src.len();
        Some(Err(CodecError::CorruptFrame { offset, reason }))
    }
}

impl<'a> Iterator for XerialChunks<'a> {
    type Item = Result<&'a [u8], CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        let src = self.src;
        if self.pos >= src.len() {
            return None;
        }

        let rest = &src[self.pos..];
        if rest.len() < XERIAL_LEN_PREFIX {
            return self.fail("truncated chunk length");
        }
        let len = BigEndian::read_u32(&rest[..XERIAL_LEN_PREFIX]) as usize;
        let body = &rest[XERIAL_LEN_PREFIX..];
        if len > body.len() {
            return self.fail("chunk length exceeds remaining input");
        }

        self.pos += XERIAL_LEN_PREFIX + len;
        Some(Ok(&body[..len]))
    }
}

/// Decode `src`, framed or not, appending the payload to `out`.
///
/// An empty `src` is an empty payload.
pub fn decode_into(decoder: &mut Decoder, src: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError> {
    if src.is_empty() {
        return Ok(());
    }
    match XerialChunks::new(src) {
        None => decode_block(decoder, src, out),
        Some(chunks) => {
            let mut count = 0usize;
            for chunk in chunks {
                decode_block(decoder, chunk?, out)?;
                count += 1;
            }
            trace!(chunks = count, "decoded xerial frame");
            Ok(())
        }
    }
}

fn decode_block(decoder: &mut Decoder, block: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError> {
    let len = decompress_len(block).map_err(|e| CodecError::process(NAME, e))?;
    let limit = block.len().saturating_mul(MAX_EXPANSION).saturating_add(EXPANSION_SLACK);
    if len > limit {
        return Err(CodecError::process(
            NAME,
            format!("block of {} bytes claims {} decompressed bytes", block.len(), len),
        ));
    }
    let start = out.len();
    out.resize(start + len, 0);
    match decoder.decompress(block, &mut out[start..]) {
        Ok(n) => {
            out.truncate(start + n);
            Ok(())
        }
        Err(e) => {
            out.truncate(start);
            Err(CodecError::process(NAME, e))
        }
    }
}

/// Append `src` to `out` as one unframed snappy block.
pub fn encode_into(encoder: &mut Encoder, src: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError> {
    let start = out.len();
    out.resize(start + max_compress_len(src.len()), 0);
    match encoder.compress(src, &mut out[start..]) {
        Ok(n) => {
            out.truncate(start + n);
            Ok(())
        }
        Err(e) => {
            out.truncate(start);
            Err(CodecError::process(NAME, e))
        }
    }
}

/// Append `src` to `out` as a xerial frame with chunks of at most
/// `block_size` uncompressed bytes.
pub fn encode_framed_into(
    encoder: &mut Encoder,
    src: &[u8],
    block_size: usize,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    if block_size == 0 {
        return Err(CodecError::InvalidConfig("xerial block size must be positive".into()));
    }
    out.extend_from_slice(&XERIAL_HEADER);
    for chunk in src.chunks(block_size) {
        let prefix = out.len();
        out.extend_from_slice(&[0u8; XERIAL_LEN_PREFIX]);
        encode_into(encoder, chunk, out)?;
        let len = out.len() - prefix - XERIAL_LEN_PREFIX;
        let len = u32::try_from(len).map_err(|_| CodecError::process(NAME, "xerial chunk exceeds u32 length"))?;
        BigEndian::write_u32(&mut out[prefix..prefix + XERIAL_LEN_PREFIX], len);
    }
    Ok(())
}

/// Decode a framed or unframed buffer with a throwaway decoder.
pub fn decode(src: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    decode_into(&mut Decoder::new(), src, &mut out)?;
    Ok(out)
}

/// Encode `src` as one unframed block with a throwaway encoder.
pub fn encode(src: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    encode_into(&mut Encoder::new(), src, &mut out)?;
    Ok(out)
}
