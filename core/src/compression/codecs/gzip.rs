//! codecs/gzip.rs
//! Gzip (RFC 1952) over pooled flate2 raw-deflate engines.
//!
//! Design notes:
//! - `flate2::Compress`/`Decompress` are the expensive part and expose
//!   `reset`, so they are what the pool recycles. The gzip member header and
//!   CRC-32/ISIZE trailer are written and checked here.
//! - The decoder accepts optional header fields and concatenated members.
//!   A header CRC16 (FHCRC), when present, is checked.
use std::io::{self, Read, Write};

use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::compression::constants::{codec_ids, DEFAULT_LEVEL_GZIP, MAX_LEVEL_GZIP, SCRATCH_SIZE};
use crate::compression::registry::CodecRegistry;
use crate::compression::stream::{PooledReader, PooledWriter, StreamPools};
use crate::compression::types::{Codec, CodecError, Compressor, Decompressor, ReadClose, Reset, WriteClose};

const NAME: &str = "gzip";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const METHOD_DEFLATE: u8 = 8;
const OS_UNKNOWN: u8 = 0xff;
const HEADER_LEN: usize = 10;
const TRAILER_LEN: usize = 8;

const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;
const FRESERVED: u8 = 0xe0;

/// Register the default gzip codec.
pub fn register(registry: &CodecRegistry) -> Result<(), CodecError> {
    registry.register(GzipCodec::new).map(|_| ())
}

pub struct GzipCodec {
    level: u32,
    pools: StreamPools<GzipCompressor, GzipDecompressor>,
}

impl GzipCodec {
    pub fn new() -> Self {
        Self::build(DEFAULT_LEVEL_GZIP)
    }

    /// Gzip codec compressing at `level` (0 = store, 9 = best).
    pub fn with_level(level: u32) -> Result<Self, CodecError> {
        if level > MAX_LEVEL_GZIP {
            return Err(CodecError::InvalidConfig(format!(
                "gzip level {} out of range 0..={}",
                level, MAX_LEVEL_GZIP
            )));
        }
        Ok(Self::build(level))
    }

    fn build(level: u32) -> Self {
        let pools = StreamPools::new(
            NAME,
            move || Ok(GzipCompressor::new(level)),
            || Ok(GzipDecompressor::new()),
        );
        Self { level, pools }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn pools(&self) -> &StreamPools<GzipCompressor, GzipDecompressor> {
        &self.pools
    }

    pub fn reader<R: Read>(&self, source: R) -> Result<PooledReader<GzipDecompressor, R>, CodecError> {
        self.pools.reader(source)
    }

    pub fn writer<W: Write>(&self, sink: W) -> Result<PooledWriter<GzipCompressor, W>, CodecError> {
        self.pools.writer(sink)
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GzipCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GzipCodec").field("level", &self.level).finish()
    }
}

impl Codec for GzipCodec {
    fn code(&self) -> i8 {
        codec_ids::GZIP
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

pub struct GzipCompressor {
    raw: Compress,
    crc: Hasher,
    size: u32,
    header_written: bool,
}

impl GzipCompressor {
    pub fn new(level: u32) -> Self {
        Self {
            raw: Compress::new(Compression::new(level), false),
            crc: Hasher::new(),
            size: 0,
            header_written: false,
        }
    }

    fn write_header(&mut self, out: &mut Vec<u8>) {
        if !self.header_written {
            out.extend_from_slice(&GZIP_MAGIC);
            // method, flags, mtime (4), xfl, os
            out.extend_from_slice(&[METHOD_DEFLATE, 0, 0, 0, 0, 0, 0, OS_UNKNOWN]);
            self.header_written = true;
        }
    }
}

impl Compressor for GzipCompressor {
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError> {
        self.write_header(out);
        self.crc.update(input);
        self.size = self.size.wrapping_add(input.len() as u32);

        let mut consumed = 0;
        while consumed < input.len() {
            out.reserve(SCRATCH_SIZE);
            let before = self.raw.total_in();
            self.raw
                .compress_vec(&input[consumed..], out, FlushCompress::None)
                .map_err(|e| CodecError::process(NAME, e))?;
            consumed += (self.raw.total_in() - before) as usize;
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        self.write_header(out);
        loop {
            out.reserve(SCRATCH_SIZE);
            let status = self
                .raw
                .compress_vec(&[], out, FlushCompress::Finish)
                .map_err(|e| CodecError::process(NAME, e))?;
            if status == Status::StreamEnd {
                break;
            }
        }

        let mut trailer = [0u8; TRAILER_LEN];
        LittleEndian::write_u32(&mut trailer[0..4], self.crc.clone().finalize());
        LittleEndian::write_u32(&mut trailer[4..8], self.size);
        out.extend_from_slice(&trailer);
        Ok(())
    }
}

impl Reset for GzipCompressor {
    fn reset(&mut self) -> io::Result<()> {
        self.raw.reset();
        self.crc.reset();
        self.size = 0;
        self.header_written = false;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Decompressor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Member {
    Header,
    Body,
    Trailer,
}

pub struct GzipDecompressor {
    raw: Decompress,
    crc: Hasher,
    size: u32,
    state: Member,
    /// Bytes received but not yet consumed (partial header/trailer).
    pending: Vec<u8>,
}

impl GzipDecompressor {
    pub fn new() -> Self {
        Self {
            raw: Decompress::new(false),
            crc: Hasher::new(),
            size: 0,
            state: Member::Header,
            pending: Vec::new(),
        }
    }

    fn start_member(&mut self) {
        self.raw.reset(false);
        self.crc.reset();
        self.size = 0;
        self.state = Member::Header;
    }

    fn check_trailer(&self, trailer: &[u8]) -> Result<(), CodecError> {
        let expected_crc = LittleEndian::read_u32(&trailer[0..4]);
        let expected_size = LittleEndian::read_u32(&trailer[4..8]);
        let actual_crc = self.crc.clone().finalize();
        if expected_crc != actual_crc {
            return Err(CodecError::process(
                NAME,
                format!("crc mismatch: expected {:08x}, got {:08x}", expected_crc, actual_crc),
            ));
        }
        if expected_size != self.size {
            return Err(CodecError::process(
                NAME,
                format!("size mismatch: expected {}, got {}", expected_size, self.size),
            ));
        }
        Ok(())
    }
}

impl Default for GzipDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for GzipDecompressor {
    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError> {
        self.pending.extend_from_slice(input);
        let mut pos = 0;

        loop {
            match self.state {
                Member::Header => match parse_header(&self.pending[pos..])? {
                    Some(len) => {
                        pos += len;
                        self.state = Member::Body;
                    }
                    None => break,
                },
                Member::Body => {
                    if pos == self.pending.len() {
                        break;
                    }
                    let (consumed, ended) = inflate(
                        &mut self.raw,
                        &mut self.crc,
                        &mut self.size,
                        &self.pending[pos..],
                        out,
                    )?;
                    pos += consumed;
                    if ended {
                        self.state = Member::Trailer;
                    }
                }
                Member::Trailer => {
                    if self.pending.len() - pos < TRAILER_LEN {
                        break;
                    }
                    self.check_trailer(&self.pending[pos..pos + TRAILER_LEN])?;
                    pos += TRAILER_LEN;
                    self.start_member();
                }
            }
        }

        self.pending.drain(..pos);
        Ok(())
    }

    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<(), CodecError> {
        match self.state {
            Member::Header if self.pending.is_empty() => Ok(()),
            Member::Header => Err(CodecError::process(NAME, "truncated gzip header")),
            Member::Body | Member::Trailer => Err(CodecError::process(NAME, "unexpected end of gzip stream")),
        }
    }
}

impl Reset for GzipDecompressor {
    fn reset(&mut self) -> io::Result<()> {
        self.start_member();
        self.pending.clear();
        Ok(())
    }
}

/// Inflate as much of `input` as possible. Returns bytes consumed and whether
/// the deflate stream ended.
fn inflate(
    raw: &mut Decompress,
    crc: &mut Hasher,
    size: &mut u32,
    input: &[u8],
    out: &mut Vec<u8>,
) -> Result<(usize, bool), CodecError> {
    let mut consumed = 0;
    loop {
        out.reserve(SCRATCH_SIZE);
        let start = out.len();
        let spare = out.capacity() - start;
        let before = raw.total_in();

        let status = raw
            .decompress_vec(&input[consumed..], out, FlushDecompress::None)
            .map_err(|e| CodecError::process(NAME, e))?;

        let read = (raw.total_in() - before) as usize;
        let produced = out.len() - start;
        consumed += read;
        crc.update(&out[start..]);
        *size = size.wrapping_add(produced as u32);

        if status == Status::StreamEnd {
            return Ok((consumed, true));
        }
        if consumed == input.len() && produced < spare {
            return Ok((consumed, false));
        }
        if read == 0 && produced == 0 {
            return Err(CodecError::process(NAME, "deflate stream made no progress"));
        }
    }
}

/// Length of a complete member header at the start of `buf`, or `None` when
/// more bytes are needed.
fn parse_header(buf: &[u8]) -> Result<Option<usize>, CodecError> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }
    if buf[0..2] != GZIP_MAGIC {
        return Err(CodecError::process(NAME, "invalid gzip magic"));
    }
    if buf[2] != METHOD_DEFLATE {
        return Err(CodecError::process(NAME, format!("unsupported compression method {}", buf[2])));
    }
    let flags = buf[3];
    if flags & FRESERVED != 0 {
        return Err(CodecError::process(NAME, "reserved header flags set"));
    }

    let mut pos = HEADER_LEN;
    if flags & FEXTRA != 0 {
        if buf.len() < pos + 2 {
            return Ok(None);
        }
        pos += 2 + LittleEndian::read_u16(&buf[pos..pos + 2]) as usize;
    }
    for flag in [FNAME, FCOMMENT] {
        if flags & flag != 0 {
            match buf.get(pos..).and_then(|rest| rest.iter().position(|&b| b == 0)) {
                Some(nul) => pos += nul + 1,
                None => return Ok(None),
            }
        }
    }
    if flags & FHCRC != 0 {
        // CRC16 is the low half of the CRC-32 over every header byte before it.
        let Some(stored) = buf.get(pos..pos + 2) else {
            return Ok(None);
        };
        let mut crc = Hasher::new();
        crc.update(&buf[..pos]);
        if crc.finalize() as u16 != LittleEndian::read_u16(stored) {
            return Err(CodecError::process(NAME, "gzip header checksum mismatch"));
        }
        pos += 2;
    }

    if pos > buf.len() {
        return Ok(None);
    }
    Ok(Some(pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_header_is_ten_bytes() {
        let header = [0x1f, 0x8b, 8, 0, 0, 0, 0, 0, 0, 0xff];
        assert_eq!(parse_header(&header).unwrap(), Some(10));
    }

    #[test]
    fn partial_header_needs_more() {
        assert_eq!(parse_header(&[0x1f, 0x8b, 8]).unwrap(), None);
    }

    #[test]
    fn optional_fields_are_skipped() {
        let mut header = vec![0x1f, 0x8b, 8, FEXTRA | FNAME | FCOMMENT | FHCRC, 0, 0, 0, 0, 0, 3];
        header.extend_from_slice(&[2, 0, 0xaa, 0xbb]); // extra
        header.extend_from_slice(b"batch.bin\0");
        header.extend_from_slice(b"comment\0");
        let crc16 = crc32fast::hash(&header) as u16;
        header.extend_from_slice(&crc16.to_le_bytes());
        assert_eq!(parse_header(&header).unwrap(), Some(header.len()));
        assert_eq!(parse_header(&header[..header.len() - 1]).unwrap(), None);
        assert_eq!(parse_header(&header[..header.len() - 3]).unwrap(), None);
    }

    #[test]
    fn header_checksum_mismatch_is_rejected() {
        let mut header = vec![0x1f, 0x8b, 8, FNAME | FHCRC, 0, 0, 0, 0, 0, 3];
        header.extend_from_slice(b"batch.bin\0");
        let crc16 = crc32fast::hash(&header) as u16 ^ 0x0101;
        header.extend_from_slice(&crc16.to_le_bytes());
        assert!(matches!(
            parse_header(&header),
            Err(CodecError::CodecProcessFailed { codec: "gzip", .. })
        ));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let header = [0x1f, 0x8c, 8, 0, 0, 0, 0, 0, 0, 0xff];
        assert!(parse_header(&header).is_err());
    }

    #[test]
    fn trailer_mismatch_is_detected() {
        let mut compressor = GzipCompressor::new(DEFAULT_LEVEL_GZIP);
        let mut wire = Vec::new();
        compressor.compress_chunk(b"payload", &mut wire).unwrap();
        compressor.finish(&mut wire).unwrap();
        let last = wire.len() - 1;
        wire[last] ^= 0xff; // corrupt ISIZE

        let mut decompressor = GzipDecompressor::new();
        let mut out = Vec::new();
        assert!(decompressor.decompress_chunk(&wire, &mut out).is_err());
    }

    #[test]
    fn byte_at_a_time_input_decodes() {
        let mut compressor = GzipCompressor::new(DEFAULT_LEVEL_GZIP);
        let mut wire = Vec::new();
        compressor.compress_chunk(b"one byte at a time", &mut wire).unwrap();
        compressor.finish(&mut wire).unwrap();

        let mut decompressor = GzipDecompressor::new();
        let mut out = Vec::new();
        for b in &wire {
            decompressor.decompress_chunk(std::slice::from_ref(b), &mut out).unwrap();
        }
        decompressor.finish(&mut out).unwrap();
        assert_eq!(out, b"one byte at a time");
    }
}
