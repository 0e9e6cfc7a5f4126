//! compression/types.rs
//! Codec ids, the codec contract, engine traits and the error taxonomy.
use std::fmt;
use std::io::{self, Read, Write};

use num_enum::TryFromPrimitive;
use thiserror::Error;

use crate::compression::constants::codec_ids;
use crate::utils::enum_name_or_hex;

/// Well-known wire codes for built-in codecs.
#[repr(i8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum CompressionCodec {
    None   = codec_ids::NONE,
    Gzip   = codec_ids::GZIP,
    Snappy = codec_ids::SNAPPY,
    Lz4    = codec_ids::LZ4,
    Zstd   = codec_ids::ZSTD,
}

impl CompressionCodec {
    pub fn verify(raw: i8) -> Result<Self, CodecError> {
        Self::try_from_primitive(raw).map_err(|_| CodecError::UnknownCodec { code: raw })
    }

    pub const fn code(self) -> i8 {
        self as i8
    }

    pub const fn name(self) -> &'static str {
        match self {
            CompressionCodec::None => "none",
            CompressionCodec::Gzip => "gzip",
            CompressionCodec::Snappy => "snappy",
            CompressionCodec::Lz4 => "lz4",
            CompressionCodec::Zstd => "zstd",
        }
    }
}

impl std::str::FromStr for CompressionCodec {
    type Err = CodecError;

    /// Parse a configured codec name, ignoring ASCII case.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim();
        [
            CompressionCodec::None,
            CompressionCodec::Gzip,
            CompressionCodec::Snappy,
            CompressionCodec::Lz4,
            CompressionCodec::Zstd,
        ]
        .into_iter()
        .find(|codec| codec.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| CodecError::UnknownCodecName(name.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unknown compression codec: {}", enum_name_or_hex::<CompressionCodec>(*.code))]
    UnknownCodec { code: i8 },

    #[error("unknown compression codec name: {0:?}")]
    UnknownCodecName(String),

    #[error("codec {name} is already registered under code {code}")]
    DuplicateCodec { code: i8, name: &'static str },

    #[error("corrupt xerial frame at offset {offset}: {reason}")]
    CorruptFrame { offset: usize, reason: &'static str },

    #[error(transparent)]
    Io(io::Error),

    #[error("codec {codec} failed to flush on close: {source}")]
    Flush {
        codec: &'static str,
        #[source]
        source: Box<CodecError>,
    },

    #[error("codec {codec} init failed: {msg}")]
    CodecInitFailed { codec: &'static str, msg: String },

    #[error("codec {codec} process failed: {msg}")]
    CodecProcessFailed { codec: &'static str, msg: String },

    #[error("invalid codec configuration: {0}")]
    InvalidConfig(String),

    #[error("stream already closed")]
    Closed,
}

impl CodecError {
    pub(crate) fn process(codec: &'static str, msg: impl fmt::Display) -> Self {
        CodecError::CodecProcessFailed { codec, msg: msg.to_string() }
    }

    pub(crate) fn init(codec: &'static str, msg: impl fmt::Display) -> Self {
        CodecError::CodecInitFailed { codec, msg: msg.to_string() }
    }
}

// Codec errors travel through `Read`/`Write` as the inner error of an
// `io::Error` and are unwrapped again on the way back out.
impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> Self {
        let wraps_codec_error = err
            .get_ref()
            .map_or(false, |inner| inner.is::<CodecError>());
        if !wraps_codec_error {
            return CodecError::Io(err);
        }

        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<CodecError>()) {
            Some(Ok(codec_err)) => *codec_err,
            _ => CodecError::Io(io::Error::from(kind)),
        }
    }
}

impl From<CodecError> for io::Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(inner) => inner,
            CodecError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Return an engine to a virgin state so the pool can hand it out again.
pub trait Reset {
    fn reset(&mut self) -> io::Result<()>;
}

// Require Send so engines can move between threads through the pool.
pub trait Compressor: Reset + Send {
    /// Compress `input`, appending whatever compressed bytes are ready to `out`.
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError>;
    /// Flush pending state and terminate the stream.
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CodecError>;
}

pub trait Decompressor: Reset + Send {
    /// Consume all of `input`, appending decompressed bytes that are ready to `out`.
    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError>;
    /// Called once the source is exhausted; rejects truncated streams.
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CodecError>;
}

/// Decompressing reader handed out by a codec.
pub trait ReadClose: Read + Send {
    /// Detach the source and return pooled state. Idempotent.
    fn close(&mut self) -> Result<(), CodecError>;
}

/// Compressing writer handed out by a codec.
pub trait WriteClose: Write + Send {
    /// Flush the compressed stream, detach the sink and return pooled state. Idempotent.
    fn close(&mut self) -> Result<(), CodecError>;
}

/// The unit contract every codec satisfies.
pub trait Codec: Send + Sync + fmt::Debug {
    /// Wire identifier written alongside compressed payloads.
    fn code(&self) -> i8;

    /// Diagnostic label.
    fn name(&self) -> &'static str;

    fn new_reader<'a>(
        &self,
        source: Box<dyn Read + Send + 'a>,
    ) -> Result<Box<dyn ReadClose + 'a>, CodecError>;

    fn new_writer<'a>(
        &self,
        sink: Box<dyn Write + Send + 'a>,
    ) -> Result<Box<dyn WriteClose + 'a>, CodecError>;

    /// One-shot compression through a pooled writer.
    fn encode(&self, src: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        {
            let mut writer = self.new_writer(Box::new(&mut out))?;
            writer.write_all(src)?;
            writer.close()?;
        }
        Ok(out)
    }

    /// One-shot decompression through a pooled reader.
    fn decode(&self, src: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut reader = self.new_reader(Box::new(src))?;
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        reader.close()?;
        Ok(out)
    }
}
