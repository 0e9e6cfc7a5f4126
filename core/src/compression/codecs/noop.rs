//! codecs/noop.rs
//! Identity codec: the baseline for benchmarks and a fixture for tests.
//! Never registered by default.
use std::io::{self, Read, Write};

use crate::compression::constants::codec_ids;
use crate::compression::types::{Codec, CodecError, ReadClose, WriteClose};

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCodec;

impl NoopCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for NoopCodec {
    fn code(&self) -> i8 {
        codec_ids::NONE
    }

    fn name(&self) -> &'static str {
        "none"
    }

    fn new_reader<'a>(&self, source: Box<dyn Read + Send + 'a>) -> Result<Box<dyn ReadClose + 'a>, CodecError> {
        Ok(Box::new(NopReader::new(source)))
    }

    fn new_writer<'a>(&self, sink: Box<dyn Write + Send + 'a>) -> Result<Box<dyn WriteClose + 'a>, CodecError> {
        Ok(Box::new(NopWriter::new(sink)))
    }

    fn encode(&self, src: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(src.to_vec())
    }

    fn decode(&self, src: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(src.to_vec())
    }
}

/// Source passed through unchanged.
pub struct NopReader<R> {
    inner: R,
}

impl<R> NopReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for NopReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Send> ReadClose for NopReader<R> {
    fn close(&mut self) -> Result<(), CodecError> {
        Ok(())
    }
}

/// Sink passed through unchanged.
pub struct NopWriter<W> {
    inner: W,
}

impl<W> NopWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for NopWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write + Send> WriteClose for NopWriter<W> {
    fn close(&mut self) -> Result<(), CodecError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_passes_bytes_through() {
        let mut sink = Vec::new();
        {
            let mut writer = NoopCodec.new_writer(Box::new(&mut sink)).unwrap();
            writer.write_all(b"as is").unwrap();
            writer.close().unwrap();
            writer.close().unwrap();
        }
        assert_eq!(sink, b"as is");
    }

    #[test]
    fn identity_code_and_name() {
        assert_eq!(NoopCodec.code(), 0);
        assert_eq!(NoopCodec.name(), "none");
        assert_eq!(NoopCodec.decode(b"raw").unwrap(), b"raw");
    }
}
