//! compression/stream.rs
//! Pooled reader/writer wrappers shared by every codec.
//!
//! Summary: a wrapper owns the caller's sink/source and borrows an engine
//! from the codec's pool for its lifetime. Closing detaches the sink/source
//! and hands the engine back; closing twice is a no-op.
//!
//! A codec error ends the stream: every later read or write replays it, and a
//! writer that failed refuses to close cleanly.
use std::io::{self, Read, Write};
use std::sync::Arc;

use tracing::warn;

use crate::compression::constants::{MAX_RETAINED_BUFFER, READ_BUFFER_SIZE};
use crate::compression::pool::StreamPool;
use crate::compression::types::{CodecError, Compressor, Decompressor, ReadClose, Reset, WriteClose};
use crate::telemetry::PoolSnapshot;

/// A codec engine plus the buffers it streams through.
pub struct Engine<E> {
    codec: E,
    input: Vec<u8>,
    output: Vec<u8>,
}

impl<E> Engine<E> {
    pub fn new(codec: E) -> Self {
        Self { codec, input: Vec::new(), output: Vec::new() }
    }
}

impl<E: Reset> Reset for Engine<E> {
    fn reset(&mut self) -> io::Result<()> {
        self.input.clear();
        self.output.clear();
        self.input.shrink_to(MAX_RETAINED_BUFFER);
        self.output.shrink_to(MAX_RETAINED_BUFFER);
        self.codec.reset()
    }
}

/// The error that ended a stream, replayed to every later call.
#[derive(Debug, Clone)]
struct Failure {
    kind: io::ErrorKind,
    message: String,
}

impl Failure {
    fn record(err: &io::Error) -> Self {
        Self { kind: err.kind(), message: err.to_string() }
    }

    fn replay(&self) -> io::Error {
        io::Error::new(self.kind, self.message.clone())
    }
}

/// The reader and writer pools backing one codec instance.
pub struct StreamPools<C, D> {
    writers: Arc<StreamPool<Engine<C>>>,
    readers: Arc<StreamPool<Engine<D>>>,
}

impl<C, D> StreamPools<C, D>
where
    C: Compressor + 'static,
    D: Decompressor + 'static,
{
    pub fn new<FC, FD>(codec: &'static str, compressor: FC, decompressor: FD) -> Self
    where
        FC: Fn() -> io::Result<C> + Send + Sync + 'static,
        FD: Fn() -> io::Result<D> + Send + Sync + 'static,
    {
        Self {
            writers: StreamPool::new(codec, move || compressor().map(Engine::new)),
            readers: StreamPool::new(codec, move || decompressor().map(Engine::new)),
        }
    }

    /// Acquire a pooled compressor writing into `sink`.
    pub fn writer<W: Write>(&self, sink: W) -> Result<PooledWriter<C, W>, CodecError> {
        let engine = self.writers.acquire()?;
        Ok(PooledWriter {
            pool: Arc::clone(&self.writers),
            engine: Some(engine),
            sink: Some(sink),
            failure: None,
        })
    }

    /// Acquire a pooled decompressor reading from `source`.
    pub fn reader<R: Read>(&self, source: R) -> Result<PooledReader<D, R>, CodecError> {
        let engine = self.readers.acquire()?;
        Ok(PooledReader {
            pool: Arc::clone(&self.readers),
            engine: Some(engine),
            source: Some(source),
            pos: 0,
            eof: false,
            failure: None,
        })
    }

    /// Run a one-shot operation on a pooled compressor.
    pub fn with_compressor<T, F>(&self, f: F) -> Result<T, CodecError>
    where
        F: FnOnce(&mut C) -> Result<T, CodecError>,
    {
        let mut engine = self.writers.acquire()?;
        let result = f(&mut engine.codec);
        self.writers.release(engine);
        result
    }

    /// Run a one-shot operation on a pooled decompressor.
    pub fn with_decompressor<T, F>(&self, f: F) -> Result<T, CodecError>
    where
        F: FnOnce(&mut D) -> Result<T, CodecError>,
    {
        let mut engine = self.readers.acquire()?;
        let result = f(&mut engine.codec);
        self.readers.release(engine);
        result
    }

    pub fn writer_stats(&self) -> PoolSnapshot {
        self.writers.stats()
    }

    pub fn reader_stats(&self) -> PoolSnapshot {
        self.readers.stats()
    }
}

impl<C, D> std::fmt::Debug for StreamPools<C, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamPools")
            .field("writers", &self.writers)
            .field("readers", &self.readers)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

pub struct PooledWriter<C: Compressor, W: Write> {
    pool: Arc<StreamPool<Engine<C>>>,
    engine: Option<Engine<C>>,
    sink: Option<W>,
    /// Set by a failed write; the bytes on the sink no longer form a stream.
    failure: Option<Failure>,
}

impl<C: Compressor, W: Write> PooledWriter<C, W> {
    pub fn get_ref(&self) -> Option<&W> {
        self.sink.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.engine.is_none()
    }

    /// Close the stream and hand back the sink.
    pub fn finish(mut self) -> Result<W, CodecError> {
        self.finish_stream()?.ok_or(CodecError::Closed)
    }

    fn finish_stream(&mut self) -> Result<Option<W>, CodecError> {
        let Some(mut engine) = self.engine.take() else {
            return Ok(None);
        };
        let mut sink = self.sink.take();

        let result = match (self.failure.take(), sink.as_mut()) {
            (Some(failure), _) => Err(CodecError::from(failure.replay())),
            (None, Some(sink)) => flush_final(&mut engine, sink),
            (None, None) => Ok(()),
        };
        // Sink is already detached; release resets whatever the failed flush left behind.
        self.pool.release(engine);

        match result {
            Ok(()) => Ok(sink),
            Err(err) => Err(CodecError::Flush {
                codec: self.pool.name(),
                source: Box::new(err),
            }),
        }
    }
}

fn flush_final<C: Compressor, W: Write>(engine: &mut Engine<C>, sink: &mut W) -> Result<(), CodecError> {
    engine.codec.finish(&mut engine.output)?;
    let written = sink.write_all(&engine.output);
    engine.output.clear();
    written?;
    sink.flush()?;
    Ok(())
}

fn write_chunk<C: Compressor, W: Write>(engine: &mut Engine<C>, sink: &mut W, buf: &[u8]) -> io::Result<()> {
    engine.codec.compress_chunk(buf, &mut engine.output)?;
    if !engine.output.is_empty() {
        let written = sink.write_all(&engine.output);
        engine.output.clear();
        written?;
    }
    Ok(())
}

impl<C: Compressor, W: Write> Write for PooledWriter<C, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (Some(engine), Some(sink)) = (self.engine.as_mut(), self.sink.as_mut()) else {
            return Err(CodecError::Closed.into());
        };
        if let Some(failure) = &self.failure {
            return Err(failure.replay());
        }

        if let Err(err) = write_chunk(engine, sink, buf) {
            self.failure = Some(Failure::record(&err));
            return Err(err);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }
}

impl<C: Compressor, W: Write + Send> WriteClose for PooledWriter<C, W> {
    fn close(&mut self) -> Result<(), CodecError> {
        self.finish_stream().map(|_| ())
    }
}

impl<C: Compressor, W: Write> Drop for PooledWriter<C, W> {
    fn drop(&mut self) {
        if self.engine.is_some() {
            if let Err(err) = self.finish_stream() {
                warn!(codec = self.pool.name(), error = %err, "dropping unclosed writer failed to flush");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

pub struct PooledReader<D: Decompressor, R: Read> {
    pool: Arc<StreamPool<Engine<D>>>,
    engine: Option<Engine<D>>,
    source: Option<R>,
    /// Read cursor into the engine's decompressed output.
    pos: usize,
    /// The source hit EOF and the decoder has been finished.
    eof: bool,
    failure: Option<Failure>,
}

impl<D: Decompressor, R: Read> PooledReader<D, R> {
    pub fn get_ref(&self) -> Option<&R> {
        self.source.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.engine.is_none()
    }

    /// Finish a stream whose source is exhausted but whose end the caller
    /// never read, so trailer checks still run. A source with bytes left was
    /// abandoned and is not checked.
    fn settle(&mut self) -> Result<(), CodecError> {
        if self.eof || self.failure.is_some() {
            return Ok(());
        }
        let (Some(engine), Some(source)) = (self.engine.as_mut(), self.source.as_mut()) else {
            return Ok(());
        };

        if engine.input.len() != READ_BUFFER_SIZE {
            engine.input.resize(READ_BUFFER_SIZE, 0);
        }
        let n = loop {
            match source.read(&mut engine.input) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        };
        if n > 0 {
            return Ok(());
        }

        let result = engine.codec.finish(&mut engine.output);
        self.eof = true;
        result
    }

    fn release(&mut self) {
        self.source = None;
        self.pos = 0;
        self.failure = None;
        if let Some(engine) = self.engine.take() {
            self.pool.release(engine);
        }
    }
}

impl<D: Decompressor, R: Read> Read for PooledReader<D, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let (Some(engine), Some(source)) = (self.engine.as_mut(), self.source.as_mut()) else {
            return Err(CodecError::Closed.into());
        };
        if let Some(failure) = &self.failure {
            return Err(failure.replay());
        }

        loop {
            if self.pos < engine.output.len() {
                let n = buf.len().min(engine.output.len() - self.pos);
                buf[..n].copy_from_slice(&engine.output[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }

            engine.output.clear();
            self.pos = 0;
            if self.eof {
                return Ok(0);
            }

            if engine.input.len() != READ_BUFFER_SIZE {
                engine.input.resize(READ_BUFFER_SIZE, 0);
            }
            let n = match source.read(&mut engine.input) {
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };

            let step = if n == 0 {
                self.eof = true;
                engine.codec.finish(&mut engine.output)
            } else {
                engine.codec.decompress_chunk(&engine.input[..n], &mut engine.output)
            };
            if let Err(err) = step {
                engine.output.clear();
                let err = io::Error::from(err);
                self.failure = Some(Failure::record(&err));
                return Err(err);
            }
        }
    }
}

impl<D: Decompressor, R: Read + Send> ReadClose for PooledReader<D, R> {
    fn close(&mut self) -> Result<(), CodecError> {
        let result = self.settle();
        self.release();
        result
    }
}

impl<D: Decompressor, R: Read> Drop for PooledReader<D, R> {
    fn drop(&mut self) {
        self.release();
    }
}
