//! Streaming compressor engine
//!
//! One engine owns one compression context and emits one zstd frame over a
//! sequence of `compress` calls. Input slices are drained front to back
//! through the fixed scratch buffer; the accelerator, when bound, is
//! consulted for sequence production with automatic software fallback, so
//! the emitted frame is standard either way.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;
use zstd::stream::raw::{CParameter, Encoder, InBuffer, Operation};

use keel_accel::{AccelDevice, AccelSession, Sequence};

use crate::buffer::ChainBuffer;
use crate::chunk::ChunkBuffer;
use crate::dictionary::DictionaryManager;
use crate::factory::Params;
use crate::{Compressor, Error, Result, State};

/// The calling thread's accelerator binding for one stream
pub(crate) struct ThreadAccel {
    pub(crate) session: Rc<RefCell<AccelSession>>,
    pub(crate) device: Arc<AccelDevice>,
}

/// Streaming compressor for one logical stream
///
/// Runs synchronously on the thread that created it and is not reentrant.
/// The stream ends with exactly one [`State::Finish`] call; compressing
/// after that is a contract violation and panics.
pub struct StreamCompressor {
    ctx: Encoder<'static>,
    chunk: ChunkBuffer,
    accel: Option<ThreadAccel>,
    fallback_threshold: usize,
    sequences: Vec<Sequence>,
    dictionary: Option<Arc<DictionaryManager>>,
    finished: bool,
}

impl StreamCompressor {
    pub(crate) fn new(
        params: &Params,
        dictionary: Option<Arc<DictionaryManager>>,
        accel: Option<ThreadAccel>,
    ) -> Result<Self> {
        // A bound dictionary fixes its own level; the configured level only
        // applies to dictionary-less streams.
        let mut ctx = match &dictionary {
            Some(manager) => Encoder::with_prepared_dictionary(manager.first_dictionary().prepared())
                .map_err(|err| Error::Dictionary(err.to_string()))?,
            None => Encoder::new(params.compression_level).map_err(codec("create context"))?,
        };
        ctx.set_parameter(CParameter::ChecksumFlag(params.enable_checksum))
            .map_err(codec("set checksum flag"))?;
        if let Some(strategy) = params.strategy.to_codec() {
            ctx.set_parameter(CParameter::Strategy(strategy))
                .map_err(codec("set strategy"))?;
        }

        debug!(
            "new stream compressor, level: {}, strategy: {:?}, chunk_size: {}, acceleration: {}, fallback_threshold: {}",
            params.compression_level,
            params.strategy,
            params.chunk_size,
            accel.is_some(),
            params.fallback_threshold,
        );

        Ok(Self {
            ctx,
            chunk: ChunkBuffer::new(params.chunk_size),
            accel,
            fallback_threshold: params.fallback_threshold,
            sequences: Vec::new(),
            dictionary,
            finished: false,
        })
    }

    /// Dictionary identifier every frame from this stream references, 0
    /// when no dictionary is bound
    #[must_use]
    pub fn dictionary_id(&self) -> u32 {
        self.dictionary
            .as_ref()
            .map(|manager| manager.first_dictionary().id())
            .unwrap_or(0)
    }

    fn compress_buffer(&mut self, buffer: &mut ChainBuffer, state: State) -> Result<()> {
        assert!(!self.finished, "compress called after Finish on this stream");
        debug!("compress input size {}, state {:?}", buffer.len(), state);

        // Small flushes skip the accelerator for this call only: dispatch
        // overhead dominates below the threshold. The decision is not
        // sticky; a later, larger call uses the accelerator again.
        let use_producer = self.accel.is_some()
            && !(state == State::Flush && buffer.len() < self.fallback_threshold);
        if self.accel.is_some() && !use_producer {
            debug!(
                "flush of {} bytes below threshold {}, software sequence production",
                buffer.len(),
                self.fallback_threshold,
            );
        }

        let mut accumulated = ChainBuffer::new();
        while let Some(slice) = buffer.pop_slice() {
            debug!("compress input slice {}", slice.len());
            self.consume_slice(&slice, use_producer, &mut accumulated)?;
        }
        assert!(buffer.is_empty(), "input buffer not fully drained");
        buffer.move_from(&mut accumulated);

        if state == State::Finish {
            self.finish_frame(buffer)?;
            self.finished = true;
        }
        Ok(())
    }

    /// Feed one contiguous slice through the context, draining staged
    /// output after every step so the scratch buffer never overflows.
    fn consume_slice(
        &mut self,
        slice: &[u8],
        use_producer: bool,
        sink: &mut ChainBuffer,
    ) -> Result<()> {
        if slice.is_empty() {
            return Ok(());
        }
        if use_producer {
            self.produce_sequences(slice)?;
        }

        let mut input = InBuffer::around(slice);
        loop {
            let Self { ctx, chunk, .. } = self;
            chunk
                .step(|out| ctx.run(&mut input, out))
                .map_err(codec("compress"))?;
            chunk.drain_into(sink);
            if input.pos == slice.len() {
                return Ok(());
            }
        }
    }

    /// Hand one input window to the thread's accelerator session. A produce
    /// failure degrades this window to the software match finder; the
    /// context has fallback enabled for the life of the stream, so the
    /// stream itself is unaffected.
    fn produce_sequences(&mut self, window: &[u8]) -> Result<()> {
        let Some(accel) = &self.accel else {
            return Ok(());
        };
        let mut session = accel.session.borrow_mut();
        let producer = session.producer(&accel.device)?;
        self.sequences.clear();
        if let Err(err) = producer.produce(window, &mut self.sequences) {
            if !err.should_fallback() {
                return Err(err.into());
            }
            debug!(
                "sequence producer failed on {} byte window, software fallback: {}",
                window.len(),
                err,
            );
        }
        Ok(())
    }

    /// Close the frame: loop the end directive until the codec reports zero
    /// remaining work. Input exhaustion is not frame closure; epilogue
    /// bytes such as the checksum footer may still be pending.
    fn finish_frame(&mut self, sink: &mut ChainBuffer) -> Result<()> {
        debug!("closing frame");
        loop {
            let Self { ctx, chunk, .. } = self;
            let remaining = chunk
                .step(|out| ctx.finish(out, true))
                .map_err(codec("finish"))?;
            chunk.drain_into(sink);
            if remaining == 0 {
                return Ok(());
            }
        }
    }
}

impl Compressor for StreamCompressor {
    fn compress(&mut self, buffer: &mut ChainBuffer, state: State) -> Result<()> {
        self.compress_buffer(buffer, state)
    }
}

impl Drop for StreamCompressor {
    fn drop(&mut self) {
        debug!("stream compressor released");
    }
}

fn codec(op: &'static str) -> impl FnOnce(std::io::Error) -> Error {
    move |source| Error::Codec { op, source }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{CompressorConfig, CompressorFactory};
    use keel_accel::{AccelBackend, StubBackend};

    // Accelerated tests share the process-wide device registry; they run
    // one at a time and drop every handle before unlocking.
    static ACCEL_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn software_factory(config: CompressorConfig) -> CompressorFactory {
        CompressorFactory::new(config, None).unwrap()
    }

    fn accel_factory(fallback_threshold: usize) -> (CompressorFactory, Arc<StubBackend>) {
        let backend = Arc::new(StubBackend::new());
        let config = CompressorConfig {
            enable_acceleration: true,
            fallback_threshold,
            ..Default::default()
        };
        let factory =
            CompressorFactory::new(config, Some(backend.clone() as Arc<dyn AccelBackend>))
                .unwrap();
        (factory, backend)
    }

    fn compress_all(engine: &mut StreamCompressor, chunks: &[&[u8]]) -> Vec<u8> {
        let mut compressed = Vec::new();
        for chunk in chunks {
            let mut buffer = ChainBuffer::from(*chunk);
            engine.compress(&mut buffer, State::Continue).unwrap();
            compressed.extend_from_slice(&buffer.to_vec());
        }
        let mut buffer = ChainBuffer::new();
        engine.compress(&mut buffer, State::Finish).unwrap();
        compressed.extend_from_slice(&buffer.to_vec());
        compressed
    }

    #[test]
    fn test_multi_slice_input_drained_in_order() {
        let factory = software_factory(CompressorConfig::default());
        let mut engine = factory.create_compressor().unwrap();

        let mut buffer = ChainBuffer::new();
        buffer.add(b"first ");
        buffer.add(b"second ");
        buffer.add(b"third");
        engine.compress(&mut buffer, State::Continue).unwrap();

        let mut compressed = buffer.to_vec();
        let mut tail = ChainBuffer::new();
        engine.compress(&mut tail, State::Finish).unwrap();
        compressed.extend_from_slice(&tail.to_vec());

        assert_eq!(
            zstd::stream::decode_all(&compressed[..]).unwrap(),
            b"first second third"
        );
    }

    #[test]
    fn test_checksum_frame_round_trips() {
        let config = CompressorConfig {
            enable_checksum: true,
            ..Default::default()
        };
        let factory = software_factory(config);
        let mut engine = factory.create_compressor().unwrap();

        let payload = b"checksummed payload".repeat(64);
        let compressed = compress_all(&mut engine, &[payload.as_slice()]);
        assert_eq!(zstd::stream::decode_all(&compressed[..]).unwrap(), payload);
    }

    #[test]
    fn test_strategy_hint_round_trips() {
        let config = CompressorConfig {
            strategy: crate::Strategy::Lazy2,
            ..Default::default()
        };
        let factory = software_factory(config);
        let mut engine = factory.create_compressor().unwrap();

        let payload: Vec<u8> = (0..8192u32).map(|i| (i * 31 % 253) as u8).collect();
        let compressed = compress_all(&mut engine, &[payload.as_slice()]);
        assert_eq!(zstd::stream::decode_all(&compressed[..]).unwrap(), payload);
    }

    #[test]
    #[should_panic(expected = "compress called after Finish")]
    fn test_compress_after_finish_panics() {
        let factory = software_factory(CompressorConfig::default());
        let mut engine = factory.create_compressor().unwrap();

        let mut buffer = ChainBuffer::new();
        engine.compress(&mut buffer, State::Finish).unwrap();

        let mut late = ChainBuffer::from(b"late".as_slice());
        let _ = engine.compress(&mut late, State::Continue);
    }

    #[test]
    fn test_flush_threshold_is_per_call() {
        let _guard = ACCEL_TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let (factory, backend) = accel_factory(4000);
        let mut engine = factory.create_compressor().unwrap();
        let mut compressed = Vec::new();

        // One byte short of the threshold: software for this call only.
        let mut buffer = ChainBuffer::from(vec![7u8; 3999]);
        engine.compress(&mut buffer, State::Flush).unwrap();
        assert_eq!(backend.produce_calls(), 0);
        compressed.extend_from_slice(&buffer.to_vec());

        // At the threshold the accelerator is consulted again.
        let mut buffer = ChainBuffer::from(vec![8u8; 4000]);
        engine.compress(&mut buffer, State::Flush).unwrap();
        assert_eq!(backend.produce_calls(), 1);
        compressed.extend_from_slice(&buffer.to_vec());

        let mut buffer = ChainBuffer::new();
        engine.compress(&mut buffer, State::Finish).unwrap();
        compressed.extend_from_slice(&buffer.to_vec());

        let mut expected = vec![7u8; 3999];
        expected.extend_from_slice(&[8u8; 4000]);
        assert_eq!(zstd::stream::decode_all(&compressed[..]).unwrap(), expected);
    }

    #[test]
    fn test_continue_ignores_threshold() {
        let _guard = ACCEL_TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let (factory, backend) = accel_factory(4000);
        let mut engine = factory.create_compressor().unwrap();

        let mut buffer = ChainBuffer::from(b"tiny".as_slice());
        engine.compress(&mut buffer, State::Continue).unwrap();
        assert_eq!(backend.produce_calls(), 1);

        let mut buffer = ChainBuffer::new();
        engine.compress(&mut buffer, State::Finish).unwrap();
    }

    #[test]
    fn test_producer_failure_degrades_to_software() {
        let _guard = ACCEL_TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let (factory, backend) = accel_factory(0);
        backend.set_produce_failure(true);
        let mut engine = factory.create_compressor().unwrap();

        let payload: Vec<u8> = (0..8192u32).map(|i| (i * 17 % 256) as u8).collect();
        let compressed = compress_all(&mut engine, &[payload.as_slice()]);

        assert!(backend.produce_calls() >= 1);
        assert_eq!(zstd::stream::decode_all(&compressed[..]).unwrap(), payload);
    }

    #[test]
    fn test_session_initialized_on_first_use_and_shared() {
        let _guard = ACCEL_TEST_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let (factory, backend) = accel_factory(0);

        let mut first = factory.create_compressor().unwrap();
        let mut second = factory.create_compressor().unwrap();
        assert_eq!(backend.sessions_created(), 0);

        let mut buffer = ChainBuffer::from(b"warm up the session".as_slice());
        first.compress(&mut buffer, State::Continue).unwrap();
        assert_eq!(backend.sessions_created(), 1);

        let mut buffer = ChainBuffer::from(b"same thread, same session".as_slice());
        second.compress(&mut buffer, State::Continue).unwrap();
        assert_eq!(backend.sessions_created(), 1);

        for engine in [&mut first, &mut second] {
            let mut buffer = ChainBuffer::new();
            engine.compress(&mut buffer, State::Finish).unwrap();
        }
    }
}
