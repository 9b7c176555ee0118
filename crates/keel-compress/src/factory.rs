//! Compressor factory
//!
//! One factory per validated configuration. The factory freezes its
//! parameters, binds at most one precompiled dictionary shared by all of
//! its streams, acquires the accelerator device when acceleration is
//! enabled, and manufactures one engine per logical stream.

use std::sync::Arc;

use tracing::debug;

use keel_accel::{AccelBackend, AccelDevice, SessionPool};

use crate::config::{CompressorConfig, Strategy};
use crate::dictionary::DictionaryManager;
use crate::engine::{StreamCompressor, ThreadAccel};
use crate::{Error, Result};

/// Immutable parameters frozen from a validated configuration
#[derive(Debug, Clone)]
pub(crate) struct Params {
    pub(crate) compression_level: i32,
    pub(crate) enable_checksum: bool,
    pub(crate) strategy: Strategy,
    pub(crate) chunk_size: usize,
    pub(crate) fallback_threshold: usize,
}

/// Manufactures one [`StreamCompressor`] per logical stream
pub struct CompressorFactory {
    params: Params,
    dictionary: Option<Arc<DictionaryManager>>,
    accel: Option<SessionPool>,
}

impl CompressorFactory {
    /// Validate `config` and freeze it. `backend` must be provided when
    /// `config.enable_acceleration` is set; the device is started on first
    /// demand and shared with any other factory in the process.
    ///
    /// # Errors
    /// Returns a configuration-time error for invalid parameters, an
    /// unbindable dictionary, or an accelerator device that cannot start.
    pub fn new(config: CompressorConfig, backend: Option<Arc<dyn AccelBackend>>) -> Result<Self> {
        config.validate()?;

        let dictionary = match &config.dictionary {
            Some(bytes) => Some(Arc::new(DictionaryManager::precompile(
                bytes,
                config.compression_level,
            )?)),
            None => None,
        };

        let accel = if config.enable_acceleration {
            let backend = backend.ok_or(Error::AccelerationUnavailable)?;
            let device = AccelDevice::acquire(backend)?;
            Some(SessionPool::new(device))
        } else {
            None
        };

        debug!(
            "new compressor factory, level: {}, checksum: {}, chunk_size: {}, acceleration: {}, dictionary: {}",
            config.compression_level,
            config.enable_checksum,
            config.chunk_size,
            accel.is_some(),
            dictionary.is_some(),
        );

        Ok(Self {
            params: Params {
                compression_level: config.compression_level,
                enable_checksum: config.enable_checksum,
                strategy: config.strategy,
                chunk_size: config.chunk_size,
                fallback_threshold: config.fallback_threshold,
            },
            dictionary,
            accel,
        })
    }

    /// Create one new engine. Resolves the calling thread's accelerator
    /// session when acceleration is enabled; has no other side effects and
    /// may be called concurrently from different threads.
    ///
    /// # Errors
    /// Returns a codec error when the compression context cannot be
    /// configured.
    pub fn create_compressor(&self) -> Result<StreamCompressor> {
        let accel = self.accel.as_ref().map(|pool| ThreadAccel {
            session: pool.thread_session(),
            device: Arc::clone(pool.device()),
        });
        StreamCompressor::new(&self.params, self.dictionary.clone(), accel)
    }

    /// Content encoding produced by this factory's streams
    #[must_use]
    pub fn content_encoding(&self) -> &'static str {
        "zstd"
    }
}
