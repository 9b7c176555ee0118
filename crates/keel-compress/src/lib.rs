//! keel-compress: streaming compression for a proxy data plane
//!
//! Produces standard zstd frames from an unbounded sequence of byte buffers
//! flowing through a filter chain, optionally offloading sequence production
//! (match discovery) to a hardware accelerator with transparent software
//! fallback. Output is decodable by any stock zstd decoder regardless of
//! which path produced it.
//!
//! A [`CompressorFactory`] freezes one validated configuration and
//! manufactures one [`StreamCompressor`] per logical stream. Streams are
//! driven synchronously on their owning thread through the [`Compressor`]
//! capability.

#![warn(missing_docs)]

pub mod buffer;
mod chunk;
pub mod config;
pub mod dictionary;
pub mod engine;
pub mod factory;

pub use buffer::ChainBuffer;
pub use config::{
    CompressorConfig, Strategy, DEFAULT_CHUNK_SIZE, DEFAULT_COMPRESSION_LEVEL,
    DEFAULT_FALLBACK_THRESHOLD,
};
pub use dictionary::{Dictionary, DictionaryManager};
pub use engine::StreamCompressor;
pub use factory::CompressorFactory;

/// Compression error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The one-step codec primitive reported failure; the stream's context
    /// can no longer be trusted to emit a valid frame
    #[error("codec failure during {op}: {source}")]
    Codec {
        /// Operation that failed
        op: &'static str,
        /// Underlying codec error
        #[source]
        source: std::io::Error,
    },

    /// Compression level outside the codec's accepted range
    #[error("invalid compression level: {0}")]
    InvalidLevel(i32),

    /// Scratch buffer size the codec cannot work with
    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    /// Dictionary bytes could not be bound
    #[error("invalid dictionary: {0}")]
    Dictionary(String),

    /// Acceleration requested without an accelerator backend
    #[error("acceleration enabled but no backend was provided")]
    AccelerationUnavailable,

    /// Accelerator device or session error
    #[error(transparent)]
    Accel(#[from] keel_accel::Error),
}

impl Error {
    /// Check if this error is unrecoverable for its stream. Continuing a
    /// stream after a fatal error risks emitting a corrupt frame to a
    /// downstream consumer that trusts frame integrity; hosts are expected
    /// to treat it as such.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Codec { .. } => true,
            Error::Accel(err) => err.is_fatal(),
            _ => false,
        }
    }
}

/// Result type for compression operations
pub type Result<T> = std::result::Result<T, Error>;

/// Position of one `compress` call within a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// More input will follow
    Continue,
    /// Emit what has been consumed so far without closing the frame
    Flush,
    /// Close the frame; the stream accepts no further calls
    Finish,
}

/// Streaming compressor capability
///
/// A stream receives a sequence of `compress` calls forming one logically
/// continuous byte stream, terminated by exactly one [`State::Finish`] call.
/// Consumed input is drained from `buffer` and replaced with compressed
/// output.
pub trait Compressor {
    /// Compress the contents of `buffer` in place
    ///
    /// # Errors
    /// Returns a fatal error when the codec or accelerator session fails;
    /// see [`Error::is_fatal`].
    fn compress(&mut self, buffer: &mut ChainBuffer, state: State) -> Result<()>;
}
