//! Accelerator backend abstraction
//!
//! Defines the interface an accelerator must implement to offload sequence
//! production: one-time device startup/shutdown and per-session match
//! discovery over independent input windows.

use crate::error::Result;

/// One match discovered by a sequence producer: `literal_len` literal bytes
/// followed by `match_len` bytes repeated from `offset` bytes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence {
    /// Backward distance to the match source
    pub offset: u32,
    /// Length of the repeated region
    pub match_len: u32,
    /// Literal bytes preceding the match
    pub literal_len: u32,
}

/// Accelerator-side match discovery state for one session.
///
/// Windows are independent: a failed `produce` call leaves the producer
/// reusable for the next window.
pub trait SequenceProducer: Send {
    /// Run match discovery over one input window, appending results to
    /// `sequences`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Produce`] when the accelerator cannot process
    /// the window; callers degrade that window to software match finding.
    fn produce(&mut self, window: &[u8], sequences: &mut Vec<Sequence>) -> Result<()>;
}

/// Abstract accelerator backend
///
/// Device startup and shutdown happen at most once per process, during
/// configuration load and teardown. Producer state is allocated per session.
pub trait AccelBackend: Send + Sync {
    /// Get device name
    fn device_name(&self) -> &str;

    /// Bring up the physical device
    ///
    /// # Errors
    /// Returns [`crate::Error::DeviceStart`] when the device cannot be
    /// started; this is a configuration-time failure.
    fn start_device(&self) -> Result<()>;

    /// Release the physical device
    fn stop_device(&self);

    /// Allocate accelerator-side sequence-producer state for one session
    ///
    /// # Errors
    /// Returns [`crate::Error::SessionStart`] when no session state can be
    /// allocated.
    fn create_producer(&self) -> Result<Box<dyn SequenceProducer>>;
}
