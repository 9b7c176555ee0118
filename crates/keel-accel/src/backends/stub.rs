//! Stub accelerator backend for testing
//!
//! Simulates an accelerator on the host CPU. Start and produce failures can
//! be injected, and lifecycle transitions are counted, so device, session,
//! and fallback behavior can be exercised without hardware.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::backend::{AccelBackend, Sequence, SequenceProducer};
use crate::error::{Error, Result};

const MIN_MATCH: usize = 4;

#[derive(Debug, Default)]
struct Shared {
    device_starts: AtomicUsize,
    device_stops: AtomicUsize,
    sessions_created: AtomicUsize,
    produce_calls: AtomicUsize,
    fail_produce: AtomicBool,
}

/// Stub accelerator backend
///
/// Counters are shared with every producer the backend creates, so tests can
/// observe how often the "hardware" was actually consulted.
#[derive(Debug)]
pub struct StubBackend {
    shared: Arc<Shared>,
    fail_start: bool,
}

impl StubBackend {
    /// Create a new stub backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            fail_start: false,
        }
    }

    /// Create a stub backend whose device refuses to start
    #[must_use]
    pub fn failing_on_start() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            fail_start: true,
        }
    }

    /// Inject or clear a produce failure for every session of this backend
    pub fn set_produce_failure(&self, fail: bool) {
        self.shared.fail_produce.store(fail, Ordering::Relaxed);
    }

    /// Number of times the device was started
    #[must_use]
    pub fn device_starts(&self) -> usize {
        self.shared.device_starts.load(Ordering::Relaxed)
    }

    /// Number of times the device was stopped
    #[must_use]
    pub fn device_stops(&self) -> usize {
        self.shared.device_stops.load(Ordering::Relaxed)
    }

    /// Number of producer sessions created
    #[must_use]
    pub fn sessions_created(&self) -> usize {
        self.shared.sessions_created.load(Ordering::Relaxed)
    }

    /// Number of windows handed to producers
    #[must_use]
    pub fn produce_calls(&self) -> usize {
        self.shared.produce_calls.load(Ordering::Relaxed)
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AccelBackend for StubBackend {
    fn device_name(&self) -> &str {
        "stub-accel"
    }

    fn start_device(&self) -> Result<()> {
        if self.fail_start {
            return Err(Error::device_start(self.device_name(), "injected start failure"));
        }
        self.shared.device_starts.fetch_add(1, Ordering::Relaxed);
        debug!("stub accelerator device started");
        Ok(())
    }

    fn stop_device(&self) {
        self.shared.device_stops.fetch_add(1, Ordering::Relaxed);
        debug!("stub accelerator device stopped");
    }

    fn create_producer(&self) -> Result<Box<dyn SequenceProducer>> {
        self.shared.sessions_created.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(StubProducer {
            shared: Arc::clone(&self.shared),
        }))
    }
}

/// Producer created by [`StubBackend`]
///
/// Runs a byte-run scan in place of real match discovery.
struct StubProducer {
    shared: Arc<Shared>,
}

impl SequenceProducer for StubProducer {
    fn produce(&mut self, window: &[u8], sequences: &mut Vec<Sequence>) -> Result<()> {
        self.shared.produce_calls.fetch_add(1, Ordering::Relaxed);
        if self.shared.fail_produce.load(Ordering::Relaxed) {
            return Err(Error::Produce("injected produce failure".into()));
        }

        let mut i = 0;
        while i + MIN_MATCH <= window.len() {
            let byte = window[i];
            let run = window[i..].iter().take_while(|&&b| b == byte).count();
            if run >= MIN_MATCH {
                sequences.push(Sequence {
                    offset: 1,
                    match_len: (run - 1) as u32,
                    literal_len: 1,
                });
                i += run;
            } else {
                i += 1;
            }
        }
        Ok(())
    }
}
