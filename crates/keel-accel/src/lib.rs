//! Hardware acceleration primitives for keel's streaming compressor
//!
//! This crate manages the lifecycle around an accelerator that offloads
//! sequence production, the match-discovery phase of compression:
//! - Process-wide device startup/shutdown tied to a shared-ownership handle
//! - Per-thread sessions with lazily allocated accelerator-side state
//! - The `SequenceProducer` capability consumed by the compressor engine
//! - Pluggable backends, with a host-CPU stub for tests and development
//!
//! # Architecture
//!
//! The device is a process singleton shared by every session; sessions never
//! stop the device themselves. A session belongs to exactly one worker
//! thread and allocates its producer state on first use, since some threads
//! never compress. Producer failures are per-window and recoverable by
//! falling back to software match finding; device and session startup
//! failures are fatal to accelerated operation.

pub mod backend;
pub mod backends;
pub mod device;
pub mod error;
pub mod session;

pub use backend::{AccelBackend, Sequence, SequenceProducer};
#[cfg(feature = "stub")]
pub use backends::StubBackend;
pub use device::AccelDevice;
pub use error::{Error, Result};
pub use session::{AccelSession, SessionPool};

// The device registry is process-wide; tests touching it run one at a time
// and release every handle before unlocking.
#[cfg(all(test, feature = "stub"))]
pub(crate) static DEVICE_TEST_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());
