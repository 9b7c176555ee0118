//! Per-thread accelerator sessions
//!
//! Session setup is expensive and some worker threads never compress, so a
//! session's accelerator-side state is allocated on first actual use, not
//! when the thread's slot is resolved. Sessions live in a thread-local
//! registry and are torn down when the owning thread exits.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::backend::SequenceProducer;
use crate::device::AccelDevice;
use crate::error::Result;

enum SessionState {
    Uninitialized,
    Ready(Box<dyn SequenceProducer>),
}

/// Accelerator session owned by exactly one worker thread.
///
/// Producer state is created at most once per thread. Dropping the session
/// releases the accelerator-side state; the device itself is stopped by the
/// last holder of its handle, never by a session.
pub struct AccelSession {
    state: SessionState,
}

impl AccelSession {
    fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
        }
    }

    /// Check whether accelerator-side state has been allocated
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    /// Resolve the session's producer, allocating accelerator-side state on
    /// first use.
    ///
    /// # Errors
    /// Returns [`crate::Error::SessionStart`] when state allocation fails;
    /// the caller must treat this as fatal for accelerated operation.
    pub fn producer(&mut self, device: &AccelDevice) -> Result<&mut dyn SequenceProducer> {
        if let SessionState::Uninitialized = self.state {
            let producer = device.create_producer()?;
            debug!("accelerator session initialized");
            self.state = SessionState::Ready(producer);
        }
        match &mut self.state {
            SessionState::Ready(producer) => Ok(producer.as_mut()),
            SessionState::Uninitialized => unreachable!("session initialized above"),
        }
    }
}

impl Drop for AccelSession {
    fn drop(&mut self) {
        if self.is_initialized() {
            debug!("accelerator session released");
        }
    }
}

thread_local! {
    static SESSIONS: RefCell<HashMap<u64, Rc<RefCell<AccelSession>>>> =
        RefCell::new(HashMap::new());
}

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(0);

/// Resolves one [`AccelSession`] per worker thread.
///
/// The pool is owned by a factory and shared across its threads; the session
/// a thread resolves is never visible to any other thread.
pub struct SessionPool {
    device: Arc<AccelDevice>,
    id: u64,
}

impl SessionPool {
    /// Create a pool backed by the started device
    #[must_use]
    pub fn new(device: Arc<AccelDevice>) -> Self {
        Self {
            device,
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Get the device backing this pool
    #[must_use]
    pub fn device(&self) -> &Arc<AccelDevice> {
        &self.device
    }

    /// Resolve the calling thread's session, creating an uninitialized slot
    /// on first resolution.
    #[must_use]
    pub fn thread_session(&self) -> Rc<RefCell<AccelSession>> {
        SESSIONS.with(|sessions| {
            sessions
                .borrow_mut()
                .entry(self.id)
                .or_insert_with(|| Rc::new(RefCell::new(AccelSession::new())))
                .clone()
        })
    }
}
