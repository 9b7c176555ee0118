//! Process-wide accelerator device lifetime
//!
//! The physical device underlies every accelerated stream in the process, so
//! it is started at most once and stopped only when the last holder of the
//! handle drops it. Acquisition and teardown happen during configuration
//! load on the main thread; steady-state operation never mutates the device.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::backend::{AccelBackend, SequenceProducer};
use crate::error::Result;

static ACTIVE_DEVICE: Mutex<Weak<AccelDevice>> = Mutex::new(Weak::new());

/// Shared-ownership handle to the started accelerator device.
///
/// At most one device is live per process. Holders thread the handle through
/// their factories instead of reaching for a global; the registry behind
/// [`AccelDevice::acquire`] only enforces uniqueness.
pub struct AccelDevice {
    backend: Arc<dyn AccelBackend>,
}

impl AccelDevice {
    /// Acquire the process-wide device, starting the hardware on first
    /// demand. While a device is live, subsequent acquisitions share it and
    /// the `backend` argument is ignored.
    ///
    /// # Errors
    /// Returns [`crate::Error::DeviceStart`] when the hardware cannot be
    /// started. Configuration load must treat this as fatal: no accelerated
    /// stream can exist without the device.
    pub fn acquire(backend: Arc<dyn AccelBackend>) -> Result<Arc<Self>> {
        let mut active = ACTIVE_DEVICE.lock();
        if let Some(device) = active.upgrade() {
            return Ok(device);
        }

        backend.start_device()?;
        info!("accelerator device '{}' started", backend.device_name());
        let device = Arc::new(AccelDevice { backend });
        *active = Arc::downgrade(&device);
        Ok(device)
    }

    /// Get the backend's device name
    #[must_use]
    pub fn device_name(&self) -> &str {
        self.backend.device_name()
    }

    /// Allocate accelerator-side producer state for one session
    pub(crate) fn create_producer(&self) -> Result<Box<dyn SequenceProducer>> {
        self.backend.create_producer()
    }
}

impl Drop for AccelDevice {
    fn drop(&mut self) {
        debug!("stopping accelerator device '{}'", self.backend.device_name());
        self.backend.stop_device();
    }
}

#[cfg(all(test, feature = "stub"))]
mod tests {
    use super::*;
    use crate::backends::StubBackend;
    use crate::DEVICE_TEST_LOCK;

    #[test]
    fn test_device_is_shared_then_restarted() {
        let _guard = DEVICE_TEST_LOCK.lock();
        let backend = Arc::new(StubBackend::new());

        let first = AccelDevice::acquire(backend.clone()).unwrap();
        let second = AccelDevice::acquire(backend.clone()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.device_starts(), 1);

        drop(first);
        drop(second);
        assert_eq!(backend.device_stops(), 1);

        let third = AccelDevice::acquire(backend.clone()).unwrap();
        assert_eq!(backend.device_starts(), 2);
        drop(third);
        assert_eq!(backend.device_stops(), 2);
    }

    #[test]
    fn test_start_failure_is_fatal() {
        let _guard = DEVICE_TEST_LOCK.lock();
        let backend = Arc::new(StubBackend::failing_on_start());
        let err = AccelDevice::acquire(backend).unwrap_err();
        assert!(err.is_fatal());
    }
}
