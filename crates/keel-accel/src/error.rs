//! Error types for accelerator device and session management.

/// Result type for accelerator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Accelerator operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The physical device could not be started
    #[error("failed to start accelerator device '{device}': {message}")]
    DeviceStart {
        /// Backend device name
        device: String,
        /// Failure reason
        message: String,
    },

    /// Accelerator-side session state could not be allocated
    #[error("failed to create accelerator session: {0}")]
    SessionStart(String),

    /// Sequence production failed for one input window
    #[error("sequence production failed: {0}")]
    Produce(String),
}

impl Error {
    /// Create a device start error
    #[must_use]
    pub fn device_start(device: impl Into<String>, message: impl Into<String>) -> Self {
        Error::DeviceStart {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Check if this error degrades the current window to the software
    /// sequence producer rather than failing the stream
    #[must_use]
    pub fn should_fallback(&self) -> bool {
        matches!(self, Error::Produce(_))
    }

    /// Check if this error leaves the accelerator unusable for the process
    /// or thread that observed it
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::DeviceStart { .. } | Error::SessionStart(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::device_start("qat0", "firmware not loaded");
        assert!(err.to_string().contains("qat0"));
        assert!(err.to_string().contains("firmware not loaded"));
    }

    #[test]
    fn test_should_fallback() {
        assert!(Error::Produce("window too large".into()).should_fallback());
        assert!(!Error::SessionStart("no contexts left".into()).should_fallback());
    }

    #[test]
    fn test_is_fatal() {
        assert!(Error::device_start("qat0", "busy").is_fatal());
        assert!(Error::SessionStart("no contexts left".into()).is_fatal());
        assert!(!Error::Produce("transient".into()).is_fatal());
    }
}
