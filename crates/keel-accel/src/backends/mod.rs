//! Accelerator backend implementations
//!
//! Contains concrete implementations of the `AccelBackend` trait.

#[cfg(feature = "stub")]
pub mod stub;

#[cfg(feature = "stub")]
pub use stub::StubBackend;
