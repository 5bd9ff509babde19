//! Device implementations.

#[cfg(feature = "vulkan")]
pub mod ash;

#[cfg(feature = "empty")]
pub mod empty;
