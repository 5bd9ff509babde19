//! Crate that contains the backend abstraction and the types shared by the other gpucmd crates.
//!
//! Every other crate is generic over [`Device`] and talks about queues, stages and accesses
//! using the `ash::vk` flag types re-exported here.

#![warn(
    missing_debug_implementations,
    missing_copy_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

#[macro_use]
extern crate failure;

#[doc(inline)]
pub use ash::vk;

mod barrier;
mod device;
mod error;
mod id;
mod queue;
mod submission;

pub mod impls;

pub use crate::{
    barrier::{BufferBarrier, ImageBarrier, SubresourceRange},
    device::Device,
    error::DeviceError,
    id::{CmdId, FamilyId, QueueId, ResourceId},
    queue::{QueueFunction, QueuePriority},
    submission::Submission,
};

#[cfg(feature = "empty")]
pub use crate::impls::empty;

#[cfg(feature = "vulkan")]
pub use crate::impls::ash::AshDevice;

/// `assert!` that exists only if `"no-slow-safety-checks"` feature is not enabled.
#[cfg(not(feature = "no-slow-safety-checks"))]
#[macro_export]
macro_rules! gpucmd_slow_assert {
    ($($tt:tt)*) => {
        assert!($($tt)*);
    };
}

/// `assert!` that exists only if `"no-slow-safety-checks"` feature is not enabled.
#[cfg(feature = "no-slow-safety-checks")]
#[macro_export]
macro_rules! gpucmd_slow_assert {
    ($($tt:tt)*) => {};
}
