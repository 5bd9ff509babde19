//! Error module docs.

use gpucmd_core::{CmdId, DeviceError};

/// Recoverable error of the command buffer manager.
///
/// Misuse of the recording state machine is not an error. It panics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
pub enum CommandError {
    /// Neither the requested function nor `Generic` has a usable queue family.
    #[fail(display = "No queue family can serve generic work")]
    NoQueueFamily,

    /// Handle refers to a freed buffer or was issued by another manager.
    #[fail(display = "Unknown command buffer {:?}", _0)]
    UnknownCommandBuffer(CmdId),

    /// Temporary buffers do not take part in dependency tracking.
    #[fail(display = "Temporary command buffer {:?} can not be submitted with tracking", _0)]
    TempBufferTracked(CmdId),

    /// Dependency of a tracked submission is not in flight.
    #[fail(display = "Command buffer {:?} depends on {:?} which is not submitted", _0, _1)]
    DependencyNotSubmitted(CmdId, CmdId),

    /// Dependency was submitted without a signal semaphore to wait on.
    #[fail(display = "Command buffer {:?} was submitted without a signal semaphore", _0)]
    NoSignalSemaphore(CmdId),

    /// Device call failed.
    #[fail(display = "{}", _0)]
    Device(#[cause] DeviceError),
}

impl From<DeviceError> for CommandError {
    fn from(error: DeviceError) -> Self {
        CommandError::Device(error)
    }
}
