use {
    gpucmd_command::CommandError,
    gpucmd_core::{DeviceError, ResourceId},
};

/// Error of the recording context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
pub enum ContextError {
    /// Command buffer manager failed.
    #[fail(display = "{}", _0)]
    Command(#[cause] CommandError),

    /// Resource is not registered.
    #[fail(display = "Unknown resource {:?}", _0)]
    UnknownResource(ResourceId),
}

impl From<CommandError> for ContextError {
    fn from(error: CommandError) -> Self {
        ContextError::Command(error)
    }
}

impl From<DeviceError> for ContextError {
    fn from(error: DeviceError) -> Self {
        ContextError::Command(CommandError::Device(error))
    }
}
