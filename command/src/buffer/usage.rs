use gpucmd_core::vk;

/// Kind of a command buffer.
/// Determines the pool it is allocated from and the flags it begins with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Ephemeral buffer owned by the caller end-to-end. Not in the name table.
    Temp,

    /// Recorded once, submitted any number of times.
    OneTime,

    /// Recorded again after each finish.
    Rerecordable,
}

impl BufferKind {
    /// Creation flags of the pool buffers of this kind come from.
    pub fn pool_flags(&self) -> vk::CommandPoolCreateFlags {
        match self {
            BufferKind::Temp => vk::CommandPoolCreateFlags::TRANSIENT,
            BufferKind::OneTime => vk::CommandPoolCreateFlags::empty(),
            BufferKind::Rerecordable => vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        }
    }

    /// Flags buffers of this kind begin recording with.
    pub fn usage(&self) -> vk::CommandBufferUsageFlags {
        match self {
            BufferKind::Temp | BufferKind::Rerecordable => {
                vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT
            }
            // May be submitted many times.
            BufferKind::OneTime => vk::CommandBufferUsageFlags::empty(),
        }
    }

    /// Check if buffers of this kind can be begun again.
    pub fn is_resettable(&self) -> bool {
        *self == BufferKind::Rerecordable
    }

    /// Check if buffers of this kind bypass the name table and the tracker.
    pub fn is_temp(&self) -> bool {
        *self == BufferKind::Temp
    }
}
