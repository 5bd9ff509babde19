use crate::vk;

/// Work category a hardware queue is asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueueFunction {
    /// Compute dispatches.
    Compute,

    /// Draws.
    Graphics,

    /// Copies.
    Transfer,

    /// Presentation to a surface.
    Present,

    /// Anything. Fallback for functions without a family of their own.
    Generic,
}

impl QueueFunction {
    /// All functions in scan order.
    pub const ALL: [QueueFunction; 5] = [
        QueueFunction::Compute,
        QueueFunction::Graphics,
        QueueFunction::Transfer,
        QueueFunction::Present,
        QueueFunction::Generic,
    ];

    /// Queue capability bits the function asks a family for.
    pub fn required_flags(&self) -> vk::QueueFlags {
        match self {
            QueueFunction::Compute => vk::QueueFlags::COMPUTE,
            QueueFunction::Graphics => vk::QueueFlags::GRAPHICS,
            QueueFunction::Transfer => vk::QueueFlags::TRANSFER,
            QueueFunction::Present | QueueFunction::Generic => {
                vk::QueueFlags::COMPUTE
                    | vk::QueueFlags::GRAPHICS
                    | vk::QueueFlags::TRANSFER
                    | vk::QueueFlags::SPARSE_BINDING
                    | vk::QueueFlags::PROTECTED
            }
        }
    }

    /// Position of the function in `ALL`.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Priority tier of a queue request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueuePriority {
    /// Lowest tier.
    Low,

    /// Second tier.
    Medium,

    /// Third tier.
    High,

    /// Highest tier.
    SuperHigh,
}

impl QueuePriority {
    /// Number of priority tiers.
    pub const COUNT: usize = 4;

    /// All tiers, lowest first.
    pub const ALL: [QueuePriority; 4] = [
        QueuePriority::Low,
        QueuePriority::Medium,
        QueuePriority::High,
        QueuePriority::SuperHigh,
    ];

    /// Position of the tier, lowest first.
    pub fn index(&self) -> usize {
        *self as usize
    }
}
