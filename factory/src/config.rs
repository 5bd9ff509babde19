use gpucmd_command::ManagerConfig;

/// Settings of the recording context.
#[derive(Clone, Copy, derivative::Derivative)]
#[derivative(Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Leave one queue of each priority tier unused when a tier would get more than one.
    #[derivative(Default(value = "true"))]
    pub reserve_spare_queue: bool,

    /// How long finishing a command buffer waits for its fence, in nanoseconds.
    #[derivative(Default(value = "u64::MAX"))]
    pub fence_timeout_ns: u64,

    /// Drop tracker entries of unregistered resources on every new frame.
    #[derivative(Default(value = "true"))]
    pub compact_on_new_frame: bool,
}

impl Config {
    /// Settings of the command buffer manager.
    pub fn manager(&self) -> ManagerConfig {
        ManagerConfig {
            reserve_spare_queue: self.reserve_spare_queue,
            fence_timeout_ns: self.fence_timeout_ns,
        }
    }
}
