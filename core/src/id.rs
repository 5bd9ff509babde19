/// Index of a queue family on the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FamilyId(pub u32);

impl FamilyId {
    /// Get raw family index.
    pub fn index(&self) -> u32 {
        self.0
    }
}

/// Queue id.
/// Family plus index of the queue inside the family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueId(pub FamilyId, pub u32);

impl QueueId {
    /// Get family of the queue.
    pub fn family(&self) -> FamilyId {
        self.0
    }

    /// Get index of the queue.
    pub fn index(&self) -> u32 {
        self.1
    }
}

/// Stable handle of a command buffer owned by a manager.
///
/// Index into the manager's arena plus the generation of the slot.
/// A handle to a freed buffer never aliases a buffer allocated later in the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CmdId {
    index: u32,
    generation: u32,
}

impl CmdId {
    /// Create handle from arena index and slot generation.
    pub const fn new(index: usize, generation: u32) -> Self {
        CmdId {
            index: index as u32,
            generation,
        }
    }

    /// Arena index of the handle.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Generation of the arena slot when the handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Unique resource id.
/// Assigned by the live resource registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub u64);
