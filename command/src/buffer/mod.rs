//! Command buffer records.

mod state;
mod usage;

use gpucmd_core::{Device, FamilyId, QueueFunction};

pub use self::{state::CmdState, usage::BufferKind};

/// Command buffer owned by the manager.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct CommandBuffer<D: Device> {
    name: String,
    raw: D::CommandBuffer,
    function: QueueFunction,
    pool_function: QueueFunction,
    family: FamilyId,
    kind: BufferKind,
    state: CmdState,
    sync: Option<usize>,
    generation: u32,
}

impl<D> CommandBuffer<D>
where
    D: Device,
{
    pub(crate) fn new(
        name: String,
        raw: D::CommandBuffer,
        function: QueueFunction,
        pool_function: QueueFunction,
        family: FamilyId,
        kind: BufferKind,
        generation: u32,
    ) -> Self {
        CommandBuffer {
            name,
            raw,
            function,
            pool_function,
            family,
            kind,
            state: CmdState::Idle,
            sync: None,
            generation,
        }
    }

    /// Name the buffer was begun with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get raw command buffer.
    pub fn raw(&self) -> D::CommandBuffer {
        self.raw
    }

    /// Function the buffer was requested for.
    pub fn function(&self) -> QueueFunction {
        self.function
    }

    /// Function whose pool and queues serve the buffer.
    /// Differs from `function` when the requested function falls back to `Generic`.
    pub fn pool_function(&self) -> QueueFunction {
        self.pool_function
    }

    /// Family the buffer was allocated for.
    pub fn family(&self) -> FamilyId {
        self.family
    }

    /// Kind of the buffer.
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Current state.
    pub fn state(&self) -> CmdState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: CmdState) {
        log::trace!("{:?} '{}': {:?} -> {:?}", self.raw, self.name, self.state, state);
        self.state = state;
    }

    /// Sync slot of the submission while submitted.
    pub fn sync(&self) -> Option<usize> {
        self.sync
    }

    pub(crate) fn set_sync(&mut self, sync: Option<usize>) {
        self.sync = sync;
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}
