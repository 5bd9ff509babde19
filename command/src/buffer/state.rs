/// Recording lifecycle stage of a command buffer.
///
/// `Idle -> Recording -> (RenderPass <-> Recording) -> Recorded -> Submitted -> Recorded`.
/// Rerecordable buffers go from `Recorded` back to `Recording`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmdState {
    /// Allocated and never begun.
    Idle,

    /// Commands are being recorded.
    Recording,

    /// Recording inside a render pass.
    RenderPass,

    /// Recording ended. Can be submitted.
    Recorded,

    /// Submitted and not finished yet.
    Submitted,
}

impl CmdState {
    /// Check if the buffer is recording, in or outside of a render pass.
    pub fn is_recording(&self) -> bool {
        match self {
            CmdState::Recording | CmdState::RenderPass => true,
            _ => false,
        }
    }
}
