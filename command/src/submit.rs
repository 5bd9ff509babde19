use gpucmd_core::{vk, CmdId, Device};

/// Submission with caller supplied synchronization.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""), Clone(bound = ""), Copy(bound = ""))]
pub struct ExplicitSubmit<'a, D: Device> {
    /// Buffers to execute. All of them must be served by one queue function.
    pub buffers: &'a [CmdId],

    /// Semaphores to wait on with the stages that wait.
    pub waits: &'a [(D::Semaphore, vk::PipelineStageFlags2)],

    /// Semaphores to signal. The first one becomes the group's signal semaphore.
    pub signals: &'a [D::Semaphore],
}

impl<'a, D> ExplicitSubmit<'a, D>
where
    D: Device,
{
    /// Submission of `buffers` without waits and signals.
    pub fn new(buffers: &'a [CmdId]) -> Self {
        ExplicitSubmit {
            buffers,
            waits: &[],
            signals: &[],
        }
    }

    /// Add waits.
    pub fn wait(self, waits: &'a [(D::Semaphore, vk::PipelineStageFlags2)]) -> Self {
        ExplicitSubmit { waits, ..self }
    }

    /// Add signals.
    pub fn signal(self, signals: &'a [D::Semaphore]) -> Self {
        ExplicitSubmit { signals, ..self }
    }
}

/// Submission group whose waits come from the resource tracker.
#[derive(Clone, Copy, Debug)]
pub struct TrackedSubmit<'a> {
    /// Buffers of the group.
    pub buffers: &'a [CmdId],

    /// Extra buffers to wait for at the top of the pipe.
    pub wait_on: &'a [CmdId],
}

impl<'a> TrackedSubmit<'a> {
    /// Group without extra waits.
    pub fn new(buffers: &'a [CmdId]) -> Self {
        TrackedSubmit {
            buffers,
            wait_on: &[],
        }
    }

    /// Add extra waits.
    pub fn wait_on(self, wait_on: &'a [CmdId]) -> Self {
        TrackedSubmit { wait_on, ..self }
    }
}
