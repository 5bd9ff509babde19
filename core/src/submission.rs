use crate::{vk, Device};

/// Command queue submission.
/// One entry of a submit batch.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""), Clone(bound = ""), Copy(bound = ""))]
pub struct Submission<'a, D: Device> {
    /// Semaphores with stage masks to wait on.
    pub waits: &'a [(D::Semaphore, vk::PipelineStageFlags2)],

    /// Command buffers to execute.
    pub command_buffers: &'a [D::CommandBuffer],

    /// Semaphores to signal.
    pub signals: &'a [D::Semaphore],
}

impl<'a, D> Submission<'a, D>
where
    D: Device,
{
    /// Create new empty submission.
    pub fn new() -> Self {
        Submission {
            waits: &[],
            command_buffers: &[],
            signals: &[],
        }
    }

    /// Add waits to the submission.
    pub fn wait(self, waits: &'a [(D::Semaphore, vk::PipelineStageFlags2)]) -> Self {
        Submission { waits, ..self }
    }

    /// Add command buffers to the submission.
    pub fn submits(self, command_buffers: &'a [D::CommandBuffer]) -> Self {
        Submission {
            command_buffers,
            ..self
        }
    }

    /// Add signals to the submission.
    pub fn signal(self, signals: &'a [D::Semaphore]) -> Self {
        Submission { signals, ..self }
    }
}
