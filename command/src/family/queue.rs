use {
    crate::fence::{Fence, FenceEpoch},
    gpucmd_core::{Device, DeviceError, QueueId, Submission},
};

/// Command queue wrapper.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Queue<D: Device> {
    raw: D::Queue,
    id: QueueId,
    next_epoch: u64,
}

impl<D> Queue<D>
where
    D: Device,
{
    pub(super) fn new(raw: D::Queue, id: QueueId) -> Self {
        Queue {
            id,
            raw,
            next_epoch: 0,
        }
    }

    /// Id of the queue.
    pub fn id(&self) -> QueueId {
        self.id
    }

    /// Get raw command queue.
    pub fn raw(&self) -> D::Queue {
        self.raw
    }

    /// Returns next queue epoch.
    pub fn next_epoch(&self) -> u64 {
        self.next_epoch
    }

    /// Submit commands to the queue.
    /// Fence, if any, must be unsignaled and not submitted.
    /// It becomes submitted at the current epoch.
    ///
    /// # Safety
    ///
    /// Every handle in `submissions` must belong to `device`
    /// and command buffers must be allocated for the family of the queue.
    pub unsafe fn submit(
        &mut self,
        device: &D,
        submissions: &[Submission<'_, D>],
        fence: Option<&mut Fence<D>>,
    ) -> Result<(), DeviceError> {
        device.queue_submit(self.raw, submissions, fence.as_ref().map(|f| f.raw()))?;

        if let Some(fence) = fence {
            fence.mark_submitted(FenceEpoch {
                queue: self.id,
                epoch: self.next_epoch,
            });
            self.next_epoch += 1;
        }
        Ok(())
    }
}
