use gpucmd_core::{Device, DeviceError, QueueId};

/// Queue epoch is the point in particular queue timeline when fence is submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FenceEpoch {
    /// Queue that signals fence.
    pub queue: QueueId,

    /// Queue epoch counter.
    pub epoch: u64,
}

#[derive(Clone, Copy, Debug)]
enum FenceState {
    Unsignaled,
    Signaled,
    Submitted(FenceEpoch),
}

/// Fence wrapper.
///
/// Fences created by the manager are owned and destroyed on dispose.
/// Fences supplied by the caller are never reset nor destroyed here.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Fence<D: Device> {
    raw: D::Fence,
    state: FenceState,
    owned: bool,
}

impl<D> Fence<D>
where
    D: Device,
{
    /// Create new unsignaled fence.
    pub fn new(device: &D) -> Result<Self, DeviceError> {
        let raw = unsafe { device.create_fence(false) }.map_err(|err| {
            log::error!("Failed to create fence: {}", err);
            err
        })?;
        Ok(Fence {
            raw,
            state: FenceState::Unsignaled,
            owned: true,
        })
    }

    /// Wrap fence supplied by the caller.
    /// It must be unsignaled.
    pub fn external(raw: D::Fence) -> Self {
        Fence {
            raw,
            state: FenceState::Unsignaled,
            owned: false,
        }
    }

    /// Get raw fence.
    pub fn raw(&self) -> D::Fence {
        self.raw
    }

    /// Check if the fence was created by the manager.
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Check if fence was submitted.
    pub fn is_submitted(&self) -> bool {
        match self.state {
            FenceState::Submitted(_) => true,
            _ => false,
        }
    }

    /// Check if fence is known to be signaled.
    pub fn is_signaled(&self) -> bool {
        match self.state {
            FenceState::Signaled => true,
            _ => false,
        }
    }

    /// Epoch the fence was submitted at.
    pub fn epoch(&self) -> Option<FenceEpoch> {
        match self.state {
            FenceState::Submitted(epoch) => Some(epoch),
            _ => None,
        }
    }

    /// Panics if signaled or submitted.
    /// Becomes `Submitted` after.
    pub(crate) fn mark_submitted(&mut self, epoch: FenceEpoch) {
        match self.state {
            FenceState::Unsignaled => {
                self.state = FenceState::Submitted(epoch);
            }
            _ => {
                log::error!("Fence {:?} submitted in state {:?}", self.raw, self.state);
                panic!("Must be Unsignaled");
            }
        }
    }

    /// Poll the fence without blocking.
    /// Returns `true` if signaled.
    pub fn check_signaled(&self, device: &D) -> Result<bool, DeviceError> {
        match self.state {
            FenceState::Signaled => Ok(true),
            FenceState::Submitted(_) => unsafe { device.get_fence_status(self.raw) },
            FenceState::Unsignaled => Ok(false),
        }
    }

    /// Wait for fence to become signaled.
    /// Panics if not submitted nor signaled.
    /// Returns submission epoch on success, `None` if signaled already
    /// and `Err(Timeout)` if `timeout_ns` expired.
    pub fn wait_signaled(
        &mut self,
        device: &D,
        timeout_ns: u64,
    ) -> Result<Option<FenceEpoch>, DeviceError> {
        match self.state {
            FenceState::Signaled => Ok(None),
            FenceState::Submitted(epoch) => {
                if unsafe { device.wait_for_fence(self.raw, timeout_ns) }? {
                    self.state = FenceState::Signaled;
                    Ok(Some(epoch))
                } else {
                    log::warn!("Timed out waiting for fence {:?} of {:?}", self.raw, epoch);
                    Err(DeviceError::Timeout)
                }
            }
            FenceState::Unsignaled => {
                log::error!("Waiting for fence {:?} that was never submitted", self.raw);
                panic!("Must be submitted");
            }
        }
    }

    /// Reset signaled fence.
    /// Panics if not signaled.
    /// Becomes unsignaled.
    pub fn reset(&mut self, device: &D) -> Result<(), DeviceError> {
        match self.state {
            FenceState::Signaled => {
                unsafe { device.reset_fence(self.raw) }?;
                self.state = FenceState::Unsignaled;
                Ok(())
            }
            _ => {
                log::error!("Fence {:?} reset in state {:?}", self.raw, self.state);
                panic!("Must be signaled");
            }
        }
    }

    /// Unwrap raw fence handing its ownership to the caller.
    pub fn into_raw(self) -> D::Fence {
        self.raw
    }

    /// Destroy the fence if it is owned. Forget it otherwise.
    ///
    /// # Safety
    ///
    /// The fence must not be used by a pending submission.
    pub unsafe fn dispose(self, device: &D) {
        if self.owned {
            device.destroy_fence(self.raw);
        }
    }
}
