//! Sync objects of in-flight submissions.

use {
    crate::fence::Fence,
    gpucmd_core::{Device, DeviceError},
    slab::Slab,
};

/// Sync objects of one submission group.
///
/// Shared by every buffer of the group. Recycled when the last of them finishes.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct SubmitSyncInfo<D: Device> {
    semaphore: Option<D::Semaphore>,
    owns_semaphore: bool,
    fence: usize,
    refs: usize,
    advanced: bool,
}

impl<D> SubmitSyncInfo<D>
where
    D: Device,
{
    /// Semaphore signaled when the group completes.
    pub fn semaphore(&self) -> Option<D::Semaphore> {
        self.semaphore
    }

    /// Number of buffers of the group not finished yet.
    pub fn refs(&self) -> usize {
        self.refs
    }

    /// Check if the group was submitted with dependency tracking.
    pub fn is_advanced(&self) -> bool {
        self.advanced
    }
}

#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
struct SharedFence<D: Device> {
    fence: Fence<D>,
    refs: usize,
}

/// Index-addressed slots of in-flight submission groups.
/// Groups of one batched submit share a completion fence.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""), Default(bound = ""))]
pub struct SyncPool<D: Device> {
    slots: Slab<SubmitSyncInfo<D>>,
    fences: Slab<SharedFence<D>>,
}

impl<D> SyncPool<D>
where
    D: Device,
{
    /// Create empty pool.
    pub fn new() -> Self {
        SyncPool {
            slots: Slab::new(),
            fences: Slab::new(),
        }
    }

    /// Take submitted fence for the slots allocated next.
    pub fn insert_fence(&mut self, fence: Fence<D>) -> usize {
        self.fences.insert(SharedFence { fence, refs: 0 })
    }

    /// Allocate slot for a group of `refs` buffers.
    /// `owns_semaphore` makes the pool destroy the semaphore on release.
    pub fn allocate(
        &mut self,
        semaphore: Option<D::Semaphore>,
        owns_semaphore: bool,
        fence: usize,
        refs: usize,
        advanced: bool,
    ) -> usize {
        self.fences[fence].refs += 1;
        let slot = self.slots.insert(SubmitSyncInfo {
            semaphore,
            owns_semaphore,
            fence,
            refs,
            advanced,
        });
        log::trace!("Sync slot {} allocated for {} buffers", slot, refs);
        slot
    }

    /// Get slot.
    pub fn get(&self, slot: usize) -> Option<&SubmitSyncInfo<D>> {
        self.slots.get(slot)
    }

    /// Semaphore of the slot.
    pub fn semaphore(&self, slot: usize) -> Option<D::Semaphore> {
        self.slots.get(slot).and_then(SubmitSyncInfo::semaphore)
    }

    /// Number of slots in use.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Number of completion fences alive.
    pub fn fences(&self) -> usize {
        self.fences.len()
    }

    /// Poll completion fence of the slot.
    pub fn is_signaled(&self, device: &D, slot: usize) -> Result<bool, DeviceError> {
        match self.slots.get(slot) {
            Some(info) => self.fences[info.fence].fence.check_signaled(device),
            None => Ok(true),
        }
    }

    /// Block until completion fence of the slot is signaled.
    pub fn wait(&mut self, device: &D, slot: usize, timeout_ns: u64) -> Result<(), DeviceError> {
        if let Some(info) = self.slots.get(slot) {
            self.fences[info.fence]
                .fence
                .wait_signaled(device, timeout_ns)?;
        }
        Ok(())
    }

    /// Drop one reference to the slot.
    /// Returns references left.
    pub fn decrement(&mut self, slot: usize) -> usize {
        match self.slots.get_mut(slot) {
            Some(info) => {
                info.refs = info.refs.saturating_sub(1);
                info.refs
            }
            None => 0,
        }
    }

    /// Recycle the slot.
    /// Owned semaphore is destroyed. Fence is disposed with its last slot.
    ///
    /// # Safety
    ///
    /// The group must be complete and no pending submission may wait on the semaphore.
    pub unsafe fn release(&mut self, device: &D, slot: usize) {
        if !self.slots.contains(slot) {
            return;
        }
        let info = self.slots.remove(slot);
        if info.owns_semaphore {
            if let Some(semaphore) = info.semaphore {
                device.destroy_semaphore(semaphore);
            }
        }

        let shared = &mut self.fences[info.fence];
        shared.refs -= 1;
        if shared.refs == 0 {
            let shared = self.fences.remove(info.fence);
            shared.fence.dispose(device);
        }
        log::trace!("Sync slot {} released", slot);
    }

    /// Release every slot.
    ///
    /// # Safety
    ///
    /// All submitted work must be complete.
    pub unsafe fn dispose(mut self, device: &D) {
        let slots: Vec<usize> = self.slots.iter().map(|(slot, _)| slot).collect();
        if !slots.is_empty() {
            log::warn!("{} sync slots still in use at dispose", slots.len());
        }
        for slot in slots {
            self.release(device, slot);
        }
        for shared in self.fences.drain() {
            shared.fence.dispose(device);
        }
    }
}
