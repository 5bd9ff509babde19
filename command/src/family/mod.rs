//! Family module docs.

mod queue;
mod tiers;

use {
    crate::pool::PoolSet,
    gpucmd_core::{vk, Device, DeviceError, FamilyId, QueueFunction, QueueId, QueuePriority},
};

pub use self::{queue::Queue, tiers::PriorityTiers};

/// Pick the queue family that serves `function` best.
///
/// A family is a candidate if it has queues and shares any capability bit with the function.
/// The first exact match wins. Otherwise the candidate with the fewest extra capabilities wins,
/// first scanned on ties.
pub fn select_family(
    families: &[vk::QueueFamilyProperties],
    function: QueueFunction,
) -> Option<FamilyId> {
    let required = function.required_flags();
    let mut best: Option<(FamilyId, u32)> = None;

    for (index, family) in families.iter().enumerate() {
        let flags = family.queue_flags;
        if family.queue_count == 0 || (flags & required).is_empty() {
            continue;
        }
        let id = FamilyId(index as u32);
        if flags & required == flags {
            return Some(id);
        }
        let extra = (flags.as_raw() & !required.as_raw()).count_ones();
        match best {
            Some((_, fewest)) if fewest <= extra => {}
            _ => best = Some((id, extra)),
        }
    }

    best.map(|(id, _)| id)
}

/// Queues and pools serving one queue function.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct FunctionQueues<D: Device> {
    function: QueueFunction,
    family: FamilyId,
    tiers: PriorityTiers,
    queues: Vec<Queue<D>>,
    pools: PoolSet<D>,
}

impl<D> FunctionQueues<D>
where
    D: Device,
{
    /// Fetch queues of the family and create the pools.
    ///
    /// # Safety
    ///
    /// `family` must be one of the families the device was created with
    /// and the device must expose `queue_count` queues of it.
    pub unsafe fn new(
        device: &D,
        function: QueueFunction,
        family: FamilyId,
        queue_count: u32,
        reserve_spare: bool,
    ) -> Result<Self, DeviceError> {
        let tiers = PriorityTiers::new(queue_count, reserve_spare);
        let pools = PoolSet::create(device, family)?;
        let queues = (0..tiers.used_queues())
            .map(|index| Queue::new(device.get_queue(family, index), QueueId(family, index)))
            .collect();

        log::debug!(
            "{:?} served by {:?} with {} queues per priority tier",
            function,
            family,
            tiers.per_tier()
        );

        Ok(FunctionQueues {
            function,
            family,
            tiers,
            queues,
            pools,
        })
    }

    /// Function served.
    pub fn function(&self) -> QueueFunction {
        self.function
    }

    /// Family of the queues.
    pub fn family(&self) -> FamilyId {
        self.family
    }

    /// Queues in use, tier by tier.
    pub fn queues(&self) -> &[Queue<D>] {
        &self.queues
    }

    /// Pools of the function.
    pub fn pools(&self) -> &PoolSet<D> {
        &self.pools
    }

    /// Queue for the next request of the priority tier.
    pub fn next_queue(&mut self, priority: QueuePriority) -> &mut Queue<D> {
        let index = self.tiers.next_index(priority) as usize;
        &mut self.queues[index]
    }

    /// Destroy the pools.
    ///
    /// # Safety
    ///
    /// All buffers allocated from the pools must be freed.
    pub unsafe fn dispose(self, device: &D) {
        log::debug!("Disposing queues of {:?}", self.function);
        self.pools.dispose(device);
    }
}
