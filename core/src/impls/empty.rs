//! Backend that does nothing on a GPU.
//!
//! Every call is validated against the handle tables and recorded,
//! so the command layer can be tested without a driver.
//! Submitted work completes instantly unless fences are held.
//! Held work completes when its fence is waited on.

use {
    crate::{vk, BufferBarrier, Device, DeviceError, FamilyId, ImageBarrier, Submission},
    parking_lot::Mutex,
    std::collections::{HashMap, HashSet},
};

macro_rules! define_handle {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $name(pub u64);
        )*
    };
}

define_handle! {
    /// Empty command pool.
    CommandPool;
    /// Empty command buffer.
    CommandBuffer;
    /// Empty semaphore.
    Semaphore;
    /// Empty fence.
    Fence;
    /// Empty buffer. Create any value for barrier targets.
    Buffer;
    /// Empty image. Create any value for barrier targets.
    Image;
}

/// Empty queue. Remembers where it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Queue {
    /// Family of the queue.
    pub family: FamilyId,

    /// Index inside the family.
    pub index: u32,
}

/// One recorded `Submission`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitRecord {
    /// Index of the `queue_submit` call this entry was part of.
    pub batch: usize,

    /// Queue submitted to.
    pub queue: Queue,

    /// Waits with stage masks.
    pub waits: Vec<(Semaphore, vk::PipelineStageFlags2)>,

    /// Submitted command buffers.
    pub command_buffers: Vec<CommandBuffer>,

    /// Signaled semaphores.
    pub signals: Vec<Semaphore>,

    /// Fence of the whole batch.
    pub fence: Option<Fence>,
}

/// One recorded pipeline barrier command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarrierRecord {
    /// Command buffer the barrier was recorded into.
    pub command_buffer: CommandBuffer,

    /// Buffer barriers.
    pub buffers: Vec<BufferBarrier<Buffer>>,

    /// Image barriers.
    pub images: Vec<ImageBarrier<Image>>,
}

#[derive(Debug)]
struct BufferInfo {
    pool: CommandPool,
    recording: bool,
    begun: bool,
    usage: vk::CommandBufferUsageFlags,
}

#[derive(Debug, Default)]
struct State {
    next: u64,
    pools: HashMap<CommandPool, (FamilyId, vk::CommandPoolCreateFlags)>,
    buffers: HashMap<CommandBuffer, BufferInfo>,
    semaphores: HashSet<Semaphore>,
    fences: HashMap<Fence, bool>,
    held: HashSet<Fence>,
    submits: Vec<SubmitRecord>,
    batches: usize,
    barriers: Vec<BarrierRecord>,
    hold_fences: bool,
    hang: bool,
    out_of_memory: bool,
}

impl State {
    fn next(&mut self) -> Result<u64, DeviceError> {
        if self.out_of_memory {
            return Err(DeviceError::OutOfHostMemory);
        }
        self.next += 1;
        Ok(self.next)
    }
}

/// Device without a GPU behind it.
#[derive(Debug)]
pub struct EmptyDevice {
    families: Vec<vk::QueueFamilyProperties>,
    state: Mutex<State>,
}

impl EmptyDevice {
    /// Create device with given queue families.
    /// Each entry is the capability bits and the queue count of one family.
    pub fn new(families: &[(vk::QueueFlags, u32)]) -> Self {
        EmptyDevice {
            families: families
                .iter()
                .map(|&(flags, count)| vk::QueueFamilyProperties {
                    queue_flags: flags,
                    queue_count: count,
                    ..Default::default()
                })
                .collect(),
            state: Mutex::new(State::default()),
        }
    }

    /// Make every following allocation fail with `OutOfHostMemory`.
    pub fn set_out_of_memory(&self, value: bool) {
        self.state.lock().out_of_memory = value;
    }

    /// Keep fences of following submissions unsignaled
    /// until `release_fences` is called.
    pub fn hold_fences(&self, value: bool) {
        self.state.lock().hold_fences = value;
    }

    /// Make waits on unsignaled fences time out.
    pub fn set_hang(&self, value: bool) {
        self.state.lock().hang = value;
    }

    /// Signal all held fences. Work submitted so far is complete.
    pub fn release_fences(&self) {
        let mut state = self.state.lock();
        let held: Vec<_> = state.held.drain().collect();
        for fence in held {
            if let Some(signaled) = state.fences.get_mut(&fence) {
                *signaled = true;
            }
        }
    }

    /// All submissions so far.
    pub fn submissions(&self) -> Vec<SubmitRecord> {
        self.state.lock().submits.clone()
    }

    /// Number of `queue_submit` calls so far.
    pub fn submit_calls(&self) -> usize {
        self.state.lock().batches
    }

    /// All barrier commands so far.
    pub fn barriers(&self) -> Vec<BarrierRecord> {
        self.state.lock().barriers.clone()
    }

    /// Pools alive with their families and creation flags.
    pub fn live_pools(&self) -> Vec<(FamilyId, vk::CommandPoolCreateFlags)> {
        self.state.lock().pools.values().cloned().collect()
    }

    /// Number of command buffers not freed.
    pub fn live_command_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    /// Number of semaphores not destroyed.
    pub fn live_semaphores(&self) -> usize {
        self.state.lock().semaphores.len()
    }

    /// Number of fences not destroyed.
    pub fn live_fences(&self) -> usize {
        self.state.lock().fences.len()
    }

    /// Check if the fence is alive.
    pub fn is_fence_alive(&self, fence: Fence) -> bool {
        self.state.lock().fences.contains_key(&fence)
    }

    /// Check if the semaphore is alive.
    pub fn is_semaphore_alive(&self, semaphore: Semaphore) -> bool {
        self.state.lock().semaphores.contains(&semaphore)
    }

    /// Usage flags the buffer was last begun with.
    pub fn begin_usage(&self, buffer: CommandBuffer) -> Option<vk::CommandBufferUsageFlags> {
        self.state
            .lock()
            .buffers
            .get(&buffer)
            .filter(|info| info.begun)
            .map(|info| info.usage)
    }

    /// Creation flags of the pool the buffer was allocated from.
    pub fn pool_flags(&self, buffer: CommandBuffer) -> Option<vk::CommandPoolCreateFlags> {
        let state = self.state.lock();
        let pool = state.buffers.get(&buffer)?.pool;
        state.pools.get(&pool).map(|&(_, flags)| flags)
    }
}

impl Device for EmptyDevice {
    type CommandPool = CommandPool;
    type CommandBuffer = CommandBuffer;
    type Semaphore = Semaphore;
    type Fence = Fence;
    type Queue = Queue;
    type Buffer = Buffer;
    type Image = Image;

    fn queue_families(&self) -> &[vk::QueueFamilyProperties] {
        &self.families
    }

    unsafe fn get_queue(&self, family: FamilyId, index: u32) -> Queue {
        let properties = &self.families[family.index() as usize];
        assert!(index < properties.queue_count, "No queue {} in {:?}", index, family);
        Queue { family, index }
    }

    unsafe fn create_command_pool(
        &self,
        family: FamilyId,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<CommandPool, DeviceError> {
        assert!((family.index() as usize) < self.families.len());
        let mut state = self.state.lock();
        let pool = CommandPool(state.next()?);
        state.pools.insert(pool, (family, flags));
        Ok(pool)
    }

    unsafe fn destroy_command_pool(&self, pool: CommandPool) {
        let mut state = self.state.lock();
        assert!(
            state.buffers.values().all(|info| info.pool != pool),
            "Pool {:?} destroyed with buffers alive",
            pool
        );
        assert!(state.pools.remove(&pool).is_some(), "Unknown pool {:?}", pool);
    }

    unsafe fn allocate_command_buffer(&self, pool: CommandPool) -> Result<CommandBuffer, DeviceError> {
        let mut state = self.state.lock();
        assert!(state.pools.contains_key(&pool), "Unknown pool {:?}", pool);
        let buffer = CommandBuffer(state.next()?);
        state.buffers.insert(
            buffer,
            BufferInfo {
                pool,
                recording: false,
                begun: false,
                usage: vk::CommandBufferUsageFlags::empty(),
            },
        );
        Ok(buffer)
    }

    unsafe fn free_command_buffer(&self, pool: CommandPool, buffer: CommandBuffer) {
        let mut state = self.state.lock();
        let info = state.buffers.remove(&buffer);
        assert_eq!(info.map(|info| info.pool), Some(pool), "Buffer {:?} not from {:?}", buffer, pool);
    }

    unsafe fn begin_command_buffer(
        &self,
        buffer: CommandBuffer,
        usage: vk::CommandBufferUsageFlags,
    ) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        let pool = state.buffers.get(&buffer).map(|info| info.pool);
        let resettable = pool
            .and_then(|pool| state.pools.get(&pool))
            .map_or(false, |&(_, flags)| {
                flags.contains(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            });
        let info = state
            .buffers
            .get_mut(&buffer)
            .unwrap_or_else(|| panic!("Unknown buffer {:?}", buffer));
        assert!(!info.recording, "Buffer {:?} is already recording", buffer);
        assert!(
            !info.begun || resettable,
            "Buffer {:?} re-begun without RESET_COMMAND_BUFFER pool",
            buffer
        );
        info.recording = true;
        info.begun = true;
        info.usage = usage;
        Ok(())
    }

    unsafe fn end_command_buffer(&self, buffer: CommandBuffer) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        let info = state
            .buffers
            .get_mut(&buffer)
            .unwrap_or_else(|| panic!("Unknown buffer {:?}", buffer));
        assert!(info.recording, "Buffer {:?} is not recording", buffer);
        info.recording = false;
        Ok(())
    }

    unsafe fn create_semaphore(&self) -> Result<Semaphore, DeviceError> {
        let mut state = self.state.lock();
        let semaphore = Semaphore(state.next()?);
        state.semaphores.insert(semaphore);
        Ok(semaphore)
    }

    unsafe fn destroy_semaphore(&self, semaphore: Semaphore) {
        assert!(
            self.state.lock().semaphores.remove(&semaphore),
            "Unknown semaphore {:?}",
            semaphore
        );
    }

    unsafe fn create_fence(&self, signaled: bool) -> Result<Fence, DeviceError> {
        let mut state = self.state.lock();
        let fence = Fence(state.next()?);
        state.fences.insert(fence, signaled);
        Ok(fence)
    }

    unsafe fn destroy_fence(&self, fence: Fence) {
        let mut state = self.state.lock();
        state.held.remove(&fence);
        assert!(state.fences.remove(&fence).is_some(), "Unknown fence {:?}", fence);
    }

    unsafe fn reset_fence(&self, fence: Fence) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        let signaled = state
            .fences
            .get_mut(&fence)
            .unwrap_or_else(|| panic!("Unknown fence {:?}", fence));
        *signaled = false;
        Ok(())
    }

    unsafe fn get_fence_status(&self, fence: Fence) -> Result<bool, DeviceError> {
        let state = self.state.lock();
        Ok(*state
            .fences
            .get(&fence)
            .unwrap_or_else(|| panic!("Unknown fence {:?}", fence)))
    }

    unsafe fn wait_for_fence(&self, fence: Fence, _timeout_ns: u64) -> Result<bool, DeviceError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let signaled = state
            .fences
            .get_mut(&fence)
            .unwrap_or_else(|| panic!("Unknown fence {:?}", fence));
        if !*signaled && !state.hang && state.held.remove(&fence) {
            *signaled = true;
        }
        Ok(*signaled)
    }

    unsafe fn queue_submit(
        &self,
        queue: Queue,
        submissions: &[Submission<'_, Self>],
        fence: Option<Fence>,
    ) -> Result<(), DeviceError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let batch = state.batches;
        state.batches += 1;

        for submission in submissions {
            for buffer in submission.command_buffers {
                let info = state
                    .buffers
                    .get(buffer)
                    .unwrap_or_else(|| panic!("Unknown buffer {:?}", buffer));
                assert!(!info.recording, "Buffer {:?} submitted while recording", buffer);
                let family = state.pools[&info.pool].0;
                assert_eq!(family, queue.family, "Buffer {:?} submitted to foreign family", buffer);
            }
            for (semaphore, _) in submission.waits {
                assert!(state.semaphores.contains(semaphore), "Unknown semaphore {:?}", semaphore);
            }
            for semaphore in submission.signals {
                assert!(state.semaphores.contains(semaphore), "Unknown semaphore {:?}", semaphore);
            }

            state.submits.push(SubmitRecord {
                batch,
                queue,
                waits: submission.waits.to_vec(),
                command_buffers: submission.command_buffers.to_vec(),
                signals: submission.signals.to_vec(),
                fence,
            });
        }

        if let Some(fence) = fence {
            let signaled = state
                .fences
                .get_mut(&fence)
                .unwrap_or_else(|| panic!("Unknown fence {:?}", fence));
            assert!(!*signaled, "Fence {:?} submitted while signaled", fence);
            if state.hold_fences {
                state.held.insert(fence);
            } else {
                *signaled = true;
            }
        }

        Ok(())
    }

    unsafe fn cmd_pipeline_barrier(
        &self,
        buffer: CommandBuffer,
        buffer_barriers: &[BufferBarrier<Buffer>],
        image_barriers: &[ImageBarrier<Image>],
    ) {
        let mut state = self.state.lock();
        let recording = state.buffers.get(&buffer).map_or(false, |info| info.recording);
        assert!(recording, "Barrier recorded into {:?} outside recording", buffer);
        state.barriers.push(BarrierRecord {
            command_buffer: buffer,
            buffers: buffer_barriers.to_vec(),
            images: image_barriers.to_vec(),
        });
    }
}
