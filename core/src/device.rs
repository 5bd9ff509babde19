//! Device module docs.

use {
    crate::{vk, BufferBarrier, DeviceError, FamilyId, ImageBarrier, Submission},
    std::{fmt::Debug, hash::Hash},
};

/// Abstract logical device.
///
/// It defines everything the command layer needs from the graphics API binding:
/// pools and buffers, semaphores and fences, queues and the submit primitive.
/// Handles are plain copyable values. Ownership is tracked by the callers.
///
/// # Safety
///
/// All `unsafe` methods follow the rules of the underlying API.
/// Handles passed in must have been created by the same device and not destroyed yet.
pub trait Device: Debug + Sized {
    /// Command pool handle.
    type CommandPool: Copy + Debug + Eq + Hash;

    /// Command buffer handle.
    type CommandBuffer: Copy + Debug + Eq + Hash;

    /// Binary semaphore handle.
    type Semaphore: Copy + Debug + Eq + Hash;

    /// Fence handle.
    type Fence: Copy + Debug + Eq + Hash;

    /// Queue handle.
    type Queue: Copy + Debug + Eq + Hash;

    /// Buffer handle. Only used as barrier target.
    type Buffer: Copy + Debug + Eq + Hash;

    /// Image handle. Only used as barrier target.
    type Image: Copy + Debug + Eq + Hash;

    /// Properties of the queue families the device was created with.
    /// Index in the slice is the family index.
    fn queue_families(&self) -> &[vk::QueueFamilyProperties];

    /// Fetch queue of the family.
    unsafe fn get_queue(&self, family: FamilyId, index: u32) -> Self::Queue;

    /// Create command pool for the family.
    unsafe fn create_command_pool(
        &self,
        family: FamilyId,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<Self::CommandPool, DeviceError>;

    /// Destroy command pool. All buffers allocated from it must be freed.
    unsafe fn destroy_command_pool(&self, pool: Self::CommandPool);

    /// Allocate one primary command buffer from the pool.
    unsafe fn allocate_command_buffer(
        &self,
        pool: Self::CommandPool,
    ) -> Result<Self::CommandBuffer, DeviceError>;

    /// Free command buffer back to the pool it was allocated from.
    unsafe fn free_command_buffer(&self, pool: Self::CommandPool, buffer: Self::CommandBuffer);

    /// Begin recording.
    unsafe fn begin_command_buffer(
        &self,
        buffer: Self::CommandBuffer,
        usage: vk::CommandBufferUsageFlags,
    ) -> Result<(), DeviceError>;

    /// Finish recording.
    unsafe fn end_command_buffer(&self, buffer: Self::CommandBuffer) -> Result<(), DeviceError>;

    /// Create binary semaphore.
    unsafe fn create_semaphore(&self) -> Result<Self::Semaphore, DeviceError>;

    /// Destroy semaphore.
    unsafe fn destroy_semaphore(&self, semaphore: Self::Semaphore);

    /// Create fence in signaled or unsignaled state.
    unsafe fn create_fence(&self, signaled: bool) -> Result<Self::Fence, DeviceError>;

    /// Destroy fence. It must not be in use by a pending submission.
    unsafe fn destroy_fence(&self, fence: Self::Fence);

    /// Reset fence to unsignaled state.
    unsafe fn reset_fence(&self, fence: Self::Fence) -> Result<(), DeviceError>;

    /// Check if fence is signaled without blocking.
    unsafe fn get_fence_status(&self, fence: Self::Fence) -> Result<bool, DeviceError>;

    /// Block until fence is signaled or timeout expires.
    /// Returns `false` on timeout.
    unsafe fn wait_for_fence(&self, fence: Self::Fence, timeout_ns: u64)
        -> Result<bool, DeviceError>;

    /// Submit batch of submissions to the queue.
    /// Fence, if any, is signaled when all of them complete.
    unsafe fn queue_submit(
        &self,
        queue: Self::Queue,
        submissions: &[Submission<'_, Self>],
        fence: Option<Self::Fence>,
    ) -> Result<(), DeviceError>;

    /// Record pipeline barrier into recording command buffer.
    unsafe fn cmd_pipeline_barrier(
        &self,
        buffer: Self::CommandBuffer,
        buffer_barriers: &[BufferBarrier<Self::Buffer>],
        image_barriers: &[ImageBarrier<Self::Image>],
    );
}
