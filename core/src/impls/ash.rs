//! Vulkan implementation on top of `ash`.
//!
//! Requires Vulkan 1.3 or `VK_KHR_synchronization2`:
//! submission and barriers go through `vkQueueSubmit2` and `vkCmdPipelineBarrier2`.

use {
    crate::{
        vk, BufferBarrier, Device, DeviceError, FamilyId, ImageBarrier, Submission,
    },
    smallvec::SmallVec,
};

/// `ash::Device` with the queue family properties it was created with.
#[derive(derivative::Derivative)]
#[derivative(Debug)]
pub struct AshDevice {
    #[derivative(Debug = "ignore")]
    raw: ::ash::Device,
    families: Vec<vk::QueueFamilyProperties>,
}

impl AshDevice {
    /// Wrap raw device.
    ///
    /// # Safety
    ///
    /// `families` must be the properties returned by the physical device `raw` was created from.
    /// `raw` must have `synchronization2` enabled.
    pub unsafe fn new(raw: ::ash::Device, families: Vec<vk::QueueFamilyProperties>) -> Self {
        AshDevice { raw, families }
    }

    /// Get raw device.
    pub fn raw(&self) -> &::ash::Device {
        &self.raw
    }
}

fn family_index(families: &Option<std::ops::Range<FamilyId>>) -> (u32, u32) {
    match families {
        Some(families) => (families.start.index(), families.end.index()),
        None => (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED),
    }
}

impl Device for AshDevice {
    type CommandPool = vk::CommandPool;
    type CommandBuffer = vk::CommandBuffer;
    type Semaphore = vk::Semaphore;
    type Fence = vk::Fence;
    type Queue = vk::Queue;
    type Buffer = vk::Buffer;
    type Image = vk::Image;

    fn queue_families(&self) -> &[vk::QueueFamilyProperties] {
        &self.families
    }

    unsafe fn get_queue(&self, family: FamilyId, index: u32) -> vk::Queue {
        self.raw.get_device_queue(family.index(), index)
    }

    unsafe fn create_command_pool(
        &self,
        family: FamilyId,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<vk::CommandPool, DeviceError> {
        let info = vk::CommandPoolCreateInfo::default()
            .flags(flags)
            .queue_family_index(family.index());
        Ok(self.raw.create_command_pool(&info, None)?)
    }

    unsafe fn destroy_command_pool(&self, pool: vk::CommandPool) {
        self.raw.destroy_command_pool(pool, None);
    }

    unsafe fn allocate_command_buffer(
        &self,
        pool: vk::CommandPool,
    ) -> Result<vk::CommandBuffer, DeviceError> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = self.raw.allocate_command_buffers(&info)?;
        buffers
            .into_iter()
            .next()
            .ok_or(DeviceError::Other(vk::Result::ERROR_UNKNOWN))
    }

    unsafe fn free_command_buffer(&self, pool: vk::CommandPool, buffer: vk::CommandBuffer) {
        self.raw.free_command_buffers(pool, &[buffer]);
    }

    unsafe fn begin_command_buffer(
        &self,
        buffer: vk::CommandBuffer,
        usage: vk::CommandBufferUsageFlags,
    ) -> Result<(), DeviceError> {
        let info = vk::CommandBufferBeginInfo::default().flags(usage);
        Ok(self.raw.begin_command_buffer(buffer, &info)?)
    }

    unsafe fn end_command_buffer(&self, buffer: vk::CommandBuffer) -> Result<(), DeviceError> {
        Ok(self.raw.end_command_buffer(buffer)?)
    }

    unsafe fn create_semaphore(&self) -> Result<vk::Semaphore, DeviceError> {
        Ok(self
            .raw
            .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)?)
    }

    unsafe fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.raw.destroy_semaphore(semaphore, None);
    }

    unsafe fn create_fence(&self, signaled: bool) -> Result<vk::Fence, DeviceError> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        Ok(self
            .raw
            .create_fence(&vk::FenceCreateInfo::default().flags(flags), None)?)
    }

    unsafe fn destroy_fence(&self, fence: vk::Fence) {
        self.raw.destroy_fence(fence, None);
    }

    unsafe fn reset_fence(&self, fence: vk::Fence) -> Result<(), DeviceError> {
        Ok(self.raw.reset_fences(&[fence])?)
    }

    unsafe fn get_fence_status(&self, fence: vk::Fence) -> Result<bool, DeviceError> {
        Ok(self.raw.get_fence_status(fence)?)
    }

    unsafe fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> Result<bool, DeviceError> {
        match self.raw.wait_for_fences(&[fence], true, timeout_ns) {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    unsafe fn queue_submit(
        &self,
        queue: vk::Queue,
        submissions: &[Submission<'_, Self>],
        fence: Option<vk::Fence>,
    ) -> Result<(), DeviceError> {
        let waits: Vec<SmallVec<[vk::SemaphoreSubmitInfo<'_>; 8]>> = submissions
            .iter()
            .map(|submission| {
                submission
                    .waits
                    .iter()
                    .map(|&(semaphore, stages)| {
                        vk::SemaphoreSubmitInfo::default()
                            .semaphore(semaphore)
                            .stage_mask(stages)
                    })
                    .collect()
            })
            .collect();

        let buffers: Vec<SmallVec<[vk::CommandBufferSubmitInfo<'_>; 8]>> = submissions
            .iter()
            .map(|submission| {
                submission
                    .command_buffers
                    .iter()
                    .map(|&buffer| vk::CommandBufferSubmitInfo::default().command_buffer(buffer))
                    .collect()
            })
            .collect();

        let signals: Vec<SmallVec<[vk::SemaphoreSubmitInfo<'_>; 4]>> = submissions
            .iter()
            .map(|submission| {
                submission
                    .signals
                    .iter()
                    .map(|&semaphore| {
                        vk::SemaphoreSubmitInfo::default()
                            .semaphore(semaphore)
                            .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
                    })
                    .collect()
            })
            .collect();

        let infos: Vec<vk::SubmitInfo2<'_>> = (0..submissions.len())
            .map(|index| {
                vk::SubmitInfo2::default()
                    .wait_semaphore_infos(&waits[index])
                    .command_buffer_infos(&buffers[index])
                    .signal_semaphore_infos(&signals[index])
            })
            .collect();

        Ok(self
            .raw
            .queue_submit2(queue, &infos, fence.unwrap_or_else(vk::Fence::null))?)
    }

    unsafe fn cmd_pipeline_barrier(
        &self,
        buffer: vk::CommandBuffer,
        buffer_barriers: &[BufferBarrier<vk::Buffer>],
        image_barriers: &[ImageBarrier<vk::Image>],
    ) {
        let buffers: SmallVec<[vk::BufferMemoryBarrier2<'_>; 16]> = buffer_barriers
            .iter()
            .map(|barrier| {
                let (src_family, dst_family) = family_index(&barrier.families);
                vk::BufferMemoryBarrier2::default()
                    .src_access_mask(barrier.states.start.0)
                    .src_stage_mask(barrier.states.start.1)
                    .dst_access_mask(barrier.states.end.0)
                    .dst_stage_mask(barrier.states.end.1)
                    .src_queue_family_index(src_family)
                    .dst_queue_family_index(dst_family)
                    .buffer(barrier.target)
                    .offset(0)
                    .size(vk::WHOLE_SIZE)
            })
            .collect();

        let images: SmallVec<[vk::ImageMemoryBarrier2<'_>; 16]> = image_barriers
            .iter()
            .map(|barrier| {
                let (src_family, dst_family) = family_index(&barrier.families);
                vk::ImageMemoryBarrier2::default()
                    .src_access_mask(barrier.states.start.0)
                    .src_stage_mask(barrier.states.start.1)
                    .dst_access_mask(barrier.states.end.0)
                    .dst_stage_mask(barrier.states.end.1)
                    .src_queue_family_index(src_family)
                    .dst_queue_family_index(dst_family)
                    .old_layout(barrier.layouts.start)
                    .new_layout(barrier.layouts.end)
                    .image(barrier.target)
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            .aspect_mask(barrier.range.aspect)
                            .base_mip_level(0)
                            .level_count(barrier.range.levels)
                            .base_array_layer(0)
                            .layer_count(barrier.range.layers),
                    )
            })
            .collect();

        let dependency = vk::DependencyInfo::default()
            .buffer_memory_barriers(&buffers)
            .image_memory_barriers(&images);
        self.raw.cmd_pipeline_barrier2(buffer, &dependency);
    }
}
