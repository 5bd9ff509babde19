use {
    gpucmd_chain::clamp_to_queue,
    gpucmd_core::{
        vk, BufferBarrier, Device, FamilyId, ImageBarrier, QueueFunction, ResourceId,
        SubresourceRange,
    },
    smallvec::SmallVec,
    std::ops::Range,
};

/// Access of a resource by the commands about to be recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceBinding {
    /// Resource accessed.
    pub resource: ResourceId,

    /// Stages that access it. Writes must use exactly one stage.
    pub stages: vk::PipelineStageFlags2,

    /// Access types. Any write bit makes the binding a write.
    pub access: vk::AccessFlags2,

    /// Layout images must be in. Ignored for buffers.
    pub layout: vk::ImageLayout,
}

impl ResourceBinding {
    /// Buffer access.
    pub fn buffer(
        resource: ResourceId,
        stages: vk::PipelineStageFlags2,
        access: vk::AccessFlags2,
    ) -> Self {
        ResourceBinding {
            resource,
            stages,
            access,
            layout: vk::ImageLayout::UNDEFINED,
        }
    }

    /// Image access.
    pub fn image(
        resource: ResourceId,
        stages: vk::PipelineStageFlags2,
        access: vk::AccessFlags2,
        layout: vk::ImageLayout,
    ) -> Self {
        ResourceBinding {
            resource,
            stages,
            access,
            layout,
        }
    }
}

/// Prior access a barrier orders the new one after.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Source {
    /// Stages of the prior access.
    pub stages: vk::PipelineStageFlags2,

    /// Prior access types.
    pub access: vk::AccessFlags2,

    /// Layout images were left in.
    pub layout: vk::ImageLayout,

    /// Family of the queue that performed the access.
    pub family: FamilyId,
}

fn is_transfer(stages: vk::PipelineStageFlags2, function: Option<QueueFunction>) -> bool {
    function == Some(QueueFunction::Transfer)
        || stages.intersects(
            vk::PipelineStageFlags2::TRANSFER
                | vk::PipelineStageFlags2::COPY
                | vk::PipelineStageFlags2::BLIT
                | vk::PipelineStageFlags2::CLEAR,
        )
}

impl Source {
    /// Prior write at `stages` by a buffer of `function`.
    pub fn write(
        stages: vk::PipelineStageFlags2,
        function: Option<QueueFunction>,
        family: FamilyId,
    ) -> Self {
        let (access, layout) = if stages == vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT {
            (
                vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            )
        } else if is_transfer(stages, function) {
            (
                vk::AccessFlags2::TRANSFER_WRITE,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            )
        } else {
            (vk::AccessFlags2::SHADER_WRITE, vk::ImageLayout::GENERAL)
        };
        Source {
            stages,
            access,
            layout,
            family,
        }
    }

    /// Prior reads at `stages`. `function` is the one of the first reader.
    pub fn reads(
        stages: vk::PipelineStageFlags2,
        function: Option<QueueFunction>,
        family: FamilyId,
        shader_layout: vk::ImageLayout,
    ) -> Self {
        let (access, layout) = if is_transfer(stages, function) {
            (
                vk::AccessFlags2::TRANSFER_READ,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            )
        } else {
            (vk::AccessFlags2::SHADER_READ, shader_layout)
        };
        Source {
            stages,
            access,
            layout,
            family,
        }
    }

    /// Nothing accessed the resource before. Its content is undefined.
    pub fn undefined(family: FamilyId) -> Self {
        Source {
            stages: vk::PipelineStageFlags2::TOP_OF_PIPE,
            access: vk::AccessFlags2::empty(),
            layout: vk::ImageLayout::UNDEFINED,
            family,
        }
    }

    /// Check if the prior access was a render pass writing a color attachment.
    pub fn is_color_attachment(&self) -> bool {
        self.stages == vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT
            && self.access == vk::AccessFlags2::COLOR_ATTACHMENT_WRITE
    }

    /// Drop stages and access the queue with `flags` can't perform.
    pub fn clamp(self, flags: vk::QueueFlags) -> Self {
        let (stages, access) = clamp_to_queue(self.stages, self.access, flags);
        Source {
            stages,
            access,
            ..self
        }
    }

    fn families(&self, family: FamilyId) -> Option<Range<FamilyId>> {
        if self.family == family {
            None
        } else {
            Some(self.family..family)
        }
    }
}

/// Barriers collected for one pipeline barrier command.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""), Default(bound = ""))]
pub struct Barriers<D: Device> {
    buffers: SmallVec<[BufferBarrier<D::Buffer>; 8]>,
    images: SmallVec<[ImageBarrier<D::Image>; 8]>,
}

impl<D> Barriers<D>
where
    D: Device,
{
    /// No barriers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Order access of a buffer on the queue of `family` after `source`.
    pub fn add_buffer(
        &mut self,
        target: D::Buffer,
        source: Source,
        family: FamilyId,
        stages: vk::PipelineStageFlags2,
        access: vk::AccessFlags2,
    ) {
        let barrier = BufferBarrier {
            target,
            families: source.families(family),
            states: (source.access, source.stages)..(access, stages),
        };
        log::trace!("Buffer barrier {:?}", barrier);
        self.buffers.push(barrier);
    }

    /// Order access of an image on the queue of `family` after `source`
    /// and transition it to `layout`.
    /// Does nothing if there is nothing to order or transition.
    pub fn add_image(
        &mut self,
        target: D::Image,
        range: SubresourceRange,
        source: Source,
        family: FamilyId,
        stages: vk::PipelineStageFlags2,
        access: vk::AccessFlags2,
        layout: vk::ImageLayout,
    ) {
        let barrier = ImageBarrier {
            target,
            range,
            families: source.families(family),
            states: (source.access, source.stages)..(access, stages),
            layouts: source.layout..layout,
        };
        if barrier.is_noop() {
            return;
        }
        log::trace!("Image barrier {:?}", barrier);
        self.images.push(barrier);
    }

    /// Release ownership of a buffer from the queue of `source` to `family`.
    pub fn release_buffer(&mut self, target: D::Buffer, source: Source, family: FamilyId) {
        self.add_buffer(
            target,
            source,
            family,
            vk::PipelineStageFlags2::NONE,
            vk::AccessFlags2::empty(),
        );
    }

    /// Release ownership of an image from the queue of `source` to `family`.
    /// The layout stays as `source` left it.
    pub fn release_image(
        &mut self,
        target: D::Image,
        range: SubresourceRange,
        source: Source,
        family: FamilyId,
    ) {
        self.add_image(
            target,
            range,
            source,
            family,
            vk::PipelineStageFlags2::NONE,
            vk::AccessFlags2::empty(),
            source.layout,
        );
    }

    /// Check if nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty() && self.images.is_empty()
    }

    /// Collected buffer barriers.
    pub fn buffers(&self) -> &[BufferBarrier<D::Buffer>] {
        &self.buffers
    }

    /// Collected image barriers.
    pub fn images(&self) -> &[ImageBarrier<D::Image>] {
        &self.images
    }

    /// Record all collected barriers with one command.
    /// Does nothing if none were collected.
    ///
    /// # Safety
    ///
    /// `buffer` must be recording and every target must be alive.
    pub unsafe fn record(&self, device: &D, buffer: D::CommandBuffer) {
        if self.is_empty() {
            return;
        }
        device.cmd_pipeline_barrier(buffer, &self.buffers, &self.images);
    }
}
