use gpucmd_core::vk::{AccessFlags2, PipelineStageFlags2, QueueFlags};

/// Stages any queue can execute.
const COMMON_STAGES: PipelineStageFlags2 = PipelineStageFlags2::from_raw(
    PipelineStageFlags2::TOP_OF_PIPE.as_raw()
        | PipelineStageFlags2::BOTTOM_OF_PIPE.as_raw()
        | PipelineStageFlags2::HOST.as_raw()
        | PipelineStageFlags2::ALL_COMMANDS.as_raw(),
);

/// Stages of the transfer pipeline.
const TRANSFER_STAGES: PipelineStageFlags2 = PipelineStageFlags2::from_raw(
    PipelineStageFlags2::TRANSFER.as_raw()
        | PipelineStageFlags2::COPY.as_raw()
        | PipelineStageFlags2::BLIT.as_raw()
        | PipelineStageFlags2::RESOLVE.as_raw()
        | PipelineStageFlags2::CLEAR.as_raw(),
);

/// Stages of the compute pipeline.
const COMPUTE_STAGES: PipelineStageFlags2 = PipelineStageFlags2::from_raw(
    PipelineStageFlags2::DRAW_INDIRECT.as_raw() | PipelineStageFlags2::COMPUTE_SHADER.as_raw(),
);

/// Stages of the graphics pipeline.
const GRAPHICS_STAGES: PipelineStageFlags2 = PipelineStageFlags2::from_raw(
    PipelineStageFlags2::DRAW_INDIRECT.as_raw()
        | PipelineStageFlags2::VERTEX_INPUT.as_raw()
        | PipelineStageFlags2::INDEX_INPUT.as_raw()
        | PipelineStageFlags2::VERTEX_ATTRIBUTE_INPUT.as_raw()
        | PipelineStageFlags2::VERTEX_SHADER.as_raw()
        | PipelineStageFlags2::TESSELLATION_CONTROL_SHADER.as_raw()
        | PipelineStageFlags2::TESSELLATION_EVALUATION_SHADER.as_raw()
        | PipelineStageFlags2::GEOMETRY_SHADER.as_raw()
        | PipelineStageFlags2::EARLY_FRAGMENT_TESTS.as_raw()
        | PipelineStageFlags2::FRAGMENT_SHADER.as_raw()
        | PipelineStageFlags2::LATE_FRAGMENT_TESTS.as_raw()
        | PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT.as_raw()
        | PipelineStageFlags2::ALL_GRAPHICS.as_raw(),
);

const COMMON_ACCESS: AccessFlags2 = AccessFlags2::from_raw(
    AccessFlags2::HOST_READ.as_raw()
        | AccessFlags2::HOST_WRITE.as_raw()
        | AccessFlags2::MEMORY_READ.as_raw()
        | AccessFlags2::MEMORY_WRITE.as_raw(),
);

const TRANSFER_ACCESS: AccessFlags2 = AccessFlags2::from_raw(
    AccessFlags2::TRANSFER_READ.as_raw() | AccessFlags2::TRANSFER_WRITE.as_raw(),
);

const SHADER_ACCESS: AccessFlags2 = AccessFlags2::from_raw(
    AccessFlags2::INDIRECT_COMMAND_READ.as_raw()
        | AccessFlags2::UNIFORM_READ.as_raw()
        | AccessFlags2::SHADER_READ.as_raw()
        | AccessFlags2::SHADER_WRITE.as_raw()
        | AccessFlags2::SHADER_SAMPLED_READ.as_raw()
        | AccessFlags2::SHADER_STORAGE_READ.as_raw()
        | AccessFlags2::SHADER_STORAGE_WRITE.as_raw(),
);

const GRAPHICS_ACCESS: AccessFlags2 = AccessFlags2::from_raw(
    AccessFlags2::INDEX_READ.as_raw()
        | AccessFlags2::VERTEX_ATTRIBUTE_READ.as_raw()
        | AccessFlags2::INPUT_ATTACHMENT_READ.as_raw()
        | AccessFlags2::COLOR_ATTACHMENT_READ.as_raw()
        | AccessFlags2::COLOR_ATTACHMENT_WRITE.as_raw()
        | AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ.as_raw()
        | AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw(),
);

/// Pipeline stages a queue of the family with `flags` can execute.
///
/// Graphics and compute queues implicitly support transfer.
pub fn supported_stages(flags: QueueFlags) -> PipelineStageFlags2 {
    let mut stages = COMMON_STAGES;
    if flags.intersects(QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER) {
        stages |= TRANSFER_STAGES;
    }
    if flags.contains(QueueFlags::COMPUTE) {
        stages |= COMPUTE_STAGES;
    }
    if flags.contains(QueueFlags::GRAPHICS) {
        stages |= GRAPHICS_STAGES | COMPUTE_STAGES;
    }
    stages
}

/// Access types a queue of the family with `flags` can perform.
pub fn supported_access(flags: QueueFlags) -> AccessFlags2 {
    let mut access = COMMON_ACCESS;
    if flags.intersects(QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER) {
        access |= TRANSFER_ACCESS;
    }
    if flags.intersects(QueueFlags::GRAPHICS | QueueFlags::COMPUTE) {
        access |= SHADER_ACCESS;
    }
    if flags.contains(QueueFlags::GRAPHICS) {
        access |= GRAPHICS_ACCESS;
    }
    access
}

/// Drop stages and access the queue can't perform.
/// Returns `TOP_OF_PIPE` if no stage is left.
pub fn clamp_to_queue(
    stages: PipelineStageFlags2,
    access: AccessFlags2,
    flags: QueueFlags,
) -> (PipelineStageFlags2, AccessFlags2) {
    let stages = stages & supported_stages(flags);
    let access = access & supported_access(flags);
    if stages.is_empty() {
        (PipelineStageFlags2::TOP_OF_PIPE, access)
    } else {
        (stages, access)
    }
}
