use {crate::{vk, FamilyId}, std::ops::Range};

/// Subresource range of an image barrier.
/// Always starts at the first mip level and the first layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubresourceRange {
    /// Aspects covered.
    pub aspect: vk::ImageAspectFlags,

    /// Number of mip levels.
    pub levels: u32,

    /// Number of array layers.
    pub layers: u32,
}

impl Default for SubresourceRange {
    fn default() -> Self {
        SubresourceRange {
            aspect: vk::ImageAspectFlags::COLOR,
            levels: 1,
            layers: 1,
        }
    }
}

/// Whole-buffer memory barrier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferBarrier<B> {
    /// Buffer the barrier controls.
    pub target: B,

    /// `Some` for queue ownership transfer. Or `None`
    pub families: Option<Range<FamilyId>>,

    /// Access and stage transition.
    pub states: Range<(vk::AccessFlags2, vk::PipelineStageFlags2)>,
}

/// Image memory barrier with optional layout transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBarrier<I> {
    /// Image the barrier controls.
    pub target: I,

    /// Section of the image the barrier applies to.
    pub range: SubresourceRange,

    /// `Some` for queue ownership transfer. Or `None`
    pub families: Option<Range<FamilyId>>,

    /// Access and stage transition.
    pub states: Range<(vk::AccessFlags2, vk::PipelineStageFlags2)>,

    /// Layout transition. Equal ends mean no transition.
    pub layouts: Range<vk::ImageLayout>,
}

impl<I> ImageBarrier<I> {
    /// Check if the barrier changes layout or owner, or orders any access.
    pub fn is_noop(&self) -> bool {
        self.layouts.start == self.layouts.end
            && self.families.as_ref().map_or(true, |f| f.start == f.end)
            && self.states.start.0.is_empty()
            && self.states.start.1.is_empty()
    }
}
