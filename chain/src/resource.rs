/// Kind tag of tracked resources.
///
/// Buffer-like and image-like resources share one access state machine.
/// Images additionally order layout transitions.
pub trait Resource: Copy + std::fmt::Debug + 'static {
    /// Whether resources of this kind have layouts.
    const IMAGE: bool;
}

/// Buffer resource type.
/// Texel buffers are buffers too.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Buffer;

impl Resource for Buffer {
    const IMAGE: bool = false;
}

/// Image resource type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Image;

impl Resource for Image {
    const IMAGE: bool = true;
}
