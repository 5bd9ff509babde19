use gpucmd_core::vk::AccessFlags2;

/// Read and write classification of access flags.
pub trait AccessFlagsExt {
    /// Check if any of the flags writes memory.
    /// Such access must be exclusive.
    fn is_write(&self) -> bool;

    /// Check if any of the flags reads memory.
    fn is_read(&self) -> bool;
}

impl AccessFlagsExt for AccessFlags2 {
    fn is_write(&self) -> bool {
        self.intersects(
            AccessFlags2::SHADER_WRITE
                | AccessFlags2::SHADER_STORAGE_WRITE
                | AccessFlags2::COLOR_ATTACHMENT_WRITE
                | AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE
                | AccessFlags2::TRANSFER_WRITE
                | AccessFlags2::HOST_WRITE
                | AccessFlags2::MEMORY_WRITE,
        )
    }

    fn is_read(&self) -> bool {
        self.intersects(
            AccessFlags2::INDIRECT_COMMAND_READ
                | AccessFlags2::INDEX_READ
                | AccessFlags2::VERTEX_ATTRIBUTE_READ
                | AccessFlags2::UNIFORM_READ
                | AccessFlags2::INPUT_ATTACHMENT_READ
                | AccessFlags2::SHADER_READ
                | AccessFlags2::SHADER_SAMPLED_READ
                | AccessFlags2::SHADER_STORAGE_READ
                | AccessFlags2::COLOR_ATTACHMENT_READ
                | AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ
                | AccessFlags2::TRANSFER_READ
                | AccessFlags2::HOST_READ
                | AccessFlags2::MEMORY_READ,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify() {
        assert!(AccessFlags2::TRANSFER_WRITE.is_write());
        assert!(!AccessFlags2::TRANSFER_WRITE.is_read());
        assert!(AccessFlags2::SHADER_SAMPLED_READ.is_read());
        assert!(!AccessFlags2::SHADER_SAMPLED_READ.is_write());
        let both = AccessFlags2::SHADER_READ | AccessFlags2::SHADER_WRITE;
        assert!(both.is_read() && both.is_write());
        assert!(!AccessFlags2::empty().is_write());
    }
}
