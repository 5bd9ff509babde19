//! CommandPool module docs.

use {
    crate::buffer::BufferKind,
    gpucmd_core::{Device, DeviceError, FamilyId},
};

/// Simple pool wrapper.
/// Remembers family and the kind of buffers it allocates.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct CommandPool<D: Device> {
    raw: D::CommandPool,
    family: FamilyId,
    kind: BufferKind,
    relevant: relevant::Relevant,
}

impl<D> CommandPool<D>
where
    D: Device,
{
    /// Create command pool for buffers of `kind` associated with the family.
    /// Command buffers created from the pool could be submitted to the queues of the family.
    pub fn create(device: &D, family: FamilyId, kind: BufferKind) -> Result<Self, DeviceError> {
        let raw = unsafe { device.create_command_pool(family, kind.pool_flags()) }.map_err(|err| {
            log::error!("Failed to create {:?} command pool for {:?}: {}", kind, family, err);
            err
        })?;
        log::trace!("Created {:?} command pool {:?} for {:?}", kind, raw, family);
        Ok(CommandPool {
            raw,
            family,
            kind,
            relevant: relevant::Relevant,
        })
    }

    /// Get raw pool.
    pub fn raw(&self) -> D::CommandPool {
        self.raw
    }

    /// Family of the pool.
    pub fn family(&self) -> FamilyId {
        self.family
    }

    /// Kind of buffers the pool allocates.
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Allocate a primary buffer.
    pub fn allocate(&self, device: &D) -> Result<D::CommandBuffer, DeviceError> {
        unsafe { device.allocate_command_buffer(self.raw) }.map_err(|err| {
            log::error!("Failed to allocate command buffer from {:?}: {}", self.raw, err);
            err
        })
    }

    /// Free buffer.
    ///
    /// # Safety
    ///
    /// Buffer must be allocated from this pool and must not be pending execution.
    pub unsafe fn free(&self, device: &D, buffer: D::CommandBuffer) {
        device.free_command_buffer(self.raw, buffer);
    }

    /// Dispose of command pool.
    ///
    /// # Safety
    ///
    /// All buffers allocated from this pool must be [freed](#method.free).
    pub unsafe fn dispose(self, device: &D) {
        device.destroy_command_pool(self.raw);
        self.relevant.dispose();
    }
}

/// Three pools of one queue function.
/// One per `BufferKind`.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct PoolSet<D: Device> {
    temp: CommandPool<D>,
    one_time: CommandPool<D>,
    rerecordable: CommandPool<D>,
}

impl<D> PoolSet<D>
where
    D: Device,
{
    /// Create all pools for the family.
    /// Already created pools are destroyed if one fails.
    pub fn create(device: &D, family: FamilyId) -> Result<Self, DeviceError> {
        let temp = CommandPool::create(device, family, BufferKind::Temp)?;
        let one_time = match CommandPool::create(device, family, BufferKind::OneTime) {
            Ok(pool) => pool,
            Err(err) => {
                unsafe { temp.dispose(device) };
                return Err(err);
            }
        };
        let rerecordable = match CommandPool::create(device, family, BufferKind::Rerecordable) {
            Ok(pool) => pool,
            Err(err) => {
                unsafe {
                    temp.dispose(device);
                    one_time.dispose(device);
                }
                return Err(err);
            }
        };
        Ok(PoolSet {
            temp,
            one_time,
            rerecordable,
        })
    }

    /// Pool for buffers of `kind`.
    pub fn pool(&self, kind: BufferKind) -> &CommandPool<D> {
        match kind {
            BufferKind::Temp => &self.temp,
            BufferKind::OneTime => &self.one_time,
            BufferKind::Rerecordable => &self.rerecordable,
        }
    }

    /// Dispose of all pools.
    ///
    /// # Safety
    ///
    /// All buffers allocated from the pools must be freed.
    pub unsafe fn dispose(self, device: &D) {
        self.temp.dispose(device);
        self.one_time.dispose(device);
        self.rerecordable.dispose(device);
    }
}
