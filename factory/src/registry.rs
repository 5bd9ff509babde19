use {
    gpucmd_core::{vk, Device, ResourceId, SubresourceRange},
    std::collections::HashMap,
};

/// What a registered resource is.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""), Clone(bound = ""), Copy(bound = ""))]
pub enum ResourceKind<D: Device> {
    /// Buffer.
    Buffer {
        /// Raw buffer.
        raw: D::Buffer,

        /// Size in bytes.
        size: u64,
    },

    /// Image.
    Image {
        /// Raw image.
        raw: D::Image,

        /// Whole image.
        range: SubresourceRange,

        /// Layout the image is in while shaders read it.
        shader_layout: vk::ImageLayout,
    },
}

/// Registered resource.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Registered<D: Device> {
    name: String,
    kind: ResourceKind<D>,
}

impl<D> Registered<D>
where
    D: Device,
{
    /// Name the resource was registered with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind and raw handle.
    pub fn kind(&self) -> ResourceKind<D> {
        self.kind
    }

    /// Check if the resource is an image.
    pub fn is_image(&self) -> bool {
        match self.kind {
            ResourceKind::Image { .. } => true,
            ResourceKind::Buffer { .. } => false,
        }
    }
}

/// Resources alive on the device.
/// Assigns the ids the tracker knows them by.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""), Default(bound = ""))]
pub struct ResourceRegistry<D: Device> {
    resources: HashMap<ResourceId, Registered<D>>,
    next: u64,
}

impl<D> ResourceRegistry<D>
where
    D: Device,
{
    /// Create empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, name: &str, kind: ResourceKind<D>) -> ResourceId {
        self.next += 1;
        let id = ResourceId(self.next);
        log::trace!("Registered '{}' as {:?}", name, id);
        self.resources.insert(
            id,
            Registered {
                name: name.to_owned(),
                kind,
            },
        );
        id
    }

    /// Register buffer.
    pub fn register_buffer(&mut self, name: &str, raw: D::Buffer, size: u64) -> ResourceId {
        self.insert(name, ResourceKind::Buffer { raw, size })
    }

    /// Register image.
    pub fn register_image(
        &mut self,
        name: &str,
        raw: D::Image,
        aspect: vk::ImageAspectFlags,
        levels: u32,
        layers: u32,
        shader_layout: vk::ImageLayout,
    ) -> ResourceId {
        self.insert(
            name,
            ResourceKind::Image {
                raw,
                range: SubresourceRange {
                    aspect,
                    levels,
                    layers,
                },
                shader_layout,
            },
        )
    }

    /// Forget resource.
    pub fn unregister(&mut self, id: ResourceId) -> Option<Registered<D>> {
        self.resources.remove(&id)
    }

    /// Get resource.
    pub fn get(&self, id: ResourceId) -> Option<&Registered<D>> {
        self.resources.get(&id)
    }

    /// Check if resource is registered.
    pub fn contains(&self, id: ResourceId) -> bool {
        self.resources.contains_key(&id)
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if no resource is registered.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Report every resource still registered as leaked.
    /// Returns number of leaks.
    pub fn report_leaks(&self) -> usize {
        for (id, resource) in &self.resources {
            log::warn!("Resource '{}' {:?} leaked", resource.name, id);
        }
        self.resources.len()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        gpucmd_core::empty::{Buffer, EmptyDevice, Image},
    };

    #[test]
    fn ids_are_unique() {
        let mut registry = ResourceRegistry::<EmptyDevice>::new();
        let buffer = registry.register_buffer("vertices", Buffer(1), 1024);
        let image = registry.register_image(
            "albedo",
            Image(2),
            vk::ImageAspectFlags::COLOR,
            4,
            1,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        );
        assert_ne!(buffer, image);
        assert!(!registry.get(buffer).unwrap().is_image());
        assert!(registry.get(image).unwrap().is_image());

        registry.unregister(buffer);
        assert!(!registry.contains(buffer));
        let again = registry.register_buffer("vertices", Buffer(1), 1024);
        assert_ne!(again, buffer);
        assert_eq!(registry.report_leaks(), 2);
    }
}
