use {
    gpucmd_core::{vk, QueueFunction, ResourceId},
    std::collections::HashMap,
};

/// State of a resource at the point its owning queue last used it.
/// Source half of a queue ownership release barrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Release {
    /// Stages that accessed the resource.
    pub stages: vk::PipelineStageFlags2,

    /// Accesses performed.
    pub access: vk::AccessFlags2,

    /// Layout the resource was left in. `UNDEFINED` for buffers.
    pub layout: vk::ImageLayout,
}

/// Per queue function maps of resources that may need their ownership released.
/// Only Compute, Graphics and Transfer have a map.
#[derive(Clone, Debug, Default)]
pub(crate) struct Releases {
    maps: [HashMap<ResourceId, Release>; 3],
}

impl Releases {
    fn map_index(function: QueueFunction) -> Option<usize> {
        match function {
            QueueFunction::Compute => Some(0),
            QueueFunction::Graphics => Some(1),
            QueueFunction::Transfer => Some(2),
            QueueFunction::Present | QueueFunction::Generic => None,
        }
    }

    pub(crate) fn add(
        &mut self,
        function: QueueFunction,
        resource: ResourceId,
        release: Release,
        reset: bool,
    ) {
        let index = match Self::map_index(function) {
            Some(index) => index,
            None => {
                log::debug!(
                    "{:?} has no release map. {:?} is not tracked for ownership transfer",
                    function,
                    resource
                );
                return;
            }
        };

        let map = &mut self.maps[index];
        match map.get_mut(&resource) {
            Some(entry) if !reset => {
                entry.stages |= release.stages;
                entry.access |= release.access;
                entry.layout = release.layout;
            }
            _ => {
                map.insert(resource, release);
            }
        }
    }

    pub(crate) fn drain(&mut self, function: QueueFunction) -> HashMap<ResourceId, Release> {
        match Self::map_index(function) {
            Some(index) => std::mem::take(&mut self.maps[index]),
            None => HashMap::new(),
        }
    }

    pub(crate) fn remove_resource(&mut self, resource: ResourceId) {
        for map in &mut self.maps {
            map.remove(&resource);
        }
    }

    pub(crate) fn retain(&mut self, mut f: impl FnMut(ResourceId) -> bool) {
        for map in &mut self.maps {
            map.retain(|&resource, _| f(resource));
        }
    }
}
