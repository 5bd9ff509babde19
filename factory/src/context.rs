use {
    crate::{
        barriers::{Barriers, ResourceBinding, Source},
        config::Config,
        error::ContextError,
        registry::{ResourceKind, ResourceRegistry},
    },
    gpucmd_chain::{AccessFlagsExt, Barrier, Buffer, Image, ResourceTracker},
    gpucmd_command::{
        CmdState, CommandBufferManager, CommandError, ExplicitSubmit, TrackedSubmit,
    },
    gpucmd_core::{
        vk, CmdId, Device, DeviceError, FamilyId, QueueFunction, QueuePriority, ResourceId,
    },
    smallvec::SmallVec,
    thread_profiler::profile_scope,
};

/// Command buffer being recorded into.
#[derive(Clone, Copy, Debug)]
struct Target<C> {
    raw: C,
    function: QueueFunction,
    family: FamilyId,
    flags: vk::QueueFlags,
}

/// Everything needed to record and submit command buffers on one device.
///
/// Owns the device, the command buffer manager, the resource tracker
/// and the registry of live resources.
/// Resource accesses are declared with [`cmd_barrier_resources`](#method.cmd_barrier_resources),
/// which records the barriers they need and the waits between command buffers.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct RecordingContext<D: Device> {
    device: D,
    manager: CommandBufferManager<D>,
    tracker: ResourceTracker,
    registry: ResourceRegistry<D>,
    config: Config,
    relevant: relevant::Relevant,
}

impl<D> RecordingContext<D>
where
    D: Device,
{
    /// Create context for the device.
    pub fn new(device: D, config: Config) -> Result<Self, CommandError> {
        let manager = CommandBufferManager::new(&device, config.manager())?;
        log::debug!("Recording context created with {:?}", config);
        Ok(RecordingContext {
            device,
            manager,
            tracker: ResourceTracker::new(),
            registry: ResourceRegistry::new(),
            config,
            relevant: relevant::Relevant,
        })
    }

    /// Get device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Get command buffer manager.
    pub fn manager(&self) -> &CommandBufferManager<D> {
        &self.manager
    }

    /// Get resource tracker.
    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    /// Get live resource registry.
    pub fn registry(&self) -> &ResourceRegistry<D> {
        &self.registry
    }

    /// Get config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register buffer for tracking.
    pub fn register_buffer(&mut self, name: &str, raw: D::Buffer, size: u64) -> ResourceId {
        self.registry.register_buffer(name, raw, size)
    }

    /// Register image for tracking.
    pub fn register_image(
        &mut self,
        name: &str,
        raw: D::Image,
        aspect: vk::ImageAspectFlags,
        levels: u32,
        layers: u32,
        shader_layout: vk::ImageLayout,
    ) -> ResourceId {
        self.registry
            .register_image(name, raw, aspect, levels, layers, shader_layout)
    }

    /// Stop tracking resource.
    /// Its tracker entries are dropped on the next frame.
    pub fn unregister(&mut self, resource: ResourceId) -> bool {
        self.registry.unregister(resource).is_some()
    }

    /// Start new frame.
    pub fn new_frame(&mut self) {
        profile_scope!("new_frame");
        if self.config.compact_on_new_frame {
            let registry = &self.registry;
            self.tracker.clear_unwanted(|resource| registry.contains(resource));
        }
    }

    /// Begin named command buffer.
    /// Reusable buffers may be recorded again after they finish.
    pub fn start_cmd(
        &mut self,
        name: &str,
        function: QueueFunction,
        reusable: bool,
    ) -> Result<CmdId, CommandError> {
        if reusable {
            let rerecorded = self
                .manager
                .get_cmd_buffer(name)
                .map_or(false, |cmd| self.manager.get_state(cmd) == CmdState::Recorded);
            let cmd = self.manager.begin_reusable(&self.device, name, function)?;
            if rerecorded {
                self.tracker.clear_cmd_deps(cmd);
            }
            Ok(cmd)
        } else {
            self.manager.begin_record_once(&self.device, name, function)
        }
    }

    /// Begin temporary command buffer. Free it with [`free_cmd`](#method.free_cmd).
    pub fn begin_temp(&mut self, name: &str, function: QueueFunction) -> Result<CmdId, CommandError> {
        self.manager.begin_temp(&self.device, name, function)
    }

    /// Finish recording.
    pub fn end_cmd(&mut self, cmd: CmdId) -> Result<(), CommandError> {
        self.manager.end(&self.device, cmd)
    }

    /// Submit with explicit synchronization.
    pub fn submit_cmd(
        &mut self,
        priority: QueuePriority,
        info: &ExplicitSubmit<'_, D>,
        fence: Option<D::Fence>,
    ) -> Result<Option<D::Fence>, CommandError> {
        self.manager.submit(&self.device, priority, info, fence)
    }

    /// Submit groups waiting on the command buffers they depend on.
    pub fn submit_tracked(
        &mut self,
        priority: QueuePriority,
        groups: &[TrackedSubmit<'_>],
    ) -> Result<(), CommandError> {
        self.manager
            .submit_tracked(&self.device, priority, groups, &mut self.tracker)
    }

    /// Submit groups and wait for them.
    pub fn submit_wait(
        &mut self,
        priority: QueuePriority,
        groups: &[TrackedSubmit<'_>],
    ) -> Result<(), CommandError> {
        self.manager
            .submit_wait(&self.device, priority, groups, &mut self.tracker)
    }

    /// Wait for command buffer to complete.
    pub fn finish_cmd(&mut self, cmd: CmdId) -> Result<(), CommandError> {
        self.manager.finish(&self.device, cmd, &mut self.tracker)
    }

    /// Wait for named command buffer to complete.
    pub fn finish_named(&mut self, name: &str) -> Result<(), CommandError> {
        self.manager
            .finish_named(&self.device, name, &mut self.tracker)
    }

    /// Free command buffer and drop it from the tracker.
    pub fn free_cmd(&mut self, cmd: CmdId) -> Result<(), CommandError> {
        self.manager.free(&self.device, cmd)?;
        self.tracker.clear_finished_cmd(cmd);
        Ok(())
    }

    /// Find command buffer by name.
    pub fn get_cmd_buffer(&self, name: &str) -> Option<CmdId> {
        self.manager.get_cmd_buffer(name)
    }

    /// Panics if the buffer is inside a render pass.
    fn recording_target(&self, cmd: CmdId) -> Result<Target<D::CommandBuffer>, ContextError> {
        let buffer = self
            .manager
            .command_buffer(cmd)
            .ok_or(CommandError::UnknownCommandBuffer(cmd))?;
        if buffer.state() == CmdState::RenderPass {
            log::error!("Barriers recorded into '{}' inside render pass", buffer.name());
            panic!("Barriers can not be recorded inside render pass");
        }
        gpucmd_core::gpucmd_slow_assert!(
            buffer.state().is_recording(),
            "Command buffer '{}' is not recording",
            buffer.name()
        );

        let family = buffer.family();
        Ok(Target {
            raw: buffer.raw(),
            function: buffer.function(),
            family,
            flags: self.device.queue_families()[family.index() as usize].queue_flags,
        })
    }

    /// Look up every resource before any of them is tracked.
    fn resolve(
        &self,
        resources: impl IntoIterator<Item = ResourceId>,
    ) -> Result<SmallVec<[ResourceKind<D>; 8]>, ContextError> {
        resources
            .into_iter()
            .map(|resource| {
                self.registry
                    .get(resource)
                    .map(|registered| registered.kind())
                    .ok_or(ContextError::UnknownResource(resource))
            })
            .collect()
    }

    /// Function and family of a command buffer that accessed a resource before.
    /// Freed buffers are assumed to be on `family`.
    fn accessor(&self, cmd: CmdId, family: FamilyId) -> (Option<QueueFunction>, FamilyId) {
        (
            self.manager.get_cmd_buffer_queue(cmd),
            self.manager.cmd_family(cmd).unwrap_or(family),
        )
    }

    /// Declare resource accesses of the commands about to be recorded into `cmd`.
    ///
    /// Records the barriers those accesses need with one command
    /// and registers waits on other command buffers.
    ///
    /// Panics inside render pass.
    pub fn cmd_barrier_resources(
        &mut self,
        cmd: CmdId,
        bindings: &[ResourceBinding],
    ) -> Result<(), ContextError> {
        profile_scope!("cmd_barrier_resources");

        let target = self.recording_target(cmd)?;
        let kinds = self.resolve(bindings.iter().map(|binding| binding.resource))?;
        let mut barriers = Barriers::<D>::new();

        for (binding, kind) in bindings.iter().zip(kinds) {
            let write = binding.access.is_write();

            let barrier = match (kind, write) {
                (ResourceKind::Buffer { .. }, false) => {
                    self.tracker
                        .read::<Buffer>(cmd, binding.resource, binding.stages)
                }
                (ResourceKind::Buffer { .. }, true) => {
                    self.tracker
                        .write::<Buffer>(cmd, binding.resource, binding.stages)
                }
                (ResourceKind::Image { .. }, false) => {
                    self.tracker
                        .read::<Image>(cmd, binding.resource, binding.stages)
                }
                (ResourceKind::Image { .. }, true) => {
                    self.tracker
                        .write::<Image>(cmd, binding.resource, binding.stages)
                }
            };

            let source = match barrier {
                None | Some(Barrier::Initial) => continue,
                Some(Barrier::Write { cmd: writer, stages }) => {
                    let (function, family) = self.accessor(writer, target.family);
                    Source::write(stages, function, family)
                }
                Some(Barrier::Reads {
                    cmds, all_stages, ..
                }) => {
                    let (function, family) = self.accessor(cmds[0], target.family);
                    let shader_layout = match kind {
                        ResourceKind::Image { shader_layout, .. } => shader_layout,
                        ResourceKind::Buffer { .. } => vk::ImageLayout::UNDEFINED,
                    };
                    Source::reads(all_stages, function, family, shader_layout)
                }
            };

            match kind {
                ResourceKind::Buffer { raw, .. } => {
                    barriers.add_buffer(
                        raw,
                        source.clamp(target.flags),
                        target.family,
                        binding.stages,
                        binding.access,
                    );
                }
                ResourceKind::Image { .. } if source.is_color_attachment() => continue,
                ResourceKind::Image { raw, range, .. } => {
                    barriers.add_image(
                        raw,
                        range,
                        source.clamp(target.flags),
                        target.family,
                        binding.stages,
                        binding.access,
                        binding.layout,
                    );
                }
            }

            if source.family != target.family {
                self.tracker.add_resource_to_queue_transfer(
                    target.function,
                    binding.resource,
                    binding.stages,
                    binding.access,
                    binding.layout,
                    true,
                );
            }
        }

        unsafe { barriers.record(&self.device, target.raw) };
        Ok(())
    }

    /// Enter render pass writing `color_attachments`.
    /// The render pass transitions them, so no barriers are recorded.
    pub fn begin_render_pass(
        &mut self,
        cmd: CmdId,
        color_attachments: &[ResourceId],
    ) -> Result<(), ContextError> {
        if self.manager.command_buffer(cmd).is_none() {
            return Err(CommandError::UnknownCommandBuffer(cmd).into());
        }
        self.resolve(color_attachments.iter().cloned())?;
        self.manager.start_render_pass(cmd)?;
        for &image in color_attachments {
            self.tracker.color_attachment_write(cmd, image);
        }
        Ok(())
    }

    /// Leave render pass.
    pub fn end_render_pass(&mut self, cmd: CmdId) -> Result<(), CommandError> {
        self.manager.end_render_pass(cmd)
    }

    /// Transition images to the general layout after all their known accesses
    /// so they can be handed over to an external consumer.
    ///
    /// The images are forgotten by the tracker.
    /// `cmd` waits on the command buffers that accessed them.
    pub fn transition_to_general(
        &mut self,
        cmd: CmdId,
        images: &[ResourceId],
    ) -> Result<(), ContextError> {
        let target = self.recording_target(cmd)?;
        let kinds = self.resolve(images.iter().cloned())?;
        let mut barriers = Barriers::<D>::new();
        let stages = vk::PipelineStageFlags2::ALL_COMMANDS;

        for (&image, kind) in images.iter().zip(kinds) {
            let (raw, range, shader_layout) = match kind {
                ResourceKind::Image {
                    raw,
                    range,
                    shader_layout,
                } => (raw, range, shader_layout),
                ResourceKind::Buffer { .. } => {
                    log::warn!("{:?} is not an image and has no layout", image);
                    continue;
                }
            };

            let source = match self.tracker.image_to_general_layout(image) {
                None => Source::undefined(target.family),
                Some(prior) => {
                    for &dependency in prior
                        .write
                        .iter()
                        .map(|(writer, _)| writer)
                        .chain(prior.reads.iter())
                    {
                        self.tracker.add_dependency(cmd, dependency, stages);
                    }
                    match (prior.reads.first(), prior.write) {
                        (Some(&reader), _) => {
                            let (function, family) = self.accessor(reader, target.family);
                            Source::reads(prior.all_read_stages, function, family, shader_layout)
                        }
                        (None, Some((writer, write_stages))) => {
                            let (function, family) = self.accessor(writer, target.family);
                            Source::write(write_stages, function, family)
                        }
                        (None, None) => Source::undefined(target.family),
                    }
                }
            };

            barriers.add_image(
                raw,
                range,
                source.clamp(target.flags),
                target.family,
                stages,
                vk::AccessFlags2::MEMORY_READ | vk::AccessFlags2::MEMORY_WRITE,
                vk::ImageLayout::GENERAL,
            );
        }

        unsafe { barriers.record(&self.device, target.raw) };
        Ok(())
    }

    /// Release ownership of resources last used by the queue of `cmd` to the queue of `release_to`.
    /// Resources that stay in the same family are kept for a later release.
    /// Returns number of barriers recorded.
    pub fn release_queue_resources(
        &mut self,
        cmd: CmdId,
        release_to: QueueFunction,
    ) -> Result<usize, ContextError> {
        let target = self.recording_target(cmd)?;
        let family = self.manager.get_queue_family_idx(release_to);
        let mut barriers = Barriers::<D>::new();

        for (resource, release) in self.tracker.releases_from_queue(target.function) {
            if family == target.family {
                self.tracker.add_resource_to_queue_transfer(
                    target.function,
                    resource,
                    release.stages,
                    release.access,
                    release.layout,
                    true,
                );
                continue;
            }

            let kind = match self.registry.get(resource) {
                Some(registered) => registered.kind(),
                None => {
                    log::debug!("Released {:?} is not registered anymore", resource);
                    continue;
                }
            };
            let source = Source {
                stages: release.stages,
                access: release.access,
                layout: release.layout,
                family: target.family,
            };
            match kind {
                ResourceKind::Buffer { raw, .. } => barriers.release_buffer(raw, source, family),
                ResourceKind::Image { raw, range, .. } => {
                    barriers.release_image(raw, range, source, family)
                }
            }
        }

        let count = barriers.buffers().len() + barriers.images().len();
        unsafe { barriers.record(&self.device, target.raw) };
        Ok(count)
    }

    /// Finish every command buffer that still accesses the resource.
    pub fn wait_on_res_dep_cmds(&mut self, resource: ResourceId) -> Result<(), CommandError> {
        for cmd in self.tracker.cmd_buffer_resource_deps(resource) {
            if self.manager.command_buffer(cmd).is_some() {
                self.manager.finish(&self.device, cmd, &mut self.tracker)?;
            }
        }
        Ok(())
    }

    /// Check if some command buffer accessing the resource is still executing.
    pub fn has_cmds_using_resource(&self, resource: ResourceId) -> Result<bool, DeviceError> {
        for cmd in self.tracker.cmd_buffer_resource_deps(resource) {
            if !self.manager.is_cmd_finished(&self.device, cmd)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Wait for every submitted command buffer.
    pub fn flush_all_commands(&mut self) -> Result<(), CommandError> {
        self.manager
            .finish_all_submitted(&self.device, &mut self.tracker)
    }

    /// Report leaked resources, finish and free all command buffers.
    /// Returns the device.
    pub fn dispose(self) -> D {
        let leaked = self.registry.report_leaks();
        if leaked > 0 {
            log::warn!("{} resources leaked at dispose", leaked);
        }
        let mut tracker = self.tracker;
        self.manager.dispose(&self.device, &mut tracker);
        self.relevant.dispose();
        self.device
    }
}
