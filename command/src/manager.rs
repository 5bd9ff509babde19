//! Command buffer lifecycle, submission and completion.

use {
    crate::{
        buffer::{BufferKind, CmdState, CommandBuffer},
        error::CommandError,
        family::{select_family, FunctionQueues},
        fence::Fence,
        submit::{ExplicitSubmit, TrackedSubmit},
        sync::SyncPool,
    },
    gpucmd_chain::ResourceTracker,
    gpucmd_core::{
        vk, CmdId, Device, DeviceError, FamilyId, QueueFunction, QueuePriority, Submission,
    },
    slab::Slab,
    smallvec::SmallVec,
    std::collections::HashMap,
    thread_profiler::profile_scope,
};

/// Manager settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Leave one queue of each tier unused when a tier would get more than one.
    pub reserve_spare_queue: bool,

    /// How long `finish` waits for a completion fence.
    pub fence_timeout_ns: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            reserve_spare_queue: true,
            fence_timeout_ns: u64::MAX,
        }
    }
}

type Waits<D> = SmallVec<[(<D as Device>::Semaphore, vk::PipelineStageFlags2); 8]>;

fn add_wait<D: Device>(waits: &mut Waits<D>, semaphore: D::Semaphore, stages: vk::PipelineStageFlags2) {
    match waits.iter_mut().find(|(s, _)| *s == semaphore) {
        Some((_, existing)) => *existing |= stages,
        None => waits.push((semaphore, stages)),
    }
}

/// Owner of the command buffers of one device.
///
/// Buffers are named. Non-temporary buffers are found again by name on the next `begin`.
/// Every mutating operation takes `&mut self`, so one thread records at a time.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""))]
pub struct CommandBufferManager<D: Device> {
    generic: FunctionQueues<D>,
    dedicated: Vec<Option<FunctionQueues<D>>>,
    buffers: Slab<CommandBuffer<D>>,
    names: HashMap<String, CmdId>,
    sync: SyncPool<D>,
    next_generation: u32,
    config: ManagerConfig,
    relevant: relevant::Relevant,
}

impl<D> CommandBufferManager<D>
where
    D: Device,
{
    /// Select families, fetch queues and create pools for every queue function.
    /// Functions without a family of their own are served by `Generic`.
    pub fn new(device: &D, config: ManagerConfig) -> Result<Self, CommandError> {
        let families = device.queue_families();
        let generic_family = match select_family(families, QueueFunction::Generic) {
            Some(family) => family,
            None => {
                log::error!("No queue family can serve generic work");
                return Err(CommandError::NoQueueFamily);
            }
        };

        let create = |function, family: FamilyId| unsafe {
            FunctionQueues::new(
                device,
                function,
                family,
                families[family.index() as usize].queue_count,
                config.reserve_spare_queue,
            )
        };

        let generic = create(QueueFunction::Generic, generic_family)?;
        let mut dedicated: Vec<Option<FunctionQueues<D>>> = Vec::new();
        for &function in &QueueFunction::ALL {
            if function == QueueFunction::Generic {
                dedicated.push(None);
                continue;
            }
            match select_family(families, function) {
                Some(family) => match create(function, family) {
                    Ok(queues) => dedicated.push(Some(queues)),
                    Err(err) => {
                        unsafe {
                            for queues in dedicated.into_iter().flatten() {
                                queues.dispose(device);
                            }
                            generic.dispose(device);
                        }
                        return Err(err.into());
                    }
                },
                None => {
                    log::debug!("{:?} has no queue family. Served by Generic", function);
                    dedicated.push(None);
                }
            }
        }

        Ok(CommandBufferManager {
            generic,
            dedicated,
            buffers: Slab::new(),
            names: HashMap::new(),
            sync: SyncPool::new(),
            next_generation: 0,
            config,
            relevant: relevant::Relevant,
        })
    }

    /// Settings the manager was created with.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Function whose queues and pools serve `function`.
    pub fn resolve(&self, function: QueueFunction) -> QueueFunction {
        match self.dedicated.get(function.index()) {
            Some(Some(_)) => function,
            _ => QueueFunction::Generic,
        }
    }

    fn queues(&self, function: QueueFunction) -> &FunctionQueues<D> {
        self.dedicated
            .get(function.index())
            .and_then(Option::as_ref)
            .unwrap_or(&self.generic)
    }

    fn queues_mut(&mut self, function: QueueFunction) -> &mut FunctionQueues<D> {
        match self.dedicated.get_mut(function.index()).and_then(Option::as_mut) {
            Some(queues) => queues,
            None => &mut self.generic,
        }
    }

    /// Family that serves `function`.
    pub fn get_queue_family_idx(&self, function: QueueFunction) -> FamilyId {
        self.queues(function).family()
    }

    /// Get buffer record.
    pub fn command_buffer(&self, cmd: CmdId) -> Option<&CommandBuffer<D>> {
        self.buffers
            .get(cmd.index())
            .filter(|buffer| buffer.generation() == cmd.generation())
    }

    fn buffer(&self, cmd: CmdId) -> Result<&CommandBuffer<D>, CommandError> {
        self.command_buffer(cmd)
            .ok_or(CommandError::UnknownCommandBuffer(cmd))
    }

    fn buffer_mut(&mut self, cmd: CmdId) -> Result<&mut CommandBuffer<D>, CommandError> {
        self.buffers
            .get_mut(cmd.index())
            .filter(|buffer| buffer.generation() == cmd.generation())
            .ok_or(CommandError::UnknownCommandBuffer(cmd))
    }

    /// Find non-temporary buffer by name.
    pub fn get_cmd_buffer(&self, name: &str) -> Option<CmdId> {
        self.names.get(name).cloned()
    }

    /// Get state of the buffer.
    /// Unknown handles are `Idle`.
    pub fn get_state(&self, cmd: CmdId) -> CmdState {
        match self.command_buffer(cmd) {
            Some(buffer) => buffer.state(),
            None => {
                log::debug!("State of unknown command buffer {:?} requested", cmd);
                CmdState::Idle
            }
        }
    }

    /// Function the buffer was begun for.
    pub fn get_cmd_buffer_queue(&self, cmd: CmdId) -> Option<QueueFunction> {
        self.command_buffer(cmd).map(CommandBuffer::function)
    }

    /// Family the buffer was allocated for.
    pub fn cmd_family(&self, cmd: CmdId) -> Option<FamilyId> {
        self.command_buffer(cmd).map(CommandBuffer::family)
    }

    /// Get raw command buffer.
    pub fn raw(&self, cmd: CmdId) -> Option<D::CommandBuffer> {
        self.command_buffer(cmd).map(CommandBuffer::raw)
    }

    /// Check if the buffer is recording inside a render pass.
    pub fn is_in_render_pass(&self, cmd: CmdId) -> bool {
        self.get_state(cmd) == CmdState::RenderPass
    }

    /// Semaphore signaled by the group the buffer was submitted in.
    pub fn cmd_signal_semaphore(&self, cmd: CmdId) -> Option<D::Semaphore> {
        self.command_buffer(cmd)
            .and_then(CommandBuffer::sync)
            .and_then(|slot| self.sync.semaphore(slot))
    }

    /// Number of submission groups in flight.
    pub fn in_flight(&self) -> usize {
        self.sync.len()
    }

    fn allocate(
        &mut self,
        device: &D,
        name: &str,
        function: QueueFunction,
        kind: BufferKind,
    ) -> Result<CmdId, CommandError> {
        let pool_function = self.resolve(function);
        let queues = self.queues(function);
        let family = queues.family();
        let raw = queues.pools().pool(kind).allocate(device)?;

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let index = self.buffers.insert(CommandBuffer::new(
            name.to_owned(),
            raw,
            function,
            pool_function,
            family,
            kind,
            generation,
        ));
        let cmd = CmdId::new(index, generation);
        if !kind.is_temp() {
            self.names.insert(name.to_owned(), cmd);
        }
        log::trace!("Allocated {:?} command buffer '{}' {:?} for {:?}", kind, name, cmd, function);
        Ok(cmd)
    }

    fn begin(&mut self, device: &D, cmd: CmdId) -> Result<(), CommandError> {
        let buffer = self.buffer_mut(cmd)?;
        unsafe { device.begin_command_buffer(buffer.raw(), buffer.kind().usage()) }.map_err(
            |err| {
                log::error!("Failed to begin command buffer '{}': {}", buffer.name(), err);
                err
            },
        )?;
        buffer.set_state(CmdState::Recording);
        Ok(())
    }

    /// Begin ephemeral buffer.
    /// It is not entered into the name table. Free it when done.
    pub fn begin_temp(
        &mut self,
        device: &D,
        name: &str,
        function: QueueFunction,
    ) -> Result<CmdId, CommandError> {
        let cmd = self.allocate(device, name, function, BufferKind::Temp)?;
        self.begin(device, cmd)?;
        Ok(cmd)
    }

    /// Begin buffer that is recorded once and may be submitted many times.
    ///
    /// Panics if the named buffer is recorded already.
    pub fn begin_record_once(
        &mut self,
        device: &D,
        name: &str,
        function: QueueFunction,
    ) -> Result<CmdId, CommandError> {
        if let Some(cmd) = self.get_cmd_buffer(name) {
            match self.buffer(cmd)?.state() {
                CmdState::Recording | CmdState::RenderPass => {
                    log::warn!("Command buffer '{}' is already recording", name);
                }
                CmdState::Idle => self.begin(device, cmd)?,
                state => {
                    log::error!("One-time command buffer '{}' begun again in state {:?}", name, state);
                    panic!("One-time command buffer can not be recorded again");
                }
            }
            return Ok(cmd);
        }

        let cmd = self.allocate(device, name, function, BufferKind::OneTime)?;
        self.begin(device, cmd)?;
        Ok(cmd)
    }

    /// Begin buffer that is recorded again after each finish.
    ///
    /// Panics if the named buffer is still submitted.
    pub fn begin_reusable(
        &mut self,
        device: &D,
        name: &str,
        function: QueueFunction,
    ) -> Result<CmdId, CommandError> {
        if let Some(cmd) = self.get_cmd_buffer(name) {
            let buffer = self.buffer(cmd)?;
            match buffer.state() {
                CmdState::Submitted => {
                    log::error!("Command buffer '{}' begun while submitted", name);
                    panic!("Command buffer must be finished before recording");
                }
                CmdState::Recording | CmdState::RenderPass => {
                    log::warn!("Command buffer '{}' is already recording", name);
                }
                CmdState::Recorded if !buffer.kind().is_resettable() => {
                    log::error!("Command buffer '{}' of kind {:?} begun again", name, buffer.kind());
                    panic!("One-time command buffer can not be recorded again");
                }
                CmdState::Idle | CmdState::Recorded => self.begin(device, cmd)?,
            }
            return Ok(cmd);
        }

        let cmd = self.allocate(device, name, function, BufferKind::Rerecordable)?;
        self.begin(device, cmd)?;
        Ok(cmd)
    }

    /// Finish recording.
    ///
    /// Panics unless recording outside of a render pass.
    pub fn end(&mut self, device: &D, cmd: CmdId) -> Result<(), CommandError> {
        let buffer = self.buffer_mut(cmd)?;
        if buffer.state() != CmdState::Recording {
            log::error!(
                "Command buffer '{}' ended in state {:?}",
                buffer.name(),
                buffer.state()
            );
            panic!("Command buffer must be recording outside of a render pass");
        }
        unsafe { device.end_command_buffer(buffer.raw()) }.map_err(|err| {
            log::error!("Failed to end command buffer '{}': {}", buffer.name(), err);
            err
        })?;
        buffer.set_state(CmdState::Recorded);
        Ok(())
    }

    /// Enter render pass.
    /// Temporary buffers are not tracked.
    ///
    /// Panics if the buffer is not recording.
    pub fn start_render_pass(&mut self, cmd: CmdId) -> Result<(), CommandError> {
        let buffer = self.buffer_mut(cmd)?;
        if buffer.kind().is_temp() {
            return Ok(());
        }
        if buffer.state() != CmdState::Recording {
            log::error!(
                "Render pass started on command buffer '{}' in state {:?}",
                buffer.name(),
                buffer.state()
            );
            panic!("Command buffer must be recording");
        }
        buffer.set_state(CmdState::RenderPass);
        Ok(())
    }

    /// Leave render pass.
    /// Does nothing outside of a render pass.
    pub fn end_render_pass(&mut self, cmd: CmdId) -> Result<(), CommandError> {
        let buffer = self.buffer_mut(cmd)?;
        if buffer.state() == CmdState::RenderPass {
            buffer.set_state(CmdState::Recording);
        }
        Ok(())
    }

    /// Panics if any buffer is not `Recorded`, appears twice
    /// or if buffers are served by different functions.
    fn validate_submission(
        &self,
        cmds: impl Iterator<Item = CmdId>,
    ) -> Result<QueueFunction, CommandError> {
        let mut function = None;
        let mut seen: SmallVec<[CmdId; 16]> = SmallVec::new();
        for cmd in cmds {
            let buffer = self.buffer(cmd)?;
            if buffer.state() != CmdState::Recorded {
                log::error!(
                    "Command buffer '{}' submitted in state {:?}",
                    buffer.name(),
                    buffer.state()
                );
                panic!("Command buffer must be recorded");
            }
            if seen.contains(&cmd) {
                log::error!("Command buffer '{}' submitted twice", buffer.name());
                panic!("Command buffer can be submitted once per call");
            }
            seen.push(cmd);

            match function {
                None => function = Some(buffer.pool_function()),
                Some(function) if function != buffer.pool_function() => {
                    log::error!(
                        "Command buffer '{}' of {:?} submitted with {:?} buffers",
                        buffer.name(),
                        buffer.pool_function(),
                        function
                    );
                    panic!("Command buffers of one submission must share a queue");
                }
                Some(_) => {}
            }
        }
        Ok(function.unwrap_or(QueueFunction::Generic))
    }

    fn mark_submitted(&mut self, cmd: CmdId, slot: usize) {
        if let Some(buffer) = self.buffers.get_mut(cmd.index()) {
            buffer.set_state(CmdState::Submitted);
            buffer.set_sync(Some(slot));
        }
    }

    /// Submit with caller supplied waits and signals.
    ///
    /// `fence` is signaled on completion and stays owned by the caller.
    /// Without it the manager creates one. If only temporary buffers are submitted
    /// the created fence is returned and the caller takes ownership of it.
    ///
    /// Panics if any buffer is not recorded or buffers are served by different queues.
    pub fn submit(
        &mut self,
        device: &D,
        priority: QueuePriority,
        info: &ExplicitSubmit<'_, D>,
        fence: Option<D::Fence>,
    ) -> Result<Option<D::Fence>, CommandError> {
        profile_scope!("submit");

        if info.buffers.is_empty() {
            log::warn!("Nothing to submit");
            return Ok(None);
        }
        let function = self.validate_submission(info.buffers.iter().cloned())?;

        let raws: SmallVec<[D::CommandBuffer; 8]> = info
            .buffers
            .iter()
            .filter_map(|&cmd| self.raw(cmd))
            .collect();
        let tracked: SmallVec<[CmdId; 8]> = info
            .buffers
            .iter()
            .cloned()
            .filter(|&cmd| {
                self.command_buffer(cmd)
                    .map_or(false, |buffer| !buffer.kind().is_temp())
            })
            .collect();

        let mut fence = match fence {
            Some(raw) => Fence::external(raw),
            None => Fence::new(device)?,
        };

        let submission = Submission::new()
            .wait(info.waits)
            .submits(&raws)
            .signal(info.signals);
        let queue = self.queues_mut(function).next_queue(priority);
        if let Err(err) = unsafe { queue.submit(device, &[submission], Some(&mut fence)) } {
            log::error!("Failed to submit {} command buffers: {}", raws.len(), err);
            unsafe { fence.dispose(device) };
            return Err(err.into());
        }
        log::trace!("Submitted {:?} to {:?}", info.buffers, function);

        if tracked.is_empty() {
            if fence.is_owned() {
                return Ok(Some(fence.into_raw()));
            }
            return Ok(None);
        }

        let fence = self.sync.insert_fence(fence);
        let slot = self.sync.allocate(
            info.signals.first().cloned(),
            false,
            fence,
            tracked.len(),
            false,
        );
        for cmd in tracked {
            self.mark_submitted(cmd, slot);
        }
        Ok(None)
    }

    fn dependency_semaphore(&self, cmd: CmdId, dependency: CmdId) -> Result<D::Semaphore, CommandError> {
        let buffer = self
            .command_buffer(dependency)
            .ok_or(CommandError::DependencyNotSubmitted(cmd, dependency))?;
        match (buffer.state(), buffer.sync()) {
            (CmdState::Submitted, Some(slot)) => self
                .sync
                .semaphore(slot)
                .ok_or(CommandError::NoSignalSemaphore(dependency)),
            _ => Err(CommandError::DependencyNotSubmitted(cmd, dependency)),
        }
    }

    /// Submit groups waiting on the buffers the tracker recorded as dependencies.
    ///
    /// Each group signals a semaphore of its own. All groups share one completion fence
    /// and go to the queue in one batch. Dependencies must be submitted already.
    ///
    /// Panics if any buffer is not recorded or buffers are served by different queues.
    pub fn submit_tracked(
        &mut self,
        device: &D,
        priority: QueuePriority,
        groups: &[TrackedSubmit<'_>],
        tracker: &mut ResourceTracker,
    ) -> Result<(), CommandError> {
        profile_scope!("submit_tracked");

        let groups: SmallVec<[&TrackedSubmit<'_>; 4]> =
            groups.iter().filter(|group| !group.buffers.is_empty()).collect();
        if groups.is_empty() {
            log::warn!("Nothing to submit");
            return Ok(());
        }

        for group in &groups {
            for &cmd in group.buffers {
                if self.buffer(cmd)?.kind().is_temp() {
                    return Err(CommandError::TempBufferTracked(cmd));
                }
            }
        }
        let function = self.validate_submission(
            groups
                .iter()
                .flat_map(|group| group.buffers.iter().cloned()),
        )?;

        let mut waits: SmallVec<[Waits<D>; 4]> = SmallVec::new();
        let mut raws: SmallVec<[SmallVec<[D::CommandBuffer; 8]>; 4]> = SmallVec::new();
        for group in &groups {
            let mut group_waits = Waits::<D>::new();
            for &cmd in group.buffers {
                for &(dependency, stages) in tracker.cmd_buffer_deps(cmd) {
                    let semaphore = self.dependency_semaphore(cmd, dependency)?;
                    add_wait::<D>(&mut group_waits, semaphore, stages);
                }
            }
            for &dependency in group.wait_on {
                let semaphore = self.dependency_semaphore(group.buffers[0], dependency)?;
                add_wait::<D>(&mut group_waits, semaphore, vk::PipelineStageFlags2::TOP_OF_PIPE);
            }
            waits.push(group_waits);
            raws.push(group.buffers.iter().filter_map(|&cmd| self.raw(cmd)).collect());
        }

        let mut fence = Fence::new(device)?;
        let mut semaphores: SmallVec<[D::Semaphore; 4]> = SmallVec::new();
        for _ in &groups {
            match unsafe { device.create_semaphore() } {
                Ok(semaphore) => semaphores.push(semaphore),
                Err(err) => {
                    log::error!("Failed to create semaphore: {}", err);
                    unsafe {
                        for semaphore in semaphores {
                            device.destroy_semaphore(semaphore);
                        }
                        fence.dispose(device);
                    }
                    return Err(err.into());
                }
            }
        }

        let submissions: SmallVec<[Submission<'_, D>; 4]> = (0..groups.len())
            .map(|index| {
                Submission::new()
                    .wait(&waits[index])
                    .submits(&raws[index])
                    .signal(std::slice::from_ref(&semaphores[index]))
            })
            .collect();

        let queue = self.queues_mut(function).next_queue(priority);
        if let Err(err) = unsafe { queue.submit(device, &submissions, Some(&mut fence)) } {
            log::error!("Failed to submit {} tracked groups: {}", groups.len(), err);
            unsafe {
                for &semaphore in &semaphores {
                    device.destroy_semaphore(semaphore);
                }
                fence.dispose(device);
            }
            return Err(err.into());
        }

        let fence = self.sync.insert_fence(fence);
        for (group, &semaphore) in groups.iter().zip(&semaphores) {
            let slot = self
                .sync
                .allocate(Some(semaphore), true, fence, group.buffers.len(), true);
            for &cmd in group.buffers {
                self.mark_submitted(cmd, slot);
            }
            log::trace!("Submitted {:?} to {:?} in slot {}", group.buffers, function, slot);
        }
        Ok(())
    }

    /// Submit tracked groups and wait for them to complete.
    pub fn submit_wait(
        &mut self,
        device: &D,
        priority: QueuePriority,
        groups: &[TrackedSubmit<'_>],
        tracker: &mut ResourceTracker,
    ) -> Result<(), CommandError> {
        self.submit_tracked(device, priority, groups, tracker)?;
        for group in groups {
            for &cmd in group.buffers {
                self.finish(device, cmd, tracker)?;
            }
        }
        Ok(())
    }

    /// Wait for submitted buffer to complete and return it to `Recorded`.
    ///
    /// Buffers waiting on it are finished first. Its dependency edges are dropped after.
    /// Does nothing unless the buffer is submitted.
    /// On timeout the buffer stays submitted and `finish` can be retried.
    pub fn finish(
        &mut self,
        device: &D,
        cmd: CmdId,
        tracker: &mut ResourceTracker,
    ) -> Result<(), CommandError> {
        profile_scope!("finish");

        let buffer = self.buffer(cmd)?;
        if buffer.state() != CmdState::Submitted {
            return Ok(());
        }
        let slot = buffer.sync();

        for dependent in tracker.depending_cmd_buffers(cmd) {
            if self.command_buffer(dependent).is_some() {
                self.finish(device, dependent, tracker)?;
            }
        }
        if let Some(slot) = slot {
            self.sync.wait(device, slot, self.config.fence_timeout_ns)?;
        }

        let buffer = self.buffer_mut(cmd)?;
        buffer.set_state(CmdState::Recorded);
        buffer.set_sync(None);
        tracker.clear_finished_cmd(cmd);

        if let Some(slot) = slot {
            if self.sync.decrement(slot) == 0 {
                unsafe { self.sync.release(device, slot) };
            }
        }
        Ok(())
    }

    /// Finish buffer by name.
    pub fn finish_named(
        &mut self,
        device: &D,
        name: &str,
        tracker: &mut ResourceTracker,
    ) -> Result<(), CommandError> {
        match self.get_cmd_buffer(name) {
            Some(cmd) => self.finish(device, cmd, tracker),
            None => {
                log::debug!("Finish of unknown command buffer '{}'", name);
                Ok(())
            }
        }
    }

    /// Finish every submitted buffer.
    pub fn finish_all_submitted(
        &mut self,
        device: &D,
        tracker: &mut ResourceTracker,
    ) -> Result<(), CommandError> {
        let submitted: Vec<CmdId> = self
            .names
            .values()
            .cloned()
            .filter(|&cmd| self.get_state(cmd) == CmdState::Submitted)
            .collect();
        for cmd in submitted {
            self.finish(device, cmd, tracker)?;
        }
        Ok(())
    }

    /// Check without blocking that the buffer is not executing anymore.
    pub fn is_cmd_finished(&self, device: &D, cmd: CmdId) -> Result<bool, DeviceError> {
        match self.command_buffer(cmd) {
            Some(buffer) if buffer.state() == CmdState::Submitted => match buffer.sync() {
                Some(slot) => self.sync.is_signaled(device, slot),
                None => Ok(true),
            },
            _ => Ok(true),
        }
    }

    /// Free buffer back to its pool.
    ///
    /// Panics if the buffer is submitted.
    pub fn free(&mut self, device: &D, cmd: CmdId) -> Result<(), CommandError> {
        let buffer = self.buffer(cmd)?;
        if buffer.state() == CmdState::Submitted {
            log::error!("Command buffer '{}' freed while submitted", buffer.name());
            panic!("Command buffer must be finished before free");
        }

        let buffer = self.buffers.remove(cmd.index());
        if !buffer.kind().is_temp() && self.names.get(buffer.name()) == Some(&cmd) {
            self.names.remove(buffer.name());
        }
        unsafe {
            self.queues(buffer.pool_function())
                .pools()
                .pool(buffer.kind())
                .free(device, buffer.raw());
        }
        log::trace!("Freed command buffer '{}' {:?}", buffer.name(), cmd);
        Ok(())
    }

    /// Finish unfinished buffers, free all buffers and destroy pools.
    pub fn dispose(mut self, device: &D, tracker: &mut ResourceTracker) {
        let submitted: Vec<CmdId> = self
            .buffers
            .iter()
            .filter(|(_, buffer)| buffer.state() == CmdState::Submitted)
            .map(|(index, buffer)| CmdId::new(index, buffer.generation()))
            .collect();
        for cmd in submitted {
            log::warn!("Command buffer {:?} is not finished at dispose", cmd);
            if let Err(err) = self.finish(device, cmd, tracker) {
                log::error!("Failed to finish {:?} at dispose: {}", cmd, err);
            }
        }

        let cmds: Vec<CmdId> = self
            .buffers
            .iter()
            .map(|(index, buffer)| CmdId::new(index, buffer.generation()))
            .collect();
        for cmd in cmds {
            tracker.clear_finished_cmd(cmd);
        }

        let buffers: Vec<CommandBuffer<D>> = self.buffers.drain().collect();
        for buffer in buffers {
            unsafe {
                self.queues(buffer.pool_function())
                    .pools()
                    .pool(buffer.kind())
                    .free(device, buffer.raw());
            }
        }
        self.names.clear();

        log::debug!("Disposing command buffer manager");
        unsafe {
            self.sync.dispose(device);
            for queues in self.dedicated.into_iter().flatten() {
                queues.dispose(device);
            }
            self.generic.dispose(device);
        }
        self.relevant.dispose();
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        gpucmd_chain::Buffer,
        gpucmd_core::{empty::EmptyDevice, ResourceId},
    };

    const STORAGE: ResourceId = ResourceId(1);

    fn device() -> EmptyDevice {
        let _ = env_logger::builder().is_test(true).try_init();
        EmptyDevice::new(&[
            (
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                16,
            ),
            (vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 4),
            (vk::QueueFlags::TRANSFER, 2),
        ])
    }

    fn manager(device: &EmptyDevice) -> CommandBufferManager<EmptyDevice> {
        CommandBufferManager::new(device, ManagerConfig::default()).unwrap()
    }

    fn recorded(
        device: &EmptyDevice,
        manager: &mut CommandBufferManager<EmptyDevice>,
        name: &str,
    ) -> CmdId {
        let cmd = manager
            .begin_reusable(device, name, QueueFunction::Graphics)
            .unwrap();
        manager.end(device, cmd).unwrap();
        cmd
    }

    fn teardown(
        device: &EmptyDevice,
        manager: CommandBufferManager<EmptyDevice>,
        tracker: &mut ResourceTracker,
    ) {
        manager.dispose(device, tracker);
        assert_eq!(device.live_pools().len(), 0);
        assert_eq!(device.live_command_buffers(), 0);
        assert_eq!(device.live_semaphores(), 0);
        assert_eq!(device.live_fences(), 0);
    }

    #[test]
    fn no_generic_family() {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = EmptyDevice::new(&[(vk::QueueFlags::GRAPHICS, 0)]);
        let result = CommandBufferManager::new(&device, ManagerConfig::default());
        assert_eq!(result.err(), Some(CommandError::NoQueueFamily));
        assert_eq!(device.live_pools().len(), 0);
    }

    #[test]
    fn pool_failure_cleans_up() {
        let device = device();
        device.set_out_of_memory(true);
        let result = CommandBufferManager::new(&device, ManagerConfig::default());
        assert_eq!(
            result.err(),
            Some(CommandError::Device(DeviceError::OutOfHostMemory))
        );
        assert_eq!(device.live_pools().len(), 0);
    }

    #[test]
    fn functions_resolve_to_families() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let manager = manager(&device);
        assert_eq!(manager.get_queue_family_idx(QueueFunction::Graphics), FamilyId(0));
        assert_eq!(manager.get_queue_family_idx(QueueFunction::Compute), FamilyId(1));
        assert_eq!(manager.get_queue_family_idx(QueueFunction::Transfer), FamilyId(2));
        assert_eq!(manager.get_queue_family_idx(QueueFunction::Generic), FamilyId(0));
        // Four functions with families of their own plus generic, three pools each.
        assert_eq!(device.live_pools().len(), 15);
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn missing_function_falls_back_to_generic() {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = EmptyDevice::new(&[(vk::QueueFlags::GRAPHICS, 1)]);
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);
        assert_eq!(manager.resolve(QueueFunction::Compute), QueueFunction::Generic);

        let cmd = manager
            .begin_record_once(&device, "compute", QueueFunction::Compute)
            .unwrap();
        assert_eq!(manager.get_cmd_buffer_queue(cmd), Some(QueueFunction::Compute));
        assert_eq!(manager.cmd_family(cmd), Some(FamilyId(0)));
        manager.end(&device, cmd).unwrap();
        manager
            .submit(&device, QueuePriority::Low, &ExplicitSubmit::new(&[cmd]), None)
            .unwrap();
        manager.finish(&device, cmd, &mut tracker).unwrap();
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn buffer_kinds_use_their_pools() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);

        let temp = manager
            .begin_temp(&device, "temp", QueueFunction::Transfer)
            .unwrap();
        let once = manager
            .begin_record_once(&device, "once", QueueFunction::Transfer)
            .unwrap();
        let reusable = manager
            .begin_reusable(&device, "reusable", QueueFunction::Transfer)
            .unwrap();

        let raw = |cmd| manager.raw(cmd).unwrap();
        assert_eq!(
            device.pool_flags(raw(temp)),
            Some(vk::CommandPoolCreateFlags::TRANSIENT)
        );
        assert_eq!(
            device.begin_usage(raw(temp)),
            Some(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
        );
        assert_eq!(
            device.pool_flags(raw(once)),
            Some(vk::CommandPoolCreateFlags::empty())
        );
        assert_eq!(
            device.begin_usage(raw(once)),
            Some(vk::CommandBufferUsageFlags::empty())
        );
        assert_eq!(
            device.pool_flags(raw(reusable)),
            Some(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
        );
        assert_eq!(
            device.begin_usage(raw(reusable)),
            Some(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
        );

        assert_eq!(manager.get_cmd_buffer("temp"), None);
        assert_eq!(manager.get_cmd_buffer("once"), Some(once));
        manager.free(&device, temp).unwrap();
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn double_begin_returns_same_buffer() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);

        let first = manager
            .begin_record_once(&device, "once", QueueFunction::Graphics)
            .unwrap();
        let second = manager
            .begin_record_once(&device, "once", QueueFunction::Graphics)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.get_state(first), CmdState::Recording);

        let reusable = manager
            .begin_reusable(&device, "reusable", QueueFunction::Graphics)
            .unwrap();
        manager.start_render_pass(reusable).unwrap();
        assert_eq!(
            manager
                .begin_reusable(&device, "reusable", QueueFunction::Graphics)
                .unwrap(),
            reusable
        );
        assert!(manager.is_in_render_pass(reusable));
        manager.end_render_pass(reusable).unwrap();
        manager.end_render_pass(reusable).unwrap();
        assert_eq!(manager.get_state(reusable), CmdState::Recording);
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    #[should_panic]
    fn one_time_buffer_is_not_recorded_again() {
        let device = device();
        let mut manager = manager(&device);
        let cmd = manager
            .begin_record_once(&device, "once", QueueFunction::Graphics)
            .unwrap();
        manager.end(&device, cmd).unwrap();
        let _ = manager.begin_record_once(&device, "once", QueueFunction::Graphics);
    }

    #[test]
    #[should_panic]
    fn submitted_buffer_is_not_recorded_again() {
        let device = device();
        let mut manager = manager(&device);
        let cmd = recorded(&device, &mut manager, "reusable");
        manager
            .submit(&device, QueuePriority::Low, &ExplicitSubmit::new(&[cmd]), None)
            .unwrap();
        let _ = manager.begin_reusable(&device, "reusable", QueueFunction::Graphics);
    }

    #[test]
    #[should_panic]
    fn end_inside_render_pass() {
        let device = device();
        let mut manager = manager(&device);
        let cmd = manager
            .begin_reusable(&device, "pass", QueueFunction::Graphics)
            .unwrap();
        manager.start_render_pass(cmd).unwrap();
        let _ = manager.end(&device, cmd);
    }

    #[test]
    #[should_panic]
    fn mixed_queues_in_one_submission() {
        let device = device();
        let mut manager = manager(&device);
        let graphics = recorded(&device, &mut manager, "graphics");
        let transfer = manager
            .begin_reusable(&device, "transfer", QueueFunction::Transfer)
            .unwrap();
        manager.end(&device, transfer).unwrap();
        let _ = manager.submit(
            &device,
            QueuePriority::Low,
            &ExplicitSubmit::new(&[graphics, transfer]),
            None,
        );
    }

    #[test]
    fn reusable_round_trip() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);

        let cmd = recorded(&device, &mut manager, "frame");
        for _ in 0..3 {
            manager
                .submit_tracked(
                    &device,
                    QueuePriority::High,
                    &[TrackedSubmit::new(&[cmd])],
                    &mut tracker,
                )
                .unwrap();
            assert_eq!(manager.get_state(cmd), CmdState::Submitted);
            assert!(manager.cmd_signal_semaphore(cmd).is_some());
            manager.finish(&device, cmd, &mut tracker).unwrap();
            assert_eq!(manager.get_state(cmd), CmdState::Recorded);
            assert_eq!(manager.in_flight(), 0);

            let again = manager
                .begin_reusable(&device, "frame", QueueFunction::Graphics)
                .unwrap();
            assert_eq!(again, cmd);
            manager.end(&device, cmd).unwrap();
        }
        assert_eq!(device.live_semaphores(), 0);
        assert_eq!(device.live_fences(), 0);
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn tracked_submit_waits_on_writer() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);
        device.hold_fences(true);

        let writer = recorded(&device, &mut manager, "writer");
        let reader = recorded(&device, &mut manager, "reader");
        tracker.write::<Buffer>(writer, STORAGE, vk::PipelineStageFlags2::COMPUTE_SHADER);
        tracker.read::<Buffer>(reader, STORAGE, vk::PipelineStageFlags2::VERTEX_SHADER);

        manager
            .submit_tracked(
                &device,
                QueuePriority::Low,
                &[TrackedSubmit::new(&[writer])],
                &mut tracker,
            )
            .unwrap();
        let signal = manager.cmd_signal_semaphore(writer).unwrap();

        manager
            .submit_tracked(
                &device,
                QueuePriority::Low,
                &[TrackedSubmit::new(&[reader])],
                &mut tracker,
            )
            .unwrap();
        let submissions = device.submissions();
        let last = submissions.last().unwrap();
        assert_eq!(
            last.waits,
            vec![(signal, vk::PipelineStageFlags2::VERTEX_SHADER)]
        );
        assert!(!manager.is_cmd_finished(&device, writer).unwrap());
        assert_eq!(
            tracker.cmd_buffer_deps(reader),
            &[(writer, vk::PipelineStageFlags2::VERTEX_SHADER)]
        );

        // Reader waits on writer's semaphore, so it is finished first.
        manager.finish(&device, writer, &mut tracker).unwrap();
        assert_eq!(manager.get_state(reader), CmdState::Recorded);
        assert_eq!(manager.get_state(writer), CmdState::Recorded);
        assert!(!tracker.references_cmd(writer));
        assert!(!tracker.references_cmd(reader));
        assert_eq!(manager.in_flight(), 0);
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn groups_share_one_fence_and_batch() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);

        let first = recorded(&device, &mut manager, "first");
        let second = recorded(&device, &mut manager, "second");
        let third = recorded(&device, &mut manager, "third");
        manager
            .submit_tracked(
                &device,
                QueuePriority::Medium,
                &[
                    TrackedSubmit::new(&[first, second]),
                    TrackedSubmit::new(&[third]),
                ],
                &mut tracker,
            )
            .unwrap();

        let submissions = device.submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(device.submit_calls(), 1);
        assert_eq!(submissions[0].fence, submissions[1].fence);
        assert_ne!(submissions[0].signals, submissions[1].signals);
        assert_eq!(manager.in_flight(), 2);

        manager.finish(&device, first, &mut tracker).unwrap();
        manager.finish(&device, first, &mut tracker).unwrap();
        assert_eq!(manager.in_flight(), 2);
        manager.finish(&device, second, &mut tracker).unwrap();
        assert_eq!(manager.in_flight(), 1);
        assert_eq!(device.live_fences(), 1);
        manager.finish(&device, third, &mut tracker).unwrap();
        assert_eq!(device.live_fences(), 0);
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn manual_waits_at_top_of_pipe() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);

        let upload = recorded(&device, &mut manager, "upload");
        let draw = recorded(&device, &mut manager, "draw");
        tracker.write::<Buffer>(upload, STORAGE, vk::PipelineStageFlags2::TRANSFER);
        tracker.read::<Buffer>(draw, STORAGE, vk::PipelineStageFlags2::VERTEX_SHADER);

        manager
            .submit_tracked(&device, QueuePriority::Low, &[TrackedSubmit::new(&[upload])], &mut tracker)
            .unwrap();
        let signal = manager.cmd_signal_semaphore(upload).unwrap();
        manager
            .submit_tracked(
                &device,
                QueuePriority::Low,
                &[TrackedSubmit::new(&[draw]).wait_on(&[upload])],
                &mut tracker,
            )
            .unwrap();

        let submissions = device.submissions();
        assert_eq!(
            submissions[1].waits,
            vec![(
                signal,
                vk::PipelineStageFlags2::VERTEX_SHADER | vk::PipelineStageFlags2::TOP_OF_PIPE
            )]
        );
        manager.finish_all_submitted(&device, &mut tracker).unwrap();
        assert_eq!(manager.in_flight(), 0);
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn dependency_must_be_submitted() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);

        let writer = recorded(&device, &mut manager, "writer");
        let reader = recorded(&device, &mut manager, "reader");
        tracker.write::<Buffer>(writer, STORAGE, vk::PipelineStageFlags2::TRANSFER);
        tracker.read::<Buffer>(reader, STORAGE, vk::PipelineStageFlags2::FRAGMENT_SHADER);

        let result = manager.submit_tracked(
            &device,
            QueuePriority::Low,
            &[TrackedSubmit::new(&[reader])],
            &mut tracker,
        );
        assert_eq!(
            result,
            Err(CommandError::DependencyNotSubmitted(reader, writer))
        );
        assert_eq!(manager.get_state(reader), CmdState::Recorded);
        assert_eq!(device.submit_calls(), 0);
        assert_eq!(device.live_semaphores(), 0);
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn explicit_dependency_without_signal() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);

        let writer = recorded(&device, &mut manager, "writer");
        let reader = recorded(&device, &mut manager, "reader");
        tracker.write::<Buffer>(writer, STORAGE, vk::PipelineStageFlags2::TRANSFER);
        tracker.read::<Buffer>(reader, STORAGE, vk::PipelineStageFlags2::FRAGMENT_SHADER);

        manager
            .submit(&device, QueuePriority::Low, &ExplicitSubmit::new(&[writer]), None)
            .unwrap();
        let result = manager.submit_tracked(
            &device,
            QueuePriority::Low,
            &[TrackedSubmit::new(&[reader])],
            &mut tracker,
        );
        assert_eq!(result, Err(CommandError::NoSignalSemaphore(writer)));
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn temp_buffers_are_not_tracked() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);

        let temp = manager
            .begin_temp(&device, "upload", QueueFunction::Graphics)
            .unwrap();
        manager.start_render_pass(temp).unwrap();
        assert!(!manager.is_in_render_pass(temp));
        manager.end(&device, temp).unwrap();

        let result = manager.submit_tracked(
            &device,
            QueuePriority::Low,
            &[TrackedSubmit::new(&[temp])],
            &mut tracker,
        );
        assert_eq!(result, Err(CommandError::TempBufferTracked(temp)));

        let fence = manager
            .submit(&device, QueuePriority::Low, &ExplicitSubmit::new(&[temp]), None)
            .unwrap()
            .unwrap();
        assert_eq!(manager.in_flight(), 0);
        assert_eq!(manager.get_state(temp), CmdState::Recorded);
        assert!(device.is_fence_alive(fence));
        unsafe { device.destroy_fence(fence) };
        manager.free(&device, temp).unwrap();
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn external_fence_is_not_destroyed() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);

        let cmd = recorded(&device, &mut manager, "frame");
        let semaphore = unsafe { device.create_semaphore().unwrap() };
        let fence = unsafe { device.create_fence(false).unwrap() };
        let returned = manager
            .submit(
                &device,
                QueuePriority::SuperHigh,
                &ExplicitSubmit::new(&[cmd]).signal(&[semaphore]),
                Some(fence),
            )
            .unwrap();
        assert_eq!(returned, None);
        assert_eq!(manager.cmd_signal_semaphore(cmd), Some(semaphore));

        manager.finish_named(&device, "frame", &mut tracker).unwrap();
        assert!(device.is_fence_alive(fence));
        assert!(device.is_semaphore_alive(semaphore));
        unsafe {
            device.destroy_fence(fence);
            device.destroy_semaphore(semaphore);
        }
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn finish_times_out() {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = EmptyDevice::new(&[(vk::QueueFlags::GRAPHICS, 1)]);
        let mut tracker = ResourceTracker::new();
        let config = ManagerConfig {
            fence_timeout_ns: 1_000,
            ..ManagerConfig::default()
        };
        let mut manager = CommandBufferManager::new(&device, config).unwrap();

        let cmd = recorded(&device, &mut manager, "frame");
        device.hold_fences(true);
        device.set_hang(true);
        manager
            .submit_tracked(&device, QueuePriority::Low, &[TrackedSubmit::new(&[cmd])], &mut tracker)
            .unwrap();
        assert_eq!(
            manager.finish(&device, cmd, &mut tracker),
            Err(CommandError::Device(DeviceError::Timeout))
        );
        assert_eq!(manager.get_state(cmd), CmdState::Submitted);

        device.set_hang(false);
        manager.finish(&device, cmd, &mut tracker).unwrap();
        assert_eq!(manager.get_state(cmd), CmdState::Recorded);
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn dependent_timeout_keeps_writer_submitted() {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = EmptyDevice::new(&[(vk::QueueFlags::GRAPHICS, 1)]);
        let mut tracker = ResourceTracker::new();
        let config = ManagerConfig {
            fence_timeout_ns: 1_000,
            ..ManagerConfig::default()
        };
        let mut manager = CommandBufferManager::new(&device, config).unwrap();

        let writer = recorded(&device, &mut manager, "writer");
        let reader = recorded(&device, &mut manager, "reader");
        tracker.write::<Buffer>(writer, STORAGE, vk::PipelineStageFlags2::COMPUTE_SHADER);
        tracker.read::<Buffer>(reader, STORAGE, vk::PipelineStageFlags2::VERTEX_SHADER);

        manager
            .submit_tracked(&device, QueuePriority::Low, &[TrackedSubmit::new(&[writer])], &mut tracker)
            .unwrap();
        let signal = manager.cmd_signal_semaphore(writer).unwrap();
        device.hold_fences(true);
        device.set_hang(true);
        manager
            .submit_tracked(&device, QueuePriority::Low, &[TrackedSubmit::new(&[reader])], &mut tracker)
            .unwrap();

        assert_eq!(
            manager.finish(&device, writer, &mut tracker),
            Err(CommandError::Device(DeviceError::Timeout))
        );
        assert_eq!(manager.get_state(writer), CmdState::Submitted);
        assert_eq!(manager.get_state(reader), CmdState::Submitted);
        assert!(device.is_semaphore_alive(signal));
        assert_eq!(manager.in_flight(), 2);

        device.set_hang(false);
        manager.finish(&device, writer, &mut tracker).unwrap();
        assert_eq!(manager.get_state(writer), CmdState::Recorded);
        assert_eq!(manager.get_state(reader), CmdState::Recorded);
        assert_eq!(manager.in_flight(), 0);
        assert_eq!(device.live_semaphores(), 0);
        assert_eq!(device.live_fences(), 0);
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn submit_wait_finishes() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);
        device.hold_fences(true);

        let cmd = recorded(&device, &mut manager, "copy");
        manager
            .submit_wait(&device, QueuePriority::Low, &[TrackedSubmit::new(&[cmd])], &mut tracker)
            .unwrap();
        assert_eq!(manager.get_state(cmd), CmdState::Recorded);
        assert!(manager.is_cmd_finished(&device, cmd).unwrap());
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    fn stale_handle_after_free() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);

        let cmd = recorded(&device, &mut manager, "frame");
        manager.free(&device, cmd).unwrap();
        assert_eq!(manager.get_cmd_buffer("frame"), None);
        assert_eq!(manager.get_state(cmd), CmdState::Idle);

        let reused = recorded(&device, &mut manager, "frame");
        assert_eq!(reused.index(), cmd.index());
        assert_ne!(reused, cmd);
        assert_eq!(
            manager.end(&device, cmd),
            Err(CommandError::UnknownCommandBuffer(cmd))
        );
        teardown(&device, manager, &mut tracker);
    }

    #[test]
    #[should_panic]
    fn free_submitted() {
        let device = device();
        let mut manager = manager(&device);
        let cmd = recorded(&device, &mut manager, "frame");
        manager
            .submit(&device, QueuePriority::Low, &ExplicitSubmit::new(&[cmd]), None)
            .unwrap();
        let _ = manager.free(&device, cmd);
    }

    #[test]
    fn dispose_finishes_in_flight_buffers() {
        let device = device();
        let mut tracker = ResourceTracker::new();
        let mut manager = manager(&device);
        device.hold_fences(true);

        let cmd = recorded(&device, &mut manager, "frame");
        manager
            .submit_tracked(&device, QueuePriority::Low, &[TrackedSubmit::new(&[cmd])], &mut tracker)
            .unwrap();
        teardown(&device, manager, &mut tracker);
    }
}
