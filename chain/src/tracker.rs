use {
    crate::{
        resource::{Image, Resource},
        transfer::{Release, Releases},
    },
    gpucmd_core::{vk, CmdId, QueueFunction, ResourceId},
    smallvec::SmallVec,
    std::collections::{BTreeMap, HashMap},
    thread_profiler::profile_scope,
};

/// Stage mask.
pub type Stages = vk::PipelineStageFlags2;

/// Wait edge. Command buffer to wait on and the stages that wait.
pub type Dependency = (CmdId, Stages);

/// Access history of one resource.
///
/// `reads` is non-empty only while nothing was written since those reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Accessors {
    /// Command buffer that wrote the resource last, with the stage of the write.
    pub write: Option<(CmdId, Stages)>,

    /// Command buffers that read the resource since the last write.
    /// First entry is the reader that performed the layout transition for images.
    pub reads: SmallVec<[CmdId; 4]>,

    /// Union of the stages of all reads since the last write.
    pub all_read_stages: Stages,

    /// Stages of the latest read.
    pub last_read_stages: Stages,
}

impl Accessors {
    fn is_empty(&self) -> bool {
        self.write.is_none() && self.reads.is_empty()
    }

    fn push_read(&mut self, cmd: CmdId, stages: Stages) {
        if self.reads.last() != Some(&cmd) {
            self.reads.push(cmd);
        }
        self.all_read_stages |= stages;
        self.last_read_stages = stages;
    }

    fn set_write(&mut self, cmd: CmdId, stages: Stages) {
        self.write = Some((cmd, stages));
        self.reads.clear();
        self.all_read_stages = Stages::empty();
        self.last_read_stages = Stages::empty();
    }
}

/// Prior access the new access must be ordered after with a pipeline barrier
/// in the recording command buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Barrier {
    /// First access of an image is a write.
    /// Nothing to wait for, but the caller may transition the image from its initial layout.
    Initial,

    /// Ordered after a write.
    Write {
        /// Writer.
        cmd: CmdId,

        /// Stage of the write.
        stages: Stages,
    },

    /// Ordered after reads.
    Reads {
        /// Readers.
        cmds: SmallVec<[CmdId; 4]>,

        /// Union of all read stages.
        all_stages: Stages,

        /// Stages of the latest read.
        last_stages: Stages,
    },
}

/// Tracks resource accesses of recorded command buffers.
///
/// Every access returns the barrier it needs inside the recording buffer
/// and registers waits on other command buffers.
/// Waits live until the buffer finishes or is recorded again.
#[derive(Clone, Debug, Default)]
pub struct ResourceTracker {
    accessors: HashMap<ResourceId, Accessors>,
    waits: BTreeMap<CmdId, SmallVec<[Dependency; 4]>>,
    releases: Releases,
}

fn add_wait(
    waits: &mut BTreeMap<CmdId, SmallVec<[Dependency; 4]>>,
    cmd: CmdId,
    dependency: CmdId,
    stages: Stages,
) {
    if cmd == dependency {
        return;
    }
    let deps = waits.entry(cmd).or_default();
    match deps.iter_mut().find(|(dep, _)| *dep == dependency) {
        Some((_, dep_stages)) => *dep_stages |= stages,
        None => {
            log::trace!("{:?} waits on {:?} at {:?}", cmd, dependency, stages);
            deps.push((dependency, stages));
        }
    }
}

impl ResourceTracker {
    /// Create empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register read of the resource by `cmd` at `stages`.
    pub fn read<R: Resource>(
        &mut self,
        cmd: CmdId,
        resource: ResourceId,
        stages: Stages,
    ) -> Option<Barrier> {
        let accessors = self.accessors.entry(resource).or_default();
        let (writer, write_stages) = match accessors.write {
            None => {
                accessors.push_read(cmd, stages);
                return None;
            }
            Some(write) => write,
        };

        let mut barrier = None;
        if R::IMAGE {
            if accessors.reads.is_empty() {
                // Layout must be transitioned before the first read no matter who wrote.
                barrier = Some(Barrier::Write {
                    cmd: writer,
                    stages: write_stages,
                });
                add_wait(&mut self.waits, cmd, writer, stages);
            } else {
                add_wait(&mut self.waits, cmd, writer, stages);
                add_wait(&mut self.waits, cmd, accessors.reads[0], stages);
            }
        } else if writer == cmd {
            if accessors.reads.is_empty() {
                barrier = Some(Barrier::Write {
                    cmd: writer,
                    stages: write_stages,
                });
            }
        } else {
            add_wait(&mut self.waits, cmd, writer, stages);
        }

        accessors.push_read(cmd, stages);
        barrier
    }

    /// Register write of the resource by `cmd` at single stage `stages`.
    ///
    /// # Panics
    ///
    /// Panics if `stages` has more or less than one stage bit set.
    pub fn write<R: Resource>(
        &mut self,
        cmd: CmdId,
        resource: ResourceId,
        stages: Stages,
    ) -> Option<Barrier> {
        if stages.as_raw().count_ones() != 1 {
            log::error!(
                "Writing {:?} in several pipeline stages {:?} is incorrect",
                resource,
                stages
            );
            panic!("Write must happen in exactly one stage. Got {:?}", stages);
        }

        let accessors = self.accessors.entry(resource).or_default();

        if accessors.is_empty() {
            accessors.set_write(cmd, stages);
            return if R::IMAGE { Some(Barrier::Initial) } else { None };
        }

        if accessors.reads.contains(&cmd) {
            // Other readers are not waited on. This buffer already ordered itself after their writer.
            let barrier = Barrier::Reads {
                cmds: SmallVec::from_slice(&[cmd]),
                all_stages: accessors.all_read_stages,
                last_stages: accessors.last_read_stages,
            };
            accessors.set_write(cmd, stages);
            return Some(barrier);
        }

        if !accessors.reads.is_empty() {
            for &reader in &accessors.reads {
                add_wait(&mut self.waits, cmd, reader, stages);
            }
            let barrier = if R::IMAGE {
                Some(Barrier::Reads {
                    cmds: accessors.reads.clone(),
                    all_stages: accessors.all_read_stages,
                    last_stages: accessors.last_read_stages,
                })
            } else {
                None
            };
            // Readers already waited for the last write.
            accessors.set_write(cmd, stages);
            return barrier;
        }

        let mut barrier = None;
        if let Some((writer, write_stages)) = accessors.write {
            if writer == cmd {
                barrier = Some(Barrier::Write {
                    cmd: writer,
                    stages: write_stages,
                });
            } else {
                add_wait(&mut self.waits, cmd, writer, stages);
            }
        }
        accessors.set_write(cmd, stages);
        barrier
    }

    /// Register write of a color attachment by render pass recorded in `cmd`.
    /// Never needs a barrier. The render pass transitions the layout itself.
    pub fn color_attachment_write(&mut self, cmd: CmdId, image: ResourceId) {
        let stages = vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT;
        let accessors = self.accessors.entry(image).or_default();

        if !accessors.reads.is_empty() && !accessors.reads.contains(&cmd) {
            for &reader in &accessors.reads {
                add_wait(&mut self.waits, cmd, reader, stages);
            }
        } else if let Some((writer, _)) = accessors.write {
            add_wait(&mut self.waits, cmd, writer, stages);
        }
        accessors.set_write(cmd, stages);
    }

    /// Forget everything about the image and return what was known.
    /// The caller transitions the image to the general layout after those accesses.
    pub fn image_to_general_layout(&mut self, image: ResourceId) -> Option<Accessors> {
        let accessors = self.accessors.get_mut(&image)?;
        let prior = if accessors.is_empty() {
            None
        } else {
            Some(accessors.clone())
        };
        *accessors = Accessors::default();
        prior
    }

    /// Remove every trace of finished command buffer.
    pub fn clear_finished_cmd(&mut self, cmd: CmdId) {
        self.waits.remove(&cmd);
        for deps in self.waits.values_mut() {
            deps.retain(|(dep, _)| *dep != cmd);
        }
        self.waits.retain(|_, deps| !deps.is_empty());

        self.accessors.retain(|_, accessors| {
            if accessors.write.map(|(writer, _)| writer) == Some(cmd) {
                accessors.write = None;
            }
            accessors.reads.retain(|reader| *reader != cmd);
            !accessors.is_empty()
        });
    }

    /// Drop waits of the command buffer.
    /// Used when a rerecordable buffer is recorded again.
    pub fn clear_cmd_deps(&mut self, cmd: CmdId) {
        self.waits.remove(&cmd);
    }

    /// Make `cmd` wait on `dependency` at `stages`.
    /// Ignored if both are the same buffer.
    pub fn add_dependency(&mut self, cmd: CmdId, dependency: CmdId, stages: Stages) {
        add_wait(&mut self.waits, cmd, dependency, stages);
    }

    /// Forget accesses of the resource.
    pub fn clear_resource(&mut self, resource: ResourceId) {
        self.accessors.remove(&resource);
        self.releases.remove_resource(resource);
    }

    /// Drop entries of resources that are not alive anymore
    /// and collapse duplicate readers keeping the earliest occurrence.
    pub fn clear_unwanted(&mut self, mut is_alive: impl FnMut(ResourceId) -> bool) {
        profile_scope!("clear_unwanted");

        self.accessors.retain(|&resource, accessors| {
            if !is_alive(resource) {
                log::trace!("Dropping accessors of dead {:?}", resource);
                return false;
            }
            if accessors.reads.len() > 1 {
                let mut unique = SmallVec::<[CmdId; 4]>::new();
                for &reader in &accessors.reads {
                    if !unique.contains(&reader) {
                        unique.push(reader);
                    }
                }
                accessors.reads = unique;
            }
            true
        });
        self.releases.retain(is_alive);
    }

    /// Accessors of the resource.
    pub fn accessors(&self, resource: ResourceId) -> Option<&Accessors> {
        self.accessors.get(&resource)
    }

    /// Command buffers `cmd` must wait on.
    pub fn cmd_buffer_deps(&self, cmd: CmdId) -> &[Dependency] {
        self.waits.get(&cmd).map_or(&[][..], |deps| &deps[..])
    }

    /// Command buffers accessing the resource. Writer first, readers after.
    pub fn cmd_buffer_resource_deps(&self, resource: ResourceId) -> SmallVec<[CmdId; 4]> {
        let mut cmds = SmallVec::new();
        if let Some(accessors) = self.accessors.get(&resource) {
            cmds.extend(accessors.write.map(|(writer, _)| writer));
            cmds.extend(accessors.reads.iter().cloned());
        }
        cmds
    }

    /// Command buffers that wait on `cmd`.
    pub fn depending_cmd_buffers(&self, cmd: CmdId) -> Vec<CmdId> {
        self.waits
            .iter()
            .filter(|(_, deps)| deps.iter().any(|(dep, _)| *dep == cmd))
            .map(|(&waiting, _)| waiting)
            .collect()
    }

    /// Check if the tracker still references the command buffer.
    pub fn references_cmd(&self, cmd: CmdId) -> bool {
        self.waits.contains_key(&cmd)
            || !self.depending_cmd_buffers(cmd).is_empty()
            || self.accessors.values().any(|accessors| {
                accessors.write.map(|(writer, _)| writer) == Some(cmd)
                    || accessors.reads.contains(&cmd)
            })
    }

    /// Remember that `function`'s queue used the resource.
    /// With `reset` the previous entry is replaced. Otherwise stages and access accumulate.
    pub fn add_resource_to_queue_transfer(
        &mut self,
        function: QueueFunction,
        resource: ResourceId,
        stages: Stages,
        access: vk::AccessFlags2,
        layout: vk::ImageLayout,
        reset: bool,
    ) {
        self.releases.add(
            function,
            resource,
            Release {
                stages,
                access,
                layout,
            },
            reset,
        );
    }

    /// Take resources `function`'s queue may have to release.
    pub fn releases_from_queue(&mut self, function: QueueFunction) -> HashMap<ResourceId, Release> {
        self.releases.drain(function)
    }
}

/// Convenience for image-only operations.
impl ResourceTracker {
    /// Register image read.
    pub fn read_image(&mut self, cmd: CmdId, image: ResourceId, stages: Stages) -> Option<Barrier> {
        self.read::<Image>(cmd, image, stages)
    }

    /// Register image write.
    pub fn write_image(&mut self, cmd: CmdId, image: ResourceId, stages: Stages) -> Option<Barrier> {
        self.write::<Image>(cmd, image, stages)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::resource::Buffer};

    const A: CmdId = CmdId::new(0, 0);
    const B: CmdId = CmdId::new(1, 0);
    const C: CmdId = CmdId::new(2, 0);
    const RES: ResourceId = ResourceId(1);

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn read_never_written() {
        init();
        let mut tracker = ResourceTracker::new();
        assert_eq!(tracker.read::<Buffer>(A, RES, Stages::VERTEX_SHADER), None);
        assert_eq!(tracker.read::<Buffer>(A, RES, Stages::FRAGMENT_SHADER), None);
        let accessors = tracker.accessors(RES).unwrap();
        assert_eq!(&accessors.reads[..], &[A]);
        assert_eq!(
            accessors.all_read_stages,
            Stages::VERTEX_SHADER | Stages::FRAGMENT_SHADER
        );
        assert_eq!(accessors.last_read_stages, Stages::FRAGMENT_SHADER);
        assert!(tracker.cmd_buffer_deps(A).is_empty());
    }

    #[test]
    fn read_after_write_in_same_buffer_barriers_once() {
        init();
        let mut tracker = ResourceTracker::new();
        assert_eq!(tracker.write::<Buffer>(A, RES, Stages::TRANSFER), None);
        assert_eq!(
            tracker.read::<Buffer>(A, RES, Stages::VERTEX_SHADER),
            Some(Barrier::Write {
                cmd: A,
                stages: Stages::TRANSFER
            })
        );
        for _ in 0..3 {
            assert_eq!(tracker.read::<Buffer>(A, RES, Stages::FRAGMENT_SHADER), None);
        }
        assert!(tracker.cmd_buffer_deps(A).is_empty());
    }

    #[test]
    fn read_after_write_in_other_buffer_waits() {
        init();
        let mut tracker = ResourceTracker::new();
        tracker.write::<Buffer>(A, RES, Stages::TRANSFER);
        assert_eq!(tracker.read::<Buffer>(B, RES, Stages::COMPUTE_SHADER), None);
        assert_eq!(tracker.cmd_buffer_deps(B), &[(A, Stages::COMPUTE_SHADER)]);
        assert_eq!(tracker.depending_cmd_buffers(A), vec![B]);
    }

    #[test]
    fn image_read_after_foreign_write_transitions_and_waits() {
        init();
        let mut tracker = ResourceTracker::new();
        assert_eq!(tracker.write_image(A, RES, Stages::TRANSFER), Some(Barrier::Initial));
        assert_eq!(
            tracker.read_image(B, RES, Stages::FRAGMENT_SHADER),
            Some(Barrier::Write {
                cmd: A,
                stages: Stages::TRANSFER
            })
        );
        assert_eq!(tracker.cmd_buffer_deps(B), &[(A, Stages::FRAGMENT_SHADER)]);

        // Later reader waits on the writer and on the first reader that transitioned the layout.
        assert_eq!(tracker.read_image(C, RES, Stages::COMPUTE_SHADER), None);
        assert_eq!(
            tracker.cmd_buffer_deps(C),
            &[
                (A, Stages::COMPUTE_SHADER),
                (B, Stages::COMPUTE_SHADER)
            ]
        );
    }

    #[test]
    fn write_after_foreign_reads_waits_on_every_reader() {
        init();
        let mut tracker = ResourceTracker::new();
        let upload = CmdId::new(3, 0);
        tracker.write::<Buffer>(upload, RES, Stages::TRANSFER);
        tracker.read::<Buffer>(B, RES, Stages::VERTEX_SHADER);
        tracker.read::<Buffer>(C, RES, Stages::FRAGMENT_SHADER);

        // Readers waited on the writer already, so the new writer does not.
        assert_eq!(tracker.write::<Buffer>(A, RES, Stages::COMPUTE_SHADER), None);
        assert_eq!(
            tracker.cmd_buffer_deps(A),
            &[
                (B, Stages::COMPUTE_SHADER),
                (C, Stages::COMPUTE_SHADER)
            ]
        );
        assert!(!tracker.depending_cmd_buffers(upload).contains(&A));
        let accessors = tracker.accessors(RES).unwrap();
        assert_eq!(accessors.write, Some((A, Stages::COMPUTE_SHADER)));
        assert!(accessors.reads.is_empty());
    }

    #[test]
    fn rerecording_drops_waits_only() {
        init();
        let mut tracker = ResourceTracker::new();
        tracker.write::<Buffer>(A, RES, Stages::TRANSFER);
        tracker.read::<Buffer>(B, RES, Stages::VERTEX_SHADER);
        tracker.clear_cmd_deps(B);

        assert!(tracker.cmd_buffer_deps(B).is_empty());
        assert_eq!(tracker.cmd_buffer_resource_deps(RES).as_slice(), &[A, B]);
    }

    #[test]
    fn image_write_after_foreign_reads_returns_readers() {
        init();
        let mut tracker = ResourceTracker::new();
        tracker.read_image(B, RES, Stages::FRAGMENT_SHADER);
        tracker.read_image(C, RES, Stages::COMPUTE_SHADER);
        assert_eq!(
            tracker.write_image(A, RES, Stages::TRANSFER),
            Some(Barrier::Reads {
                cmds: SmallVec::from_slice(&[B, C]),
                all_stages: Stages::FRAGMENT_SHADER | Stages::COMPUTE_SHADER,
                last_stages: Stages::COMPUTE_SHADER,
            })
        );
        assert_eq!(tracker.cmd_buffer_deps(A).len(), 2);
    }

    #[test]
    fn write_after_own_read_barriers_against_reads() {
        init();
        let mut tracker = ResourceTracker::new();
        tracker.read::<Buffer>(B, RES, Stages::VERTEX_SHADER);
        tracker.read::<Buffer>(A, RES, Stages::FRAGMENT_SHADER);
        assert_eq!(
            tracker.write::<Buffer>(A, RES, Stages::TRANSFER),
            Some(Barrier::Reads {
                cmds: SmallVec::from_slice(&[A]),
                all_stages: Stages::VERTEX_SHADER | Stages::FRAGMENT_SHADER,
                last_stages: Stages::FRAGMENT_SHADER,
            })
        );
        assert!(tracker.cmd_buffer_deps(A).is_empty());
    }

    #[test]
    fn write_after_write() {
        init();
        let mut tracker = ResourceTracker::new();
        tracker.write::<Buffer>(A, RES, Stages::TRANSFER);
        assert_eq!(
            tracker.write::<Buffer>(A, RES, Stages::COMPUTE_SHADER),
            Some(Barrier::Write {
                cmd: A,
                stages: Stages::TRANSFER
            })
        );
        assert_eq!(tracker.write::<Buffer>(B, RES, Stages::TRANSFER), None);
        assert_eq!(tracker.cmd_buffer_deps(B), &[(A, Stages::TRANSFER)]);
    }

    #[test]
    #[should_panic]
    fn write_in_several_stages() {
        init();
        let mut tracker = ResourceTracker::new();
        tracker.write::<Buffer>(A, RES, Stages::TRANSFER | Stages::COMPUTE_SHADER);
    }

    #[test]
    fn duplicate_waits_merge_stages() {
        init();
        let mut tracker = ResourceTracker::new();
        let other = ResourceId(2);
        tracker.write::<Buffer>(A, RES, Stages::TRANSFER);
        tracker.write::<Buffer>(A, other, Stages::TRANSFER);
        tracker.read::<Buffer>(B, RES, Stages::VERTEX_SHADER);
        tracker.read::<Buffer>(B, other, Stages::FRAGMENT_SHADER);
        assert_eq!(
            tracker.cmd_buffer_deps(B),
            &[(A, Stages::VERTEX_SHADER | Stages::FRAGMENT_SHADER)]
        );
    }

    #[test]
    fn color_attachment_write_waits_and_clears_reads() {
        init();
        let mut tracker = ResourceTracker::new();
        tracker.read_image(B, RES, Stages::FRAGMENT_SHADER);
        tracker.color_attachment_write(A, RES);
        assert_eq!(
            tracker.cmd_buffer_deps(A),
            &[(B, Stages::COLOR_ATTACHMENT_OUTPUT)]
        );
        let accessors = tracker.accessors(RES).unwrap();
        assert_eq!(accessors.write, Some((A, Stages::COLOR_ATTACHMENT_OUTPUT)));
        assert!(accessors.reads.is_empty());

        tracker.color_attachment_write(C, RES);
        assert_eq!(
            tracker.cmd_buffer_deps(C),
            &[(A, Stages::COLOR_ATTACHMENT_OUTPUT)]
        );
    }

    #[test]
    fn general_layout_resets_image() {
        init();
        let mut tracker = ResourceTracker::new();
        assert_eq!(tracker.image_to_general_layout(RES), None);
        tracker.write_image(A, RES, Stages::TRANSFER);
        let prior = tracker.image_to_general_layout(RES).unwrap();
        assert_eq!(prior.write, Some((A, Stages::TRANSFER)));
        assert_eq!(tracker.image_to_general_layout(RES), None);
        assert!(tracker.cmd_buffer_resource_deps(RES).is_empty());
    }

    #[test]
    fn clear_finished_cmd_removes_all_references() {
        init();
        let mut tracker = ResourceTracker::new();
        let other = ResourceId(2);
        tracker.write::<Buffer>(A, RES, Stages::TRANSFER);
        tracker.read::<Buffer>(B, RES, Stages::VERTEX_SHADER);
        tracker.read::<Buffer>(A, other, Stages::VERTEX_SHADER);

        tracker.clear_finished_cmd(A);
        assert!(!tracker.references_cmd(A));
        assert!(tracker.accessors(other).is_none());
        assert_eq!(&tracker.cmd_buffer_resource_deps(RES)[..], &[B]);
        assert!(tracker.cmd_buffer_deps(B).is_empty());
    }

    #[test]
    fn clear_unwanted_compacts() {
        init();
        let mut tracker = ResourceTracker::new();
        let dead = ResourceId(2);
        tracker.read::<Buffer>(B, RES, Stages::VERTEX_SHADER);
        tracker.read::<Buffer>(A, RES, Stages::VERTEX_SHADER);
        tracker.read::<Buffer>(B, RES, Stages::VERTEX_SHADER);
        tracker.read::<Buffer>(A, RES, Stages::VERTEX_SHADER);
        tracker.read::<Buffer>(A, dead, Stages::VERTEX_SHADER);
        tracker.add_resource_to_queue_transfer(
            QueueFunction::Graphics,
            dead,
            Stages::VERTEX_SHADER,
            vk::AccessFlags2::SHADER_READ,
            vk::ImageLayout::UNDEFINED,
            false,
        );

        tracker.clear_unwanted(|resource| resource == RES);
        assert_eq!(&tracker.accessors(RES).unwrap().reads[..], &[B, A]);
        assert!(tracker.accessors(dead).is_none());
        assert!(tracker.releases_from_queue(QueueFunction::Graphics).is_empty());
    }

    #[test]
    fn replay_is_deterministic() {
        init();
        let history: &[(CmdId, bool, Stages)] = &[
            (A, true, Stages::TRANSFER),
            (B, false, Stages::VERTEX_SHADER),
            (C, false, Stages::FRAGMENT_SHADER),
            (A, true, Stages::COMPUTE_SHADER),
            (B, false, Stages::TRANSFER),
        ];
        let replay = || {
            let mut tracker = ResourceTracker::new();
            let barriers: Vec<_> = history
                .iter()
                .map(|&(cmd, write, stages)| {
                    if write {
                        tracker.write_image(cmd, RES, stages)
                    } else {
                        tracker.read_image(cmd, RES, stages)
                    }
                })
                .collect();
            (barriers, tracker.accessors(RES).cloned(), tracker.cmd_buffer_deps(A).to_vec())
        };
        assert_eq!(replay(), replay());
    }

    #[test]
    fn manual_dependency() {
        init();
        let mut tracker = ResourceTracker::new();
        tracker.add_dependency(A, A, Stages::ALL_COMMANDS);
        assert!(tracker.cmd_buffer_deps(A).is_empty());
        tracker.add_dependency(A, B, Stages::ALL_COMMANDS);
        assert_eq!(tracker.cmd_buffer_deps(A), &[(B, Stages::ALL_COMMANDS)]);
        assert_eq!(tracker.depending_cmd_buffers(B), vec![A]);
    }

    #[test]
    fn forget_resource() {
        init();
        let mut tracker = ResourceTracker::new();
        tracker.write::<Buffer>(A, RES, Stages::TRANSFER);
        tracker.add_resource_to_queue_transfer(
            QueueFunction::Transfer,
            RES,
            Stages::TRANSFER,
            vk::AccessFlags2::TRANSFER_WRITE,
            vk::ImageLayout::UNDEFINED,
            true,
        );
        tracker.clear_resource(RES);
        assert!(tracker.accessors(RES).is_none());
        assert!(!tracker.references_cmd(A));
        assert!(tracker.releases_from_queue(QueueFunction::Transfer).is_empty());
    }
}
