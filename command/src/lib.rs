//! Queues, pools and command buffers of one device.
//!
//! [`CommandBufferManager`] owns named command buffers, drives their recording lifecycle
//! and submits them. Tracked submissions turn the waits recorded by the resource tracker
//! into semaphore waits.

#![forbid(overflowing_literals)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]
#![deny(path_statements)]
#![deny(trivial_bounds)]
#![deny(type_alias_bounds)]
#![deny(unconditional_recursion)]
#![deny(while_true)]
#![deny(bad_style)]
#![deny(future_incompatible)]
#![warn(rust_2018_compatibility)]
#![warn(rust_2018_idioms)]
#![allow(unused_unsafe)]

#[macro_use]
extern crate failure;

mod buffer;
mod error;
mod family;
mod fence;
mod manager;
mod pool;
mod submit;
mod sync;

pub use crate::{
    buffer::{BufferKind, CmdState, CommandBuffer},
    error::CommandError,
    family::{select_family, FunctionQueues, PriorityTiers, Queue},
    fence::{Fence, FenceEpoch},
    manager::{CommandBufferManager, ManagerConfig},
    pool::{CommandPool, PoolSet},
    submit::{ExplicitSubmit, TrackedSubmit},
    sync::{SubmitSyncInfo, SyncPool},
};
