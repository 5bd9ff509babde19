//! This crate tracks resource accesses of recorded command buffers
//! and derives the synchronization they require.
//!
//! Each access returns the pipeline barrier needed inside the recording buffer.
//! Accesses of resources last touched by other command buffers
//! register waits that are turned into semaphore waits at submission.

#![warn(
    missing_debug_implementations,
    missing_copy_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

mod access;
mod resource;
mod stage;
mod tracker;
mod transfer;

pub use crate::{
    access::AccessFlagsExt,
    resource::{Buffer, Image, Resource},
    stage::{clamp_to_queue, supported_access, supported_stages},
    tracker::{Accessors, Barrier, Dependency, ResourceTracker, Stages},
    transfer::Release,
};
