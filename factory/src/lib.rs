//! Recording context tying together the command buffer manager, the resource tracker
//! and the registry of live resources.
//!
//! Command buffers declare the resources they access with
//! [`RecordingContext::cmd_barrier_resources`] and the context records
//! the pipeline barriers and queue ownership transfers the accesses need.

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

#[macro_use]
extern crate failure;

mod barriers;
mod config;
mod context;
mod error;
mod registry;

pub use crate::{
    barriers::{Barriers, ResourceBinding, Source},
    config::Config,
    context::RecordingContext,
    error::ContextError,
    registry::{Registered, ResourceKind, ResourceRegistry},
};
