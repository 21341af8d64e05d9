//! # Registry Infrastructure
//!
//! Type-keyed lookup of running worker instances.
//!
//! ## Available Registries
//!
//! - **InstanceRegistry**: worker type → single live instance, last writer wins

pub mod instance_registry;

pub use instance_registry::{InstanceRegistry, RegistryStats, WorkerKey};
