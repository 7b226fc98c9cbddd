//! The project's module dependency graph.
//!
//! A [`ProjectModel`] is the validated, immutable description of every module
//! and its raw edges. [`ModuleNode`] wraps a [`ModuleHandle`] into that model
//! and lazily derives its three edge sets (regular, dependsOn, friend), each
//! computed at most logically once and safe to race.

#![warn(missing_docs)]

pub mod error;
pub mod node;
pub mod order;
pub mod project;
pub mod services;

pub use error::GraphError;
pub use node::ModuleNode;
pub use order::depends_on_closure;
pub use project::{
    EdgeKind, ModuleDescriptor, ModuleHandle, ModuleId, ModuleSpec, ProjectModel,
    ProjectModelBuilder,
};
pub use services::{analyzer_services, AnalyzerServices};
pub use strata_config::Platform;
