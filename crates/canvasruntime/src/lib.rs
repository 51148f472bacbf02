//! Workflow execution runtime
//!
//! This crate provides the execution engine that runs canvas workflows,
//! the node registry it dispatches through and the dependency resolver.

mod executor;
mod registry;
mod resolver;
mod runtime;

pub use executor::{BlockedNode, FailedNode, RunReport, WorkflowExecutor};
pub use registry::NodeRegistry;
pub use resolver::DependencyResolver;
pub use runtime::{CanvasRuntime, RuntimeConfig};
