//! Core abstractions for the workflow canvas
//!
//! This crate provides the graph model, the Graph Store, input merging and
//! the behavior trait that the runtime and node library build on.

mod error;
pub mod events;
mod graph;
mod ids;
mod node;
mod run;
mod value;

pub use error::{CanvasError, GraphError, NodeError, WorkflowError};
pub use events::*;
pub use graph::{Edge, EdgeId, GraphSnapshot, GraphStore, Node, NodeData, NodeId, NodeSpec};
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use node::{BehaviorMetadata, NodeBehavior, NodeContext, NodeKind, NodeStatus};
pub use run::{BlockReason, RunSnapshot, RunStatus};
pub use serde_json::Value;
pub use value::{merge_inputs, spread};

/// Result type for canvas operations
pub type Result<T> = std::result::Result<T, CanvasError>;
