use crate::{NodeId, NodeKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Rejected Graph Store mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    #[error("Node already exists: {0}")]
    DuplicateNode(NodeId),

    #[error("Nodes {source_id} and {target_id} are already connected")]
    DuplicateEdge { source_id: NodeId, target_id: NodeId },

    #[error("Edge references unknown node: {source_id} -> {target_id}")]
    InvalidEdge { source_id: NodeId, target_id: NodeId },

    #[error("Node {0} cannot be connected to itself")]
    SelfLoop(NodeId),
}

/// Failures raised by a node behavior. They are fatal to that node only.
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

#[derive(Error, Debug, Clone)]
pub enum WorkflowError {
    #[error("No start nodes found. Add a Start node to begin the workflow.")]
    NoStartNodes,

    #[error("No behavior registered for node type: {0}")]
    UnknownNodeType(NodeKind),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Execution error: {0}")]
    Execution(String),
}
