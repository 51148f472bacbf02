use canvascore::{BehaviorMetadata, NodeBehavior, NodeKind, WorkflowError};
use std::collections::HashMap;
use std::sync::Arc;

/// Maps each node kind to the behavior that executes it
pub struct NodeRegistry {
    behaviors: HashMap<NodeKind, Arc<dyn NodeBehavior>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
        }
    }

    /// Register a behavior under the kind it reports
    pub fn register(&mut self, behavior: Arc<dyn NodeBehavior>) {
        let kind = behavior.kind();
        tracing::info!("Registering node type: {}", kind);
        if self.behaviors.insert(kind, behavior).is_some() {
            tracing::warn!("Replaced existing behavior for node type: {}", kind);
        }
    }

    /// Look up the behavior for a node kind
    pub fn behavior_for(&self, kind: NodeKind) -> Result<Arc<dyn NodeBehavior>, WorkflowError> {
        self.behaviors
            .get(&kind)
            .cloned()
            .ok_or(WorkflowError::UnknownNodeType(kind))
    }

    pub fn contains(&self, kind: NodeKind) -> bool {
        self.behaviors.contains_key(&kind)
    }

    /// Registered kinds in enumeration order
    pub fn list_node_kinds(&self) -> Vec<NodeKind> {
        NodeKind::ALL
            .into_iter()
            .filter(|kind| self.behaviors.contains_key(kind))
            .collect()
    }

    pub fn metadata(&self, kind: NodeKind) -> Option<BehaviorMetadata> {
        self.behaviors.get(&kind).map(|b| b.metadata())
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
