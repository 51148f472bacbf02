use crate::ids::{IdGenerator, SequentialIds};
use crate::{GraphError, NodeKind, NodeStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type NodeId = String;
pub type EdgeId = String;

/// A node placed on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub data: NodeData,
}

/// Mutable payload of a node: display label, run state and configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    pub status: NodeStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl NodeData {
    fn idle(label: String, config: Map<String, Value>) -> Self {
        Self {
            label,
            status: NodeStatus::Idle,
            result: None,
            error: None,
            config,
        }
    }
}

/// Description of a node to insert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
}

impl NodeSpec {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: None,
            kind,
            label: None,
            config: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// Directed data dependency: `target` consumes the result of `source`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
}

/// Point-in-time copy of the graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Holds the canvas graph and each node's run state.
///
/// Nodes and edges keep insertion order. Every edge references two existing,
/// distinct nodes and no source/target pair appears twice.
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    ids: Box<dyn IdGenerator>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::with_id_generator(Box::new(SequentialIds::new()))
    }

    pub fn with_id_generator(ids: Box<dyn IdGenerator>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            ids,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Add an idle node with a generated id and the kind's default label
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.fresh_id();
        self.push_node(id.clone(), NodeSpec::new(kind));
        id
    }

    /// Insert a node described by `spec`, generating an id when none is given
    pub fn insert(&mut self, spec: NodeSpec) -> Result<NodeId, GraphError> {
        let id = match spec.id.clone() {
            Some(id) if self.contains(&id) => return Err(GraphError::DuplicateNode(id)),
            Some(id) => id,
            None => self.fresh_id(),
        };
        self.push_node(id.clone(), spec);
        Ok(id)
    }

    /// Remove a node together with every edge touching it
    pub fn remove_node(&mut self, id: &str) -> Result<Node, GraphError> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        let before = self.edges.len();
        self.edges.retain(|e| e.source != id && e.target != id);
        tracing::debug!(
            node_id = %id,
            removed_edges = before - self.edges.len(),
            "removed node"
        );

        Ok(self.nodes.remove(index))
    }

    /// Add an edge `source -> target`
    pub fn connect(&mut self, source: &str, target: &str) -> Result<EdgeId, GraphError> {
        if !self.contains(source) || !self.contains(target) {
            return Err(GraphError::InvalidEdge {
                source_id: source.to_string(),
                target_id: target.to_string(),
            });
        }
        if source == target {
            return Err(GraphError::SelfLoop(source.to_string()));
        }
        if self
            .edges
            .iter()
            .any(|e| e.source == source && e.target == target)
        {
            return Err(GraphError::DuplicateEdge {
                source_id: source.to_string(),
                target_id: target.to_string(),
            });
        }

        let id = Uuid::new_v4().to_string();
        self.edges.push(Edge {
            id: id.clone(),
            source: source.to_string(),
            target: target.to_string(),
        });
        tracing::debug!(edge_id = %id, %source, %target, "connected nodes");
        Ok(id)
    }

    pub fn disconnect(&mut self, edge_id: &str) -> Result<Edge, GraphError> {
        let index = self
            .edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or_else(|| GraphError::EdgeNotFound(edge_id.to_string()))?;
        Ok(self.edges.remove(index))
    }

    /// Replace the status, result and error of one node, leaving the rest intact
    pub fn update_status(
        &mut self,
        id: &str,
        status: NodeStatus,
        result: Option<Value>,
        error: Option<String>,
    ) -> Result<(), GraphError> {
        let data = self.data_mut(id)?;
        data.status = status;
        data.result = result;
        data.error = error;
        Ok(())
    }

    pub fn set_config(
        &mut self,
        id: &str,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), GraphError> {
        self.data_mut(id)?.config.insert(key.into(), value);
        Ok(())
    }

    pub fn set_label(&mut self, id: &str, label: impl Into<String>) -> Result<(), GraphError> {
        self.data_mut(id)?.label = label.into();
        Ok(())
    }

    /// Put every node back to idle with no result or error
    pub fn reset_run_state(&mut self) {
        for node in &mut self.nodes {
            node.data.status = NodeStatus::Idle;
            node.data.result = None;
            node.data.error = None;
        }
    }

    fn data_mut(&mut self, id: &str) -> Result<&mut NodeData, GraphError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .map(|n| &mut n.data)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    fn fresh_id(&mut self) -> NodeId {
        loop {
            let id = self.ids.next_id();
            if !self.contains(&id) {
                return id;
            }
        }
    }

    fn push_node(&mut self, id: NodeId, spec: NodeSpec) {
        let label = spec.label.unwrap_or_else(|| spec.kind.default_label());
        tracing::debug!(node_id = %id, kind = %spec.kind, "added node");
        self.nodes.push(Node {
            id,
            kind: spec.kind,
            data: NodeData::idle(label, spec.config),
        });
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain() -> (GraphStore, NodeId, NodeId, NodeId) {
        let mut store = GraphStore::new();
        let start = store.add_node(NodeKind::Start);
        let trigger = store.add_node(NodeKind::Trigger);
        let output = store.add_node(NodeKind::Output);
        store.connect(&start, &trigger).unwrap();
        store.connect(&trigger, &output).unwrap();
        (store, start, trigger, output)
    }

    #[test]
    fn added_nodes_start_idle_with_default_label() {
        let mut store = GraphStore::new();
        let id = store.add_node(NodeKind::Agent);

        let node = store.node(&id).unwrap();
        assert_eq!(id, "0");
        assert_eq!(node.data.label, "Agent Node");
        assert_eq!(node.data.status, NodeStatus::Idle);
        assert!(node.data.result.is_none());
        assert!(node.data.error.is_none());
    }

    #[test]
    fn insert_accepts_explicit_ids_and_rejects_duplicates() {
        let mut store = GraphStore::new();
        let id = store
            .insert(
                NodeSpec::new(NodeKind::Test)
                    .with_id("probe")
                    .with_config("question", "ping"),
            )
            .unwrap();
        assert_eq!(id, "probe");
        assert_eq!(store.node("probe").unwrap().data.config["question"], json!("ping"));

        let err = store
            .insert(NodeSpec::new(NodeKind::Start).with_id("probe"))
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicateNode("probe".into()));
    }

    #[test]
    fn generated_ids_skip_taken_ones() {
        let mut store = GraphStore::new();
        store
            .insert(NodeSpec::new(NodeKind::Start).with_id("0"))
            .unwrap();
        let id = store.add_node(NodeKind::Output);
        assert_eq!(id, "1");
    }

    #[test]
    fn connect_validates_endpoints() {
        let (mut store, start, trigger, _) = chain();

        assert!(matches!(
            store.connect(&start, "missing"),
            Err(GraphError::InvalidEdge { .. })
        ));
        assert_eq!(
            store.connect(&start, &start),
            Err(GraphError::SelfLoop(start.clone()))
        );
        assert!(matches!(
            store.connect(&start, &trigger),
            Err(GraphError::DuplicateEdge { .. })
        ));
        assert_eq!(store.edges().len(), 2);
    }

    #[test]
    fn removing_a_node_drops_its_edges() {
        let (mut store, start, trigger, output) = chain();

        let removed = store.remove_node(&trigger).unwrap();
        assert_eq!(removed.kind, NodeKind::Trigger);
        assert!(store.edges().is_empty());
        assert!(store.contains(&start));
        assert!(store.contains(&output));
        assert_eq!(
            store.remove_node(&trigger),
            Err(GraphError::NodeNotFound(trigger))
        );
    }

    #[test]
    fn disconnect_removes_only_that_edge() {
        let (mut store, start, trigger, _) = chain();
        let first = store.edges()[0].id.clone();

        let edge = store.disconnect(&first).unwrap();
        assert_eq!((edge.source, edge.target), (start, trigger));
        assert_eq!(store.edges().len(), 1);
        assert!(matches!(
            store.disconnect(&first),
            Err(GraphError::EdgeNotFound(_))
        ));
    }

    #[test]
    fn update_status_touches_only_run_fields() {
        let mut store = GraphStore::new();
        let id = store
            .insert(
                NodeSpec::new(NodeKind::Test)
                    .with_label("Probe")
                    .with_config("question", "ping"),
            )
            .unwrap();

        store
            .update_status(&id, NodeStatus::Success, Some(json!({"ok": true})), None)
            .unwrap();

        let node = store.node(&id).unwrap();
        assert_eq!(node.data.status, NodeStatus::Success);
        assert_eq!(node.data.result, Some(json!({"ok": true})));
        assert_eq!(node.data.label, "Probe");
        assert_eq!(node.data.config["question"], json!("ping"));

        assert!(store
            .update_status("nope", NodeStatus::Error, None, Some("x".into()))
            .is_err());
    }

    #[test]
    fn reset_clears_run_state() {
        let (mut store, start, _, _) = chain();
        store
            .update_status(&start, NodeStatus::Error, None, Some("boom".into()))
            .unwrap();

        store.reset_run_state();

        let node = store.node(&start).unwrap();
        assert_eq!(node.data.status, NodeStatus::Idle);
        assert!(node.data.error.is_none());
    }

    #[test]
    fn node_serializes_in_canvas_shape() {
        let mut store = GraphStore::new();
        let id = store.add_node(NodeKind::PoolWatcher);

        let json = serde_json::to_value(store.node(&id).unwrap()).unwrap();
        assert_eq!(json["type"], "pool-watcher");
        assert_eq!(json["data"]["status"], "idle");
        assert_eq!(json["data"]["result"], Value::Null);
    }
}
