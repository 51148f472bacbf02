use crate::{events::EventEmitter, NodeError, NodeId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Closed set of node types the canvas can place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Start,
    Trigger,
    Agent,
    Pool,
    #[serde(alias = "poolwatcher")]
    PoolWatcher,
    Test,
    Output,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Start,
        NodeKind::Trigger,
        NodeKind::Agent,
        NodeKind::Pool,
        NodeKind::PoolWatcher,
        NodeKind::Test,
        NodeKind::Output,
    ];

    /// Wire tag, e.g. `"pool-watcher"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::Trigger => "trigger",
            NodeKind::Agent => "agent",
            NodeKind::Pool => "pool",
            NodeKind::PoolWatcher => "pool-watcher",
            NodeKind::Test => "test",
            NodeKind::Output => "output",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::Start => "Start",
            NodeKind::Trigger => "Trigger",
            NodeKind::Agent => "Agent",
            NodeKind::Pool => "Pool",
            NodeKind::PoolWatcher => "Pool Watcher",
            NodeKind::Test => "Test",
            NodeKind::Output => "Output",
        }
    }

    /// Label given to freshly added nodes.
    pub fn default_label(&self) -> String {
        format!("{} Node", self.display_name())
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(NodeKind::Start),
            "trigger" => Ok(NodeKind::Trigger),
            "agent" => Ok(NodeKind::Agent),
            "pool" => Ok(NodeKind::Pool),
            "pool-watcher" | "poolwatcher" => Ok(NodeKind::PoolWatcher),
            "test" => Ok(NodeKind::Test),
            "output" => Ok(NodeKind::Output),
            other => Err(format!("unknown node type: {}", other)),
        }
    }
}

/// Execution status shown on a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

/// Behavior executed for every node of one kind
#[async_trait]
pub trait NodeBehavior: Send + Sync {
    /// Kind this behavior is registered under
    fn kind(&self) -> NodeKind;

    /// Adjust the merged upstream input before execution.
    ///
    /// The default leaves the input untouched.
    fn prepare_input(&self, input: Value, _config: &Map<String, Value>) -> Value {
        input
    }

    /// Turn the input (plus the node's own configuration) into a result
    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError>;

    /// Optional: description shown by listing surfaces
    fn metadata(&self) -> BehaviorMetadata {
        BehaviorMetadata::default()
    }
}

/// Human-facing description of a behavior.
#[derive(Debug, Clone, Serialize)]
pub struct BehaviorMetadata {
    pub description: String,
    pub category: String,
}

impl Default for BehaviorMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

/// Execution context passed to each behavior
#[derive(Clone)]
pub struct NodeContext {
    pub node_id: NodeId,

    pub kind: NodeKind,

    /// Merged results of the upstream nodes, `Null` for entry points
    pub input: Value,

    /// Static configuration for this node
    pub config: Map<String, Value>,

    /// Event emitter for real-time updates
    pub events: EventEmitter,
}

impl NodeContext {
    pub fn new(node_id: NodeId, kind: NodeKind, events: EventEmitter) -> Self {
        Self {
            node_id,
            kind,
            input: Value::Null,
            config: Map::new(),
            events,
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = config;
        self
    }

    /// Non-empty string config entry
    pub fn config_str(&self, name: &str) -> Option<&str> {
        self.config
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_round_trip_through_serde() {
        let json = serde_json::to_string(&NodeKind::PoolWatcher).unwrap();
        assert_eq!(json, "\"pool-watcher\"");

        let legacy: NodeKind = serde_json::from_str("\"poolwatcher\"").unwrap();
        assert_eq!(legacy, NodeKind::PoolWatcher);
        assert_eq!("poolwatcher".parse::<NodeKind>().unwrap(), NodeKind::PoolWatcher);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!("telegram_polling".parse::<NodeKind>().is_err());
        assert!(serde_json::from_str::<NodeKind>("\"webhook\"").is_err());
    }

    #[test]
    fn default_labels_use_display_names() {
        assert_eq!(NodeKind::Start.default_label(), "Start Node");
        assert_eq!(NodeKind::PoolWatcher.default_label(), "Pool Watcher Node");
    }
}
