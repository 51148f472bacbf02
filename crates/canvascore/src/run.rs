use crate::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Workflow-level status of the current (or last) run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// Why a node never executed during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockReason {
    /// An upstream node failed
    UpstreamFailed,
    /// An upstream node never became ready (dependency cycle)
    UnmetDependency,
}

/// Aggregate bundle handed to output nodes when a run completes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub workflow_results: Map<String, Value>,
    pub executed_nodes: Vec<NodeId>,
    pub summary: String,
}

impl RunSnapshot {
    pub fn new(workflow_results: Map<String, Value>, executed_nodes: Vec<NodeId>) -> Self {
        let summary = format!(
            "Workflow completed. Executed {} nodes.",
            executed_nodes.len()
        );
        Self {
            workflow_results,
            executed_nodes,
            summary,
        }
    }

    /// The bundle as handed to output nodes
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_summarises_executed_nodes() {
        let mut results = Map::new();
        results.insert("0".into(), json!({"message": "Workflow started"}));

        let snapshot = RunSnapshot::new(results, vec!["0".into(), "1".into(), "2".into()]);
        assert_eq!(snapshot.summary, "Workflow completed. Executed 3 nodes.");

        let value = snapshot.to_value().unwrap();
        assert_eq!(
            value,
            json!({
                "workflowResults": { "0": { "message": "Workflow started" } },
                "executedNodes": ["0", "1", "2"],
                "summary": "Workflow completed. Executed 3 nodes.",
            })
        );

        let parsed: RunSnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
