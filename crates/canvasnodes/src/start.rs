use crate::timestamp;
use async_trait::async_trait;
use canvascore::{BehaviorMetadata, NodeBehavior, NodeContext, NodeError, NodeKind, Value};
use serde_json::json;

/// Entry point of a workflow; acknowledges the run
pub struct StartNode;

#[async_trait]
impl NodeBehavior for StartNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Start
    }

    async fn execute(&self, _ctx: NodeContext) -> Result<Value, NodeError> {
        Ok(json!({
            "message": "Workflow started",
            "timestamp": timestamp(),
        }))
    }

    fn metadata(&self) -> BehaviorMetadata {
        BehaviorMetadata {
            description: "Begins a workflow run".to_string(),
            category: "control".to_string(),
        }
    }
}
