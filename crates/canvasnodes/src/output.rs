use crate::timestamp;
use async_trait::async_trait;
use canvascore::{BehaviorMetadata, NodeBehavior, NodeContext, NodeError, NodeKind, Value};
use serde_json::json;

/// Collects the final result of a branch
pub struct OutputNode;

#[async_trait]
impl NodeBehavior for OutputNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Output
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        Ok(json!({
            "finalResult": ctx.input,
            "outputGenerated": true,
            "timestamp": timestamp(),
        }))
    }

    fn metadata(&self) -> BehaviorMetadata {
        BehaviorMetadata {
            description: "Receives the workflow results".to_string(),
            category: "output".to_string(),
        }
    }
}
