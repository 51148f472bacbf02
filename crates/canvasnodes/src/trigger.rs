use crate::timestamp;
use async_trait::async_trait;
use canvascore::{BehaviorMetadata, NodeBehavior, NodeContext, NodeError, NodeKind, Value};
use serde_json::json;

/// Echoes whatever fired it
pub struct TriggerNode;

#[async_trait]
impl NodeBehavior for TriggerNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Trigger
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let trigger_data = match ctx.input {
            Value::Null => Value::from("Manual trigger"),
            input => input,
        };

        Ok(json!({
            "triggered": true,
            "triggerData": trigger_data,
            "timestamp": timestamp(),
        }))
    }

    fn metadata(&self) -> BehaviorMetadata {
        BehaviorMetadata {
            description: "Fires the workflow, passing its input along".to_string(),
            category: "control".to_string(),
        }
    }
}
