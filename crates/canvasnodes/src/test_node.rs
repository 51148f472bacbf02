use crate::timestamp;
use async_trait::async_trait;
use canvascore::{
    spread, BehaviorMetadata, NodeBehavior, NodeContext, NodeError, NodeKind, Value,
};
use serde_json::{json, Map};

/// Passes its input through, tagged as a test execution.
///
/// A node with a configured `question` and no upstream input runs with
/// `{ "question": <question> }` as its input.
pub struct TestNode;

#[async_trait]
impl NodeBehavior for TestNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Test
    }

    fn prepare_input(&self, input: Value, config: &Map<String, Value>) -> Value {
        let question = config
            .get("question")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty());

        match (input, question) {
            (Value::Null, Some(question)) => json!({ "question": question }),
            (input, _) => input,
        }
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let mut result = Map::new();
        result.insert("testResult".into(), "Test node executed successfully".into());
        result.insert("inputData".into(), ctx.input.clone());
        result.insert("timestamp".into(), timestamp().into());
        spread(&mut result, &ctx.input);

        Ok(Value::Object(result))
    }

    fn metadata(&self) -> BehaviorMetadata {
        BehaviorMetadata {
            description: "Runs a configured question through the workflow".to_string(),
            category: "debug".to_string(),
        }
    }
}
