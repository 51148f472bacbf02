use crate::timestamp;
use async_trait::async_trait;
use canvascore::{BehaviorMetadata, NodeBehavior, NodeContext, NodeError, NodeKind, Value};
use serde_json::json;
use thiserror::Error;

const DEFAULT_QUESTION: &str = "Default query";

/// Ways a query to the agent service can fail; the message lands in the result's `error`
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent API URL is not configured")]
    NotConfigured,

    #[error("Agent request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Failed to post to agent API")]
    Status(reqwest::StatusCode),

    #[error("Invalid agent response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Asks the agent query service a question.
///
/// Failures talking to the service are reported inside the result with
/// `success: false`; the node itself always succeeds.
pub struct AgentNode {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl AgentNode {
    pub fn new(base_url: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: Option<String>) -> Self {
        Self { client, base_url }
    }

    /// Pick the question out of the merged input
    pub fn question_from(input: &Value) -> String {
        let present = |v: &&Value| !v.is_null() && v.as_str() != Some("");
        let field = input
            .pointer("/inputData/question")
            .filter(present)
            .or_else(|| input.get("question").filter(present));

        match field.unwrap_or(input) {
            Value::Null => DEFAULT_QUESTION.to_string(),
            Value::String(s) if s.is_empty() => DEFAULT_QUESTION.to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    async fn query(&self, question: &str) -> Result<Value, AgentError> {
        let base_url = self.base_url.as_deref().ok_or(AgentError::NotConfigured)?;
        let url = format!("{}/query", base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&json!({ "question": question }))
            .send()
            .await
            .map_err(AgentError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "Agent API rejected query");
            return Err(AgentError::Status(status));
        }

        response.json::<Value>().await.map_err(AgentError::Decode)
    }
}

#[async_trait]
impl NodeBehavior for AgentNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Agent
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let question = Self::question_from(&ctx.input);
        ctx.events.info(format!("Querying agent: {}", question));

        match self.query(&question).await {
            Ok(answer) => Ok(json!({
                "agentResult": answer,
                "processedInput": ctx.input,
                "success": true,
                "timestamp": timestamp(),
            })),
            Err(e) => {
                let status = match &e {
                    AgentError::Status(status) => Some(status.as_u16()),
                    _ => None,
                };
                tracing::warn!(node_id = %ctx.node_id, error = %e, ?status, "Agent query failed");
                ctx.events.warn(format!("Agent query failed: {}", e));
                Ok(json!({
                    "agentResult": null,
                    "processedInput": ctx.input,
                    "success": false,
                    "error": e.to_string(),
                    "timestamp": timestamp(),
                }))
            }
        }
    }

    fn metadata(&self) -> BehaviorMetadata {
        BehaviorMetadata {
            description: "Sends a question to the agent query service".to_string(),
            category: "agent".to_string(),
        }
    }
}
