use crate::timestamp;
use async_trait::async_trait;
use canvascore::{BehaviorMetadata, NodeBehavior, NodeContext, NodeError, NodeKind, Value};
use rand::Rng;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

/// Watches a pool for a while and reports what changed
pub struct PoolWatcherNode {
    watch_delay: Duration,
}

impl PoolWatcherNode {
    pub fn new(watch_delay: Duration) -> Self {
        Self { watch_delay }
    }
}

#[async_trait]
impl NodeBehavior for PoolWatcherNode {
    fn kind(&self) -> NodeKind {
        NodeKind::PoolWatcher
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        ctx.events
            .info(format!("Monitoring pool for {}ms", self.watch_delay.as_millis()));

        sleep(self.watch_delay).await;

        let pool_changes: u32 = rand::thread_rng().gen_range(0..10);
        Ok(json!({
            "watchStatus": "monitoring",
            "poolChanges": pool_changes,
            "lastUpdate": timestamp(),
            "inputData": ctx.input,
        }))
    }

    fn metadata(&self) -> BehaviorMetadata {
        BehaviorMetadata {
            description: "Monitors a pool and reports observed changes".to_string(),
            category: "pool".to_string(),
        }
    }
}
