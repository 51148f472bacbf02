use crate::timestamp;
use async_trait::async_trait;
use canvascore::{BehaviorMetadata, NodeBehavior, NodeContext, NodeError, NodeKind, Value};
use rand::Rng;
use serde_json::json;

const POOL_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const POOL_ID_LEN: usize = 9;

/// Stores its input in a freshly identified pool
pub struct PoolNode;

impl PoolNode {
    fn pool_id() -> String {
        let mut rng = rand::thread_rng();
        (0..POOL_ID_LEN)
            .map(|_| POOL_ID_ALPHABET[rng.gen_range(0..POOL_ID_ALPHABET.len())] as char)
            .collect()
    }
}

#[async_trait]
impl NodeBehavior for PoolNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Pool
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let pool_id = Self::pool_id();
        ctx.events.info(format!("Stored input in pool {}", pool_id));

        Ok(json!({
            "poolData": ctx.input,
            "poolStatus": "stored",
            "poolId": pool_id,
            "timestamp": timestamp(),
        }))
    }

    fn metadata(&self) -> BehaviorMetadata {
        BehaviorMetadata {
            description: "Stores its input in a new pool".to_string(),
            category: "pool".to_string(),
        }
    }
}
