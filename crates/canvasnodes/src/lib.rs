//! Built-in node behaviors
//!
//! One behavior per canvas node kind

mod agent;
mod config;
mod output;
mod pool;
mod start;
mod test_node;
mod trigger;
mod watcher;

pub use agent::{AgentError, AgentNode};
pub use config::NodesConfig;
pub use output::OutputNode;
pub use pool::PoolNode;
pub use start::StartNode;
pub use test_node::TestNode;
pub use trigger::TriggerNode;
pub use watcher::PoolWatcherNode;
use canvasruntime::NodeRegistry;

use std::sync::Arc;

/// Register all built-in behaviors with a registry
pub fn register_all(registry: &mut NodeRegistry, config: &NodesConfig) {
    registry.register(Arc::new(StartNode));
    registry.register(Arc::new(TriggerNode));
    registry.register(Arc::new(AgentNode::with_client(
        agent_client(config),
        config.agent_api_url.clone(),
    )));
    registry.register(Arc::new(PoolNode));
    registry.register(Arc::new(PoolWatcherNode::new(config.watch_delay)));
    registry.register(Arc::new(TestNode));
    registry.register(Arc::new(OutputNode));
}

fn agent_client(config: &NodesConfig) -> reqwest::Client {
    let Some(timeout) = config.request_timeout else {
        return reqwest::Client::new();
    };
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default agent client: {}", e);
            reqwest::Client::new()
        })
}

/// RFC 3339 timestamp stamped on every result
pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
