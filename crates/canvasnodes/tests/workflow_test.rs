// crates/canvasnodes/tests/workflow_test.rs

use canvascore::{GraphStore, NodeKind, NodeSpec, NodeStatus, RunStatus, Value};
use canvasnodes::NodesConfig;
use canvasruntime::{CanvasRuntime, NodeRegistry, RuntimeConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn build_runtime(nodes: Vec<NodeSpec>, edges: &[(&str, &str)], config: NodesConfig) -> CanvasRuntime {
    let mut registry = NodeRegistry::new();
    canvasnodes::register_all(&mut registry, &config);

    let mut graph = GraphStore::new();
    for spec in nodes {
        graph.insert(spec).unwrap();
    }
    for (source, target) in edges {
        graph.connect(source, target).unwrap();
    }
    CanvasRuntime::with_graph(graph, Arc::new(registry), RuntimeConfig::headless())
}

fn node(id: &str, kind: NodeKind) -> NodeSpec {
    NodeSpec::new(kind).with_id(id)
}

fn quick_watch() -> NodesConfig {
    NodesConfig::default().with_watch_delay(Duration::from_millis(5))
}

async fn result_in_store(rt: &CanvasRuntime, id: &str) -> (NodeStatus, Option<Value>) {
    let graph = rt.graph().read().await;
    let data = &graph.node(id).unwrap().data;
    (data.status, data.result.clone())
}

#[tokio::test]
async fn test_start_trigger_output_pipeline() {
    let rt = build_runtime(
        vec![
            node("s", NodeKind::Start),
            node("t", NodeKind::Trigger),
            node("o", NodeKind::Output),
        ],
        &[("s", "t"), ("t", "o")],
        NodesConfig::default(),
    );

    let report = rt.run().await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.executed_nodes(), ["s", "t", "o"]);

    let start = report.result_of("s").unwrap();
    assert_eq!(start["message"], "Workflow started");
    assert_eq!(report.result_of("t").unwrap()["triggerData"], *start);
    assert_eq!(
        report.result_of("o").unwrap()["finalResult"],
        *report.result_of("t").unwrap()
    );

    let (status, bundle) = result_in_store(&rt, "o").await;
    let bundle = bundle.unwrap();
    assert_eq!(status, NodeStatus::Success);
    assert_eq!(bundle["executedNodes"], json!(["s", "t", "o"]));
    assert_eq!(bundle["summary"], "Workflow completed. Executed 3 nodes.");
    assert_eq!(bundle["workflowResults"]["t"]["triggered"], true);
}

#[tokio::test]
async fn test_lone_test_node_uses_configured_question() {
    let rt = build_runtime(
        vec![node("q", NodeKind::Test).with_config("question", "ping")],
        &[],
        NodesConfig::default(),
    );

    let report = rt.run().await.unwrap();
    let result = report.result_of("q").unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(result["inputData"], json!({ "question": "ping" }));
    assert_eq!(result["question"], "ping");
    assert_eq!(result["testResult"], "Test node executed successfully");
}

#[tokio::test]
async fn test_agent_receives_question_from_test_node() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({ "question": "ping" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "pong" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let rt = build_runtime(
        vec![
            node("q", NodeKind::Test).with_config("question", "ping"),
            node("a", NodeKind::Agent),
            node("o", NodeKind::Output),
        ],
        &[("q", "a"), ("a", "o")],
        NodesConfig::default().with_agent_api_url(mock_server.uri()),
    );

    let report = rt.run().await.unwrap();
    let agent = report.result_of("a").unwrap();

    assert_eq!(agent["success"], true);
    assert_eq!(agent["agentResult"]["answer"], "pong");
    assert_eq!(agent["processedInput"], *report.result_of("q").unwrap());
    mock_server.verify().await;
}

#[tokio::test]
async fn test_unreachable_agent_does_not_fail_the_run() {
    let rt = build_runtime(
        vec![
            node("s", NodeKind::Start),
            node("a", NodeKind::Agent),
            node("o", NodeKind::Output),
        ],
        &[("s", "a"), ("a", "o")],
        NodesConfig::default(),
    );

    let report = rt.run().await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert!(report.failed.is_empty());
    assert_eq!(report.executed_nodes(), ["s", "a", "o"]);
    assert_eq!(report.result_of("a").unwrap()["success"], false);

    let (status, _) = result_in_store(&rt, "a").await;
    assert_eq!(status, NodeStatus::Success);
}

#[tokio::test]
async fn test_pool_feeds_watcher() {
    let rt = build_runtime(
        vec![
            node("s", NodeKind::Start),
            node("p", NodeKind::Pool),
            node("w", NodeKind::PoolWatcher),
            node("o", NodeKind::Output),
        ],
        &[("s", "p"), ("p", "w"), ("w", "o")],
        quick_watch(),
    );

    let report = rt.run().await.unwrap();
    let pool = report.result_of("p").unwrap();
    let watcher = report.result_of("w").unwrap();

    assert_eq!(report.executed_nodes().len(), 4);
    assert_eq!(pool["poolData"]["message"], "Workflow started");
    assert_eq!(watcher["inputData"]["poolId"], pool["poolId"]);
    assert_eq!(watcher["watchStatus"], "monitoring");
}

#[tokio::test]
async fn test_rerun_produces_same_shape() {
    let rt = build_runtime(
        vec![
            node("s", NodeKind::Start),
            node("p", NodeKind::Pool),
            node("o", NodeKind::Output),
        ],
        &[("s", "p"), ("p", "o")],
        quick_watch(),
    );

    let first = rt.run().await.unwrap();
    let second = rt.run().await.unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.executed_nodes(), second.executed_nodes());
    for id in ["s", "p", "o"] {
        let keys = |v: &Value| {
            let mut keys: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        };
        assert_eq!(
            keys(first.result_of(id).unwrap()),
            keys(second.result_of(id).unwrap())
        );
    }
    // pool ids are drawn fresh each run
    assert_ne!(
        first.result_of("p").unwrap()["poolId"],
        second.result_of("p").unwrap()["poolId"]
    );
}
