use actix_cors::Cors;
use actix_web::{
    delete, get, post, put, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult,
};
use actix_ws::Message;
use canvascore::{GraphError, NodeSpec, Value};
use canvasnodes::NodesConfig;
use canvasruntime::{CanvasRuntime, NodeRegistry, RuntimeConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
struct AppState {
    runtime: Arc<CanvasRuntime>,
}

/// Request body for setting one config entry
#[derive(Debug, Deserialize)]
struct ConfigUpdate {
    key: String,
    value: Value,
}

/// Request body for renaming a node
#[derive(Debug, Deserialize)]
struct LabelUpdate {
    label: String,
}

/// Request body for connecting two nodes
#[derive(Debug, Deserialize)]
struct EdgeRequest {
    source: String,
    target: String,
}

/// Response for created nodes and edges
#[derive(Debug, Serialize)]
struct CreatedResponse {
    id: String,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn graph_error(e: GraphError) -> HttpResponse {
    let body = ErrorResponse {
        error: e.to_string(),
    };
    match e {
        GraphError::NodeNotFound(_) | GraphError::EdgeNotFound(_) => {
            HttpResponse::NotFound().json(body)
        }
        GraphError::DuplicateNode(_) | GraphError::DuplicateEdge { .. } => {
            HttpResponse::Conflict().json(body)
        }
        GraphError::InvalidEdge { .. } | GraphError::SelfLoop(_) => {
            HttpResponse::BadRequest().json(body)
        }
    }
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "canvas"
    }))
}

/// Current nodes and edges with their run state
#[get("/api/graph")]
async fn get_graph(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let snapshot = data.runtime.graph().read().await.snapshot();
    Ok(HttpResponse::Ok().json(snapshot))
}

/// Drop a node on the canvas
#[post("/api/nodes")]
async fn create_node(
    data: web::Data<AppState>,
    spec: web::Json<NodeSpec>,
) -> ActixResult<impl Responder> {
    let spec = spec.into_inner();
    let kind = spec.kind;

    match data.runtime.graph().write().await.insert(spec) {
        Ok(id) => {
            info!("Added {} node {}", kind, id);
            Ok(HttpResponse::Created().json(CreatedResponse { id }))
        }
        Err(e) => Ok(graph_error(e)),
    }
}

/// Remove a node and every edge touching it
#[delete("/api/nodes/{id}")]
async fn delete_node(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let node_id = path.into_inner();

    match data.runtime.graph().write().await.remove_node(&node_id) {
        Ok(node) => {
            info!("Removed node {}", node_id);
            Ok(HttpResponse::Ok().json(node))
        }
        Err(e) => Ok(graph_error(e)),
    }
}

/// Set one configuration entry on a node
#[put("/api/nodes/{id}/config")]
async fn update_node_config(
    data: web::Data<AppState>,
    path: web::Path<String>,
    update: web::Json<ConfigUpdate>,
) -> ActixResult<impl Responder> {
    let node_id = path.into_inner();
    let ConfigUpdate { key, value } = update.into_inner();

    let mut graph = data.runtime.graph().write().await;
    if let Err(e) = graph.set_config(&node_id, key, value) {
        return Ok(graph_error(e));
    }
    Ok(HttpResponse::Ok().json(graph.node(&node_id)))
}

#[put("/api/nodes/{id}/label")]
async fn update_node_label(
    data: web::Data<AppState>,
    path: web::Path<String>,
    update: web::Json<LabelUpdate>,
) -> ActixResult<impl Responder> {
    let node_id = path.into_inner();

    let mut graph = data.runtime.graph().write().await;
    if let Err(e) = graph.set_label(&node_id, update.into_inner().label) {
        return Ok(graph_error(e));
    }
    Ok(HttpResponse::Ok().json(graph.node(&node_id)))
}

/// Connect two nodes
#[post("/api/edges")]
async fn create_edge(
    data: web::Data<AppState>,
    edge: web::Json<EdgeRequest>,
) -> ActixResult<impl Responder> {
    let EdgeRequest { source, target } = edge.into_inner();

    match data.runtime.graph().write().await.connect(&source, &target) {
        Ok(id) => {
            info!("Connected {} -> {}", source, target);
            Ok(HttpResponse::Created().json(CreatedResponse { id }))
        }
        Err(e) => Ok(graph_error(e)),
    }
}

/// Remove an edge
#[delete("/api/edges/{id}")]
async fn delete_edge(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let edge_id = path.into_inner();

    match data.runtime.graph().write().await.disconnect(&edge_id) {
        Ok(edge) => Ok(HttpResponse::Ok().json(edge)),
        Err(e) => Ok(graph_error(e)),
    }
}

/// Start a run in the background; ignored while one is active
#[post("/api/run")]
async fn start_run(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let started = data.runtime.spawn_run();
    if started {
        info!("Workflow run started");
    } else {
        warn!("Run requested while another is active");
    }
    Ok(HttpResponse::Accepted().json(serde_json::json!({ "started": started })))
}

/// Status of the active or most recent run
#[get("/api/run")]
async fn run_status(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": data.runtime.status().await,
        "lastRun": data.runtime.last_run().await,
    })))
}

/// WebSocket endpoint for real-time events
#[get("/api/events")]
async fn websocket_events(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected");

    let mut events = data.runtime.subscribe_events();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("WebSocket client lagged, {} events dropped", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }

                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("WebSocket client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

/// List available node types
#[get("/api/node-types")]
async fn list_node_types(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let registry = data.runtime.registry();

    let nodes: Vec<_> = registry
        .list_node_kinds()
        .into_iter()
        .map(|kind| {
            let metadata = registry.metadata(kind);
            serde_json::json!({
                "type": kind,
                "name": kind.display_name(),
                "defaultLabel": kind.default_label(),
                "description": metadata.as_ref().map(|m| m.description.clone()).unwrap_or_default(),
                "category": metadata.as_ref().map(|m| m.category.clone()).unwrap_or_default(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(nodes))
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(get_graph)
        .service(create_node)
        .service(delete_node)
        .service(update_node_config)
        .service(update_node_label)
        .service(create_edge)
        .service(delete_edge)
        .service(start_run)
        .service(run_status)
        .service(websocket_events)
        .service(list_node_types);
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚀 Starting Canvas Server");

    let nodes_config = NodesConfig::from_env();
    if nodes_config.agent_api_url.is_none() {
        warn!("AGENT_API_URL is not set; agent nodes will report failures");
    }

    let mut registry = NodeRegistry::new();
    canvasnodes::register_all(&mut registry, &nodes_config);

    let runtime = CanvasRuntime::with_registry(Arc::new(registry), RuntimeConfig::from_env());

    info!("✅ Runtime initialized with built-in nodes");

    let app_state = web::Data::new(AppState {
        runtime: Arc::new(runtime),
    });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    info!("🌐 Server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .configure(routes)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
