//! HTTP API for idledger node

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use idledger_core::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::runtime::NodeRuntime;

/// API state containing node runtime
pub type ApiState = Arc<NodeRuntime>;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// Contract invocation request
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Node status response
#[derive(Serialize)]
pub struct NodeStatusResponse {
    pub name: String,
    pub backend: String,
    pub state_version: u64,
    pub contracts: Vec<String>,
}

/// Create API router
pub fn create_router(state: ApiState) -> Router {
    let enable_cors = state.config().api.enable_cors;

    let router = Router::new()
        // Health
        .route("/health", get(health))
        .route("/status", get(status))
        // Contracts
        .route("/invoke/:contract", post(invoke))
        .route("/query/:contract", post(query))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

/// Health check
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// Node status
async fn status(State(runtime): State<ApiState>) -> impl IntoResponse {
    let status = NodeStatusResponse {
        name: runtime.config().name.clone(),
        backend: runtime.backend_name().to_string(),
        state_version: runtime.state_version().0,
        contracts: runtime.contract_names(),
    };

    Json(ApiResponse::ok(status))
}

/// Submit a transaction: writes are committed on success
async fn invoke(
    State(runtime): State<ApiState>,
    Path(contract): Path<String>,
    Json(req): Json<InvokeRequest>,
) -> impl IntoResponse {
    dispatch(runtime, contract, req, true).await
}

/// Evaluate a function against committed state without committing
async fn query(
    State(runtime): State<ApiState>,
    Path(contract): Path<String>,
    Json(req): Json<InvokeRequest>,
) -> impl IntoResponse {
    dispatch(runtime, contract, req, false).await
}

async fn dispatch(
    runtime: ApiState,
    contract: String,
    req: InvokeRequest,
    commit: bool,
) -> (StatusCode, Json<ApiResponse<Value>>) {
    if !runtime.has_contract(&contract) {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(format!("Contract not found: {}", contract))),
        );
    }

    // state backends block on I/O
    let result = tokio::task::spawn_blocking(move || {
        if commit {
            runtime.invoke(&contract, &req.function, &req.args)
        } else {
            runtime.query(&contract, &req.function, &req.args)
        }
    })
    .await;

    match result {
        Ok(response) if response.is_success() => {
            (StatusCode::OK, Json(ApiResponse::ok(payload_json(&response))))
        }
        Ok(response) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err(response.message)),
        ),
        Err(e) => {
            error!("Invocation task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("invocation aborted")),
            )
        }
    }
}

/// Payload as JSON; non-JSON payloads are returned as a string
fn payload_json(response: &Response) -> Value {
    match response.payload.as_deref() {
        None => Value::Null,
        Some(bytes) => serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}

/// Start API server
pub async fn start_api_server(runtime: Arc<NodeRuntime>, listen_addr: &str) -> anyhow::Result<()> {
    let router = create_router(runtime);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("API server listening on {}", listen_addr);

    axum::serve(listener, router).await?;

    Ok(())
}
