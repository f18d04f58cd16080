use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, warn};

use crate::device::store::VariableStore;
use crate::device::structures::{SimValue, SimulatedVariable};

#[derive(Clone)]
pub struct SharedAppState {
    pub store: Arc<dyn VariableStore>,
    pub namespace_index: u16,
    pub endpoint_url: String,
    pub tick_count: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl SharedAppState {
    fn node_id(&self, variable: SimulatedVariable) -> String {
        format!("ns={};s={}", self.namespace_index, variable.name())
    }
}

#[derive(Serialize)]
pub struct VariableResponse {
    pub name: String,
    pub node_id: String,
    pub value: SimValue,
}

pub fn create_api_routes() -> Router<SharedAppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/stats", get(stats))
        .route("/api/variables", get(list_variables))
        .route("/api/variables/:name", get(get_variable))
}

async fn health() -> &'static str {
    "Simulated OPC UA Server Running"
}

async fn stats(State(state): State<SharedAppState>) -> impl IntoResponse {
    Json(json!({
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "tick_count": state.tick_count.load(Ordering::Relaxed),
        "namespace_index": state.namespace_index,
        "endpoint_url": state.endpoint_url,
    }))
}

async fn list_variables(State(state): State<SharedAppState>) -> impl IntoResponse {
    let mut variables = Vec::new();
    for variable in SimulatedVariable::ALL {
        match state.store.read(variable).await {
            Ok(value) => variables.push(VariableResponse {
                name: variable.name().to_string(),
                node_id: state.node_id(variable),
                value,
            }),
            Err(e) => {
                error!("Failed to read {}: {}", variable, e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                );
            }
        }
    }
    (StatusCode::OK, Json(json!(variables)))
}

async fn get_variable(
    State(state): State<SharedAppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let variable = match name.parse::<SimulatedVariable>() {
        Ok(variable) => variable,
        Err(e) => {
            warn!("{}", e);
            return (StatusCode::NOT_FOUND, Json(json!({ "error": e })));
        }
    };

    match state.store.read(variable).await {
        Ok(value) => (
            StatusCode::OK,
            Json(json!(VariableResponse {
                name: variable.name().to_string(),
                node_id: state.node_id(variable),
                value,
            })),
        ),
        Err(e) => {
            error!("Failed to read {}: {}", variable, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}
