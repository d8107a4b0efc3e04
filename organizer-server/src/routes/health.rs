//! Health endpoint.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub services: ServiceStatus,
    pub usage: UsageSummary,
}

#[derive(Serialize)]
pub struct ServiceStatus {
    pub database: &'static str,
    pub llm: &'static str,
}

#[derive(Serialize)]
pub struct UsageSummary {
    pub total_cost_usd: f64,
}

/// GET /health - check the store and the LLM provider
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let total_cost = state.store.usage_total_cost();
    let database_ok = total_cost.is_ok();
    let llm_ok = state.provider.health_check().await;

    Json(HealthResponse {
        status: if database_ok && llm_ok { "ok" } else { "degraded" },
        services: ServiceStatus {
            database: if database_ok { "up" } else { "down" },
            llm: if llm_ok { "up" } else { "down" },
        },
        usage: UsageSummary {
            total_cost_usd: total_cost.unwrap_or(0.0),
        },
    })
}
