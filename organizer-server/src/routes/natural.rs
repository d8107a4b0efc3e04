//! Natural-language processing endpoint.

use axum::{Json, Router, extract::State, http::Uri, routing::post};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use organizer_core::validate;

use crate::routes::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/process/natural", post(process_natural))
}

#[derive(Deserialize)]
pub struct ProcessRequest {
    pub text: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct ProcessResponse {
    pub response: String,
    pub actions_taken: Vec<String>,
    pub cost_usd: f64,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

/// POST /process/natural - run the extraction pipeline on free text
async fn process_natural(
    State(state): State<AppState>,
    uri: Uri,
    Json(body): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    // Reject bad input before it reaches the provider
    let text = validate::validate_text(&body.text, "text", 1, 2000, false)
        .map_err(|e| ApiError::from_error(e.into(), uri.path()))?;
    debug!(
        chars = text.len(),
        user_id = ?body.user_id,
        has_context = body.context.is_some(),
        "processing natural language request"
    );

    let outcome = state.dispatcher.process(&text).await;
    Ok(Json(ProcessResponse {
        response: outcome.response,
        actions_taken: outcome.actions_taken,
        cost_usd: outcome.cost_usd,
        data: outcome.data,
    }))
}
