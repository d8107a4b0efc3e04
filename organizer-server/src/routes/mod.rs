pub mod calendar;
pub mod contacts;
pub mod health;
pub mod natural;
pub mod tasks;

use axum::{
    Json,
    http::{StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use organizer_core::{LlmError, OrganizerError};

/// Standard API error body: `{"error": {"message", "status_code", "path"}}`.
#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub status_code: u16,
    pub path: String,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
    path: String,
    retry_after: Option<u64>,
}

impl ApiError {
    pub fn not_found(what: &str, path: &str) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: format!("{what} not found"),
            path: path.to_string(),
            retry_after: None,
        }
    }

    /// Map a core error onto an HTTP status: validation → 422, rate
    /// limiting → 429 with Retry-After, everything else → 500.
    pub fn from_error(err: OrganizerError, path: &str) -> Self {
        let (status, retry_after) = match &err {
            OrganizerError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, None),
            OrganizerError::Llm(LlmError::RateLimit { retry_after }) => {
                (StatusCode::TOO_MANY_REQUESTS, Some(*retry_after))
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        ApiError {
            status,
            message: err.to_string(),
            path: path.to_string(),
            retry_after,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: ErrorDetail {
                message: self.message,
                status_code: self.status.as_u16(),
                path: self.path,
            },
        });
        let mut response = (self.status, body).into_response();
        if let Some(secs) = self.retry_after
            && let Ok(value) = secs.to_string().parse()
        {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        response
    }
}
