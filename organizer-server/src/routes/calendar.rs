//! Calendar event endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    routing::{get, put},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use organizer_core::model::{CalendarEvent, EventDraft, EventType};
use organizer_core::store::EventFilter;
use organizer_core::validate;

use crate::routes::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendar/events", get(list_events).post(create_event))
        .route("/calendar/events/{id}", put(update_event).delete(delete_event))
}

/// POST /calendar/events - create an event
async fn create_event(
    State(state): State<AppState>,
    uri: Uri,
    Json(draft): Json<EventDraft>,
) -> Result<(StatusCode, Json<CalendarEvent>), ApiError> {
    let event = CalendarEvent::new(draft)
        .map_err(|e| ApiError::from_error(e.into(), uri.path()))?;
    state
        .store
        .create_event(&event)
        .map_err(|e| ApiError::from_error(e, uri.path()))?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Deserialize)]
pub struct ListEventsQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub event_type: Option<String>,
    pub limit: Option<usize>,
}

/// GET /calendar/events - list events, optionally windowed
async fn list_events(
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<CalendarEvent>>, ApiError> {
    let mut filter = EventFilter {
        limit: query.limit,
        ..Default::default()
    };
    if let Some(start) = query.start.as_deref() {
        filter.start = Some(
            validate::validate_datetime(start, "start")
                .map_err(|e| ApiError::from_error(e.into(), uri.path()))?,
        );
    }
    if let Some(end) = query.end.as_deref() {
        filter.end = Some(
            validate::validate_datetime(end, "end")
                .map_err(|e| ApiError::from_error(e.into(), uri.path()))?,
        );
    }
    if let Some(event_type) = query.event_type.as_deref() {
        filter.event_type = Some(
            EventType::parse(event_type)
                .map_err(|e| ApiError::from_error(e.into(), uri.path()))?,
        );
    }

    let events = state
        .store
        .list_events(&filter)
        .map_err(|e| ApiError::from_error(e, uri.path()))?;
    Ok(Json(events))
}

/// PUT /calendar/events/:id - replace an event's fields
async fn update_event(
    State(state): State<AppState>,
    uri: Uri,
    Path(id): Path<Uuid>,
    Json(draft): Json<EventDraft>,
) -> Result<Json<CalendarEvent>, ApiError> {
    let existing = state
        .store
        .get_event(id)
        .map_err(|e| ApiError::from_error(e, uri.path()))?
        .ok_or_else(|| ApiError::not_found("Event", uri.path()))?;

    let mut event = CalendarEvent::new(draft)
        .map_err(|e| ApiError::from_error(e.into(), uri.path()))?;
    event.id = existing.id;
    event.created_at = existing.created_at;
    event.updated_at = Utc::now();

    let updated = state
        .store
        .update_event(&event)
        .map_err(|e| ApiError::from_error(e, uri.path()))?;
    if !updated {
        return Err(ApiError::not_found("Event", uri.path()));
    }
    Ok(Json(event))
}

/// DELETE /calendar/events/:id
async fn delete_event(
    State(state): State<AppState>,
    uri: Uri,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .store
        .delete_event(id)
        .map_err(|e| ApiError::from_error(e, uri.path()))?;
    if !deleted {
        return Err(ApiError::not_found("Event", uri.path()));
    }
    Ok(StatusCode::NO_CONTENT)
}
