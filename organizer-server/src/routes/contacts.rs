//! Contact endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, Uri},
    routing::get,
};
use serde::Deserialize;

use organizer_core::model::{Contact, ContactDraft};
use organizer_core::store::ContactFilter;

use crate::routes::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/contacts", get(list_contacts).post(create_contact))
}

/// POST /contacts - create a contact
async fn create_contact(
    State(state): State<AppState>,
    uri: Uri,
    Json(draft): Json<ContactDraft>,
) -> Result<(StatusCode, Json<Contact>), ApiError> {
    let contact = Contact::new(draft).map_err(|e| ApiError::from_error(e.into(), uri.path()))?;
    state
        .store
        .create_contact(&contact)
        .map_err(|e| ApiError::from_error(e, uri.path()))?;
    Ok((StatusCode::CREATED, Json(contact)))
}

#[derive(Deserialize)]
pub struct ListContactsQuery {
    pub search: Option<String>,
    pub limit: Option<usize>,
}

/// GET /contacts - list contacts, optionally filtered by a search term
async fn list_contacts(
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<ListContactsQuery>,
) -> Result<Json<Vec<Contact>>, ApiError> {
    let contacts = state
        .store
        .list_contacts(&ContactFilter {
            search: query.search,
            limit: query.limit,
        })
        .map_err(|e| ApiError::from_error(e, uri.path()))?;
    Ok(Json(contacts))
}
