//! Paste document handlers.
//!
//! The caller identity is whatever the `x-keyvault-uid` header says. Writes
//! must come from the author; private pastes are readable by their author only.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use keyvault_core::constants::USER_ID_HEADER;
use keyvault_core::{Paste, PasteDocument, StoreErrorCode};
use serde::{Deserialize, Serialize};

use crate::{error::HttpError, AppState};

/// Response body for a created paste.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedPaste {
    pub id: String,
}

/// Response body for a view increment.
#[derive(Debug, Serialize, Deserialize)]
pub struct ViewCount {
    pub views: u64,
}

/// Query parameters for listing pastes.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub author_id: Option<String>,
}

fn caller_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn json_rejection(rejection: JsonRejection) -> HttpError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return HttpError::store(StoreErrorCode::PayloadTooLarge, rejection.body_text());
    }
    HttpError::invalid_argument(rejection.body_text())
}

fn ensure_readable(paste: &Paste, headers: &HeaderMap) -> Result<(), HttpError> {
    if paste.is_private && caller_id(headers) != Some(paste.author_id.as_str()) {
        return Err(HttpError::permission_denied(
            "This paste is private to its author",
        ));
    }
    Ok(())
}

fn load_readable(state: &AppState, id: &str, headers: &HeaderMap) -> Result<Paste, HttpError> {
    let paste = state
        .db
        .pastes
        .get(id)?
        .ok_or_else(|| HttpError::not_found(format!("No paste with id '{}'", id)))?;
    ensure_readable(&paste, headers)?;
    Ok(paste)
}

/// Insert a paste under a generated id.
///
/// # Returns
/// `201` with the new id.
///
/// # Errors
/// `403` when the caller is not the declared author, `413` when the content
/// exceeds `max_paste_size`, `400` for malformed bodies and for an
/// `expires_at` that disagrees with the duration or is not in the future.
pub async fn create_paste(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<PasteDocument>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedPaste>), HttpError> {
    let Json(document) = body.map_err(json_rejection)?;

    if document.author_id.trim().is_empty() {
        return Err(HttpError::invalid_argument("author_id is required"));
    }
    if caller_id(&headers) != Some(document.author_id.as_str()) {
        return Err(HttpError::permission_denied(
            "Pastes can only be created by their author",
        ));
    }
    if document.content.len() > state.config.max_paste_size {
        return Err(HttpError::store(
            StoreErrorCode::PayloadTooLarge,
            format!(
                "Paste size exceeds maximum of {} bytes",
                state.config.max_paste_size
            ),
        ));
    }

    let paste = state.db.pastes.insert(document, state.clock.now_millis())?;
    tracing::info!(paste_id = %paste.id, author_id = %paste.author_id, "Stored paste");
    Ok((StatusCode::CREATED, Json(CreatedPaste { id: paste.id })))
}

/// Fetch one paste. Expired rows are still returned.
pub async fn get_paste(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Paste>, HttpError> {
    Ok(Json(load_readable(&state, &id, &headers)?))
}

/// Add one to a paste's view counter.
pub async fn increment_views(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ViewCount>, HttpError> {
    load_readable(&state, &id, &headers)?;
    let views = state
        .db
        .pastes
        .increment_views(&id)?
        .ok_or_else(|| HttpError::not_found(format!("No paste with id '{}'", id)))?;
    Ok(Json(ViewCount { views }))
}

/// List the caller's own pastes, unordered.
pub async fn list_pastes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Paste>>, HttpError> {
    let author_id = query
        .author_id
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| HttpError::invalid_argument("author_id query parameter is required"))?;
    if caller_id(&headers) != Some(author_id.as_str()) {
        return Err(HttpError::permission_denied(
            "Pastes can only be listed by their author",
        ));
    }
    Ok(Json(state.db.pastes.list_by_author(&author_id)?))
}
