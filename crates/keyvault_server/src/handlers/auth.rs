//! Identity provider endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use keyvault_core::identity::UNAUTHORIZED_DOMAIN_CODE;
use keyvault_core::{derive_user_id, Identity};
use serde::Deserialize;

use crate::{error::HttpError, AppState};

/// Provider code for an unusable credential.
pub const INVALID_CREDENTIAL_CODE: &str = "auth/invalid-credential";

/// Sign-in request.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub origin: String,
    pub display_name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Exchange a display name for a stable identity.
///
/// # Errors
/// `403 auth/unauthorized-domain` for untrusted origins, `400
/// auth/invalid-credential` for a blank name or malformed body.
pub async fn sign_in(
    State(state): State<AppState>,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<Identity>, HttpError> {
    let Json(req) = body.map_err(|rejection| {
        HttpError::new(
            StatusCode::BAD_REQUEST,
            INVALID_CREDENTIAL_CODE,
            rejection.body_text(),
        )
    })?;

    if !state.config.is_authorized_origin(&req.origin) {
        tracing::warn!(origin = %req.origin, "Rejected sign-in from unauthorized origin");
        return Err(HttpError::new(
            StatusCode::FORBIDDEN,
            UNAUTHORIZED_DOMAIN_CODE,
            format!("Origin '{}' is not authorized for sign-in", req.origin),
        ));
    }

    let display_name = req.display_name.trim();
    if display_name.is_empty() {
        return Err(HttpError::new(
            StatusCode::BAD_REQUEST,
            INVALID_CREDENTIAL_CODE,
            "Display name must not be empty",
        ));
    }

    let identity = Identity {
        id: derive_user_id(display_name),
        display_name: display_name.to_string(),
        photo_url: req.photo_url.filter(|url| !url.trim().is_empty()),
    };
    tracing::info!(user_id = %identity.id, "Signed in");
    Ok(Json(identity))
}

/// Sessions live on the client, so sign-out only acknowledges.
pub async fn sign_out() -> StatusCode {
    StatusCode::NO_CONTENT
}
