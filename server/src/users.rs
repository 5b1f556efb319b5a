use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use mongodb::bson;
use serde::Serialize;
use serde_json::Value;

use crate::db::models::USERS;
use crate::{error::ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub id: String,
}

/// Store the posted JSON object as-is; user documents have no fixed shape.
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(payload) = payload?;
    let store = state.store()?;

    if !payload.is_object() {
        return Err(ApiError::BadRequest("User data must be a JSON object".to_string()));
    }
    let document = bson::to_document(&payload)
        .map_err(|e| ApiError::BadRequest(format!("Invalid user data: {}", e)))?;

    let id = store.insert(USERS, document).await?;
    tracing::info!("Registered user {}", id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered".to_string(),
            id: id.to_string(),
        }),
    ))
}
