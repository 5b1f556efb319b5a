use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::contacts::DEFAULT_CONTACT_LIMIT;
use crate::db::models::ContactMessage;
use crate::{error::ApiError, AppState};

// Missing fields deserialize as empty and are rejected by the store
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactSavedResponse {
    pub message: String,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListContactsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ContactMessageView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub created_at: String,
    pub status: String,
    pub read: bool,
}

impl From<ContactMessage> for ContactMessageView {
    fn from(contact: ContactMessage) -> Self {
        let created_at = contact
            .created_at
            .try_to_rfc3339_string()
            .unwrap_or_else(|_| contact.created_at.timestamp_millis().to_string());
        Self {
            id: contact.id,
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            message: contact.message,
            created_at,
            status: contact.status,
            read: contact.read,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MarkContactRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct MarkContactResponse {
    pub updated: u64,
}

pub async fn create_contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ContactSavedResponse>), ApiError> {
    let Json(payload) = payload?;
    let id = state
        .store()?
        .save_contact_message(&payload.name, &payload.email, &payload.phone, &payload.message)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ContactSavedResponse {
            message: "Contact message saved".to_string(),
            id: id.to_string(),
        }),
    ))
}

pub async fn list_contacts(
    State(state): State<AppState>,
    query: Result<Query<ListContactsQuery>, QueryRejection>,
) -> Result<Json<Vec<ContactMessageView>>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_CONTACT_LIMIT);
    let messages = state.store()?.list_contact_messages(limit).await?;
    Ok(Json(messages.into_iter().map(ContactMessageView::from).collect()))
}

pub async fn mark_contact(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    payload: Result<Json<MarkContactRequest>, JsonRejection>,
) -> Result<Json<MarkContactResponse>, ApiError> {
    let Json(payload) = payload?;
    let updated = state
        .store()?
        .mark_contact_message(&message_id, &payload.status)
        .await?;
    Ok(Json(MarkContactResponse { updated }))
}
