use mongodb::bson::{self, doc};

use super::backend::FindSpec;
use super::models::{ContactMessage, InsertedId, CONTACTS};
use super::{storage_error, DataStore};
use crate::error::{StoreError, StoreResult};

pub const DEFAULT_CONTACT_LIMIT: u32 = 50;

impl DataStore {
    /// Store a message from the contact form. Every field is required.
    pub async fn save_contact_message(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        message: &str,
    ) -> StoreResult<InsertedId> {
        if [name, email, phone, message].iter().any(|field| field.is_empty()) {
            tracing::warn!("Rejected contact message with missing fields");
            return Err(StoreError::Validation("All fields are required".to_string()));
        }

        let contact = ContactMessage::new(
            name.to_string(),
            email.to_string(),
            phone.to_string(),
            message.to_string(),
        );
        let document = bson::to_document(&contact)
            .map_err(|e| storage_error("save_contact_message", CONTACTS, Box::new(e)))?;

        let id = self
            .backend
            .insert_one(CONTACTS, document)
            .await
            .map(InsertedId::new)
            .map_err(|e| storage_error("save_contact_message", CONTACTS, e))?;

        tracing::info!("Contact message saved. ID: {}", id);
        Ok(id)
    }

    /// Most recent contact messages first, at most `limit` of them. Documents
    /// in `contacts` that are not contact messages are skipped.
    pub async fn list_contact_messages(&self, limit: u32) -> StoreResult<Vec<ContactMessage>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let spec = FindSpec {
            sort: Some(doc! { "created_at": -1 }),
            limit: Some(i64::from(limit)),
        };
        let documents = self
            .backend
            .find(CONTACTS, doc! {}, spec)
            .await
            .map_err(|e| storage_error("list_contact_messages", CONTACTS, e))?;

        let messages = documents
            .into_iter()
            .filter_map(|document| {
                let object_id = document.get("_id").cloned();
                match bson::from_document::<ContactMessage>(document) {
                    Ok(message) => Some(message),
                    Err(e) => {
                        tracing::warn!(id = ?object_id, "Skipping malformed contact message: {}", e);
                        None
                    }
                }
            })
            .collect();

        Ok(messages)
    }

    /// Set the status of the message with the given `id` and flag it as read.
    /// Returns 0 when no message has that id.
    pub async fn mark_contact_message(&self, message_id: &str, status: &str) -> StoreResult<u64> {
        self.backend
            .update_one(
                CONTACTS,
                doc! { "id": message_id },
                doc! { "$set": { "status": status, "read": true } },
            )
            .await
            .map_err(|e| storage_error("mark_contact_message", CONTACTS, e))
    }
}
