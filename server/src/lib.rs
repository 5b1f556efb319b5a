pub mod config;
pub mod contact;
pub mod courses;
pub mod db;
pub mod error;
pub mod health;
pub mod logging;
pub mod users;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::DataStore;
use crate::error::ApiError;

/// State shared by every handler. `store` is `None` when the database could
/// not be reached at startup and the server is running degraded.
#[derive(Clone)]
pub struct AppState {
    pub store: Option<DataStore>,
    pub mail_configured: bool,
}

impl AppState {
    pub fn new(store: Option<DataStore>, mail_configured: bool) -> Self {
        Self { store, mail_configured }
    }

    pub fn store(&self) -> Result<&DataStore, ApiError> {
        self.store.as_ref().ok_or(ApiError::Unavailable)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/test", get(health::health_check))
        .route("/courses", get(courses::list_courses))
        .route("/course/{id}", get(courses::get_course))
        .route("/users", post(users::register_user))
        .route("/contact", get(contact::list_contacts).post(contact::create_contact))
        .route("/contact/{id}", patch(contact::mark_contact))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
