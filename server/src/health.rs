use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub database: String,
    pub mail: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let database = if state.store.is_some() { "connected" } else { "not connected" };
    let mail = if state.mail_configured { "configured" } else { "not configured" };

    Json(HealthCheckResponse {
        status: "ok".to_string(),
        database: database.to_string(),
        mail: mail.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_degraded_database() {
        let Json(body) = health_check(State(AppState::new(None, true))).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.database, "not connected");
        assert_eq!(body.mail, "configured");
    }
}
