use axum::{
    extract::{Path, State},
    Json,
};
use mongodb::bson::doc;
use serde_json::Value;

use crate::db::models::{document_to_json, COURSES};
use crate::{error::ApiError, AppState};

pub async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Value>>, ApiError> {
    let courses = state.store()?.find(COURSES, doc! {}).await?;
    Ok(Json(courses.into_iter().map(document_to_json).collect()))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let course = state
        .store()?
        .find_one(COURSES, doc! { "id": course_id.as_str() })
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    Ok(Json(document_to_json(course)))
}
