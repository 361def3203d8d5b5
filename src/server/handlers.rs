//! Route handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::AppState;
use crate::error::ApiError;
use crate::record::{coerce_payload, BiodataRecord, RecordId};
use crate::storage::NamePattern;

/// `?name=` query for name search
#[derive(Debug, Deserialize)]
pub struct NameQuery {
    name: Option<String>,
}

/// Acknowledgement body for create and delete
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

pub async fn submit(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = state.pipeline.submit(json_body(body)?).await?;

    Ok(Json(MessageResponse {
        message: "Data saved successfully!",
        id: Some(id),
    }))
}

pub async fn get_all(State(state): State<AppState>) -> Result<Json<Vec<BiodataRecord>>, ApiError> {
    Ok(Json(state.store.find_all().await?))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BiodataRecord>, ApiError> {
    state
        .store
        .find_by_id(&RecordId::from(id))
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

pub async fn get_by_name(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Vec<BiodataRecord>>, ApiError> {
    let pattern = NamePattern::new(query.name.as_deref())?;
    let found = state.store.find_by_name(&pattern).await?;
    debug!("Name query {:?} matched {} records", query.name, found.len());
    Ok(Json(found))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BiodataRecord>, ApiError> {
    let Value::Object(patch) = json_body(body)? else {
        return Err(ApiError::validation("Update must be a JSON object"));
    };
    let patch = coerce_payload(&patch)?;

    state
        .store
        .update_by_id(&RecordId::from(id), &patch)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = RecordId::from(id);
    if !state.store.delete_by_id(&id).await? {
        debug!("Delete of {} matched no record", id);
    }

    Ok(Json(MessageResponse {
        message: "Data deleted successfully!",
        id: None,
    }))
}

pub async fn health(State(state): State<AppState>) -> Response {
    match state.store.health_check().await {
        Ok(status) if status.healthy => Json(json!({
            "status": "ok",
            "backend": status.backend_type,
            "records": status.record_count,
            "processorsInFlight": state.pipeline.processors().in_flight(),
        }))
        .into_response(),
        Ok(status) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "backend": status.backend_type })),
        )
            .into_response(),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
