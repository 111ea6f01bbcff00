use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use super::{AppState, blocking};
use super::tasks::OwnerQuery;
use crate::core::notification::Notification;
use crate::planner::PlannerError;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default, deserialize_with = "query_flag")]
    unread: bool,
}

/// Accepts `true`/`false` as well as `1`/`0`; an empty value is false.
fn query_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" => Ok(false),
        "1" | "true" => Ok(true),
        other => Err(serde::de::Error::custom(format!(
            "expected true, false, 1 or 0, got {:?}",
            other
        ))),
    }
}

pub async fn list(
    State(planner): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Notification>>, PlannerError> {
    let Query(query) = query?;
    let items = blocking(&planner, move |p| {
        p.list_notifications(query.user_id.as_deref(), query.unread)
    })
    .await?;
    Ok(Json(items))
}

pub async fn create(
    State(planner): State<AppState>,
    body: Result<Json<Notification>, JsonRejection>,
) -> Result<(StatusCode, Json<Notification>), PlannerError> {
    let Json(notification) = body?;
    let (stored, created) = blocking(&planner, move |p| p.add_notification(notification)).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(stored)))
}

pub async fn sweep(State(planner): State<AppState>) -> Result<Json<Value>, PlannerError> {
    let report = blocking(&planner, |p| p.sweep_reminders(Utc::now())).await?;
    Ok(Json(json!({
        "success": true,
        "created": report.created(),
        "report": report,
    })))
}

pub async fn mark_read(
    State(planner): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, PlannerError> {
    Ok(Json(blocking(&planner, move |p| p.mark_read(&id)).await?))
}

pub async fn mark_all_read(
    State(planner): State<AppState>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> Result<Json<Value>, PlannerError> {
    let Query(query) = query?;
    let updated = blocking(&planner, move |p| p.mark_all_read(query.user_id.as_deref())).await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

pub async fn remove(
    State(planner): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, PlannerError> {
    let removed = blocking(&planner, move |p| p.delete_notification(&id)).await?;
    Ok(Json(json!({ "success": true, "deleted": removed })))
}

pub async fn clear(
    State(planner): State<AppState>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> Result<Json<Value>, PlannerError> {
    let Query(query) = query?;
    let removed = blocking(&planner, move |p| p.clear_notifications(query.user_id.as_deref())).await?;
    Ok(Json(json!({ "success": true, "deleted": removed })))
}
