use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, blocking};
use crate::core::task::{Task, TaskDraft};
use crate::planner::{ExtractionReport, PlannerError};

#[derive(Debug, Default, Deserialize)]
pub struct OwnerQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddTasksBody {
    #[serde(default)]
    tasks: Vec<TaskDraft>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskBody {
    task: TaskDraft,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeBody {
    text: String,
    #[serde(default)]
    user_id: Option<String>,
}

pub async fn list(
    State(planner): State<AppState>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> Result<Json<Vec<Task>>, PlannerError> {
    let Query(query) = query?;
    let tasks = blocking(&planner, move |p| p.list_tasks(query.user_id.as_deref())).await?;
    Ok(Json(tasks))
}

pub async fn add(
    State(planner): State<AppState>,
    body: Result<Json<AddTasksBody>, JsonRejection>,
) -> Result<Json<Value>, PlannerError> {
    let Json(body) = body?;
    let outcome = blocking(&planner, move |p| p.add_tasks(body.tasks, Utc::now())).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("{} new tasks added", outcome.added.len()),
        "count": outcome.total,
        "added": outcome.added,
        "duplicates": outcome.duplicates,
        "rejected": outcome.rejected,
        "notifications": outcome.notifications,
    })))
}

pub async fn analyze(
    State(planner): State<AppState>,
    body: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Result<Json<ExtractionReport>, PlannerError> {
    let Json(body) = body?;
    let report = planner
        .analyze_text(&body.text, body.user_id, Utc::now())
        .await?;
    Ok(Json(report))
}

pub async fn update(
    State(planner): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateTaskBody>, JsonRejection>,
) -> Result<Json<Task>, PlannerError> {
    let Json(body) = body?;
    let task = blocking(&planner, move |p| p.update_task(&id, body.task, Utc::now())).await?;
    Ok(Json(task))
}

pub async fn remove(
    State(planner): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, PlannerError> {
    let task = blocking(&planner, move |p| p.delete_task(&id)).await?;
    Ok(Json(json!({ "success": true, "deleted": task })))
}
