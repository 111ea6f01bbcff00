use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;

use super::{AppState, blocking};
use crate::core::user::User;
use crate::planner::PlannerError;

#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    email: String,
}

pub async fn list(
    State(planner): State<AppState>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Json<Vec<User>>, PlannerError> {
    let Query(query) = query?;
    let users = blocking(&planner, move |p| p.list_users(query.email.as_deref())).await?;
    Ok(Json(users))
}

pub async fn get(
    State(planner): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, PlannerError> {
    Ok(Json(blocking(&planner, move |p| p.get_user(&id)).await?))
}

/// 201 with the new user, or 200 with the existing one for that address.
pub async fn create(
    State(planner): State<AppState>,
    body: Result<Json<CreateUserBody>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), PlannerError> {
    let Json(body) = body?;
    let (user, created) =
        blocking(&planner, move |p| p.find_or_create_user(&body.email, Utc::now())).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(user)))
}
