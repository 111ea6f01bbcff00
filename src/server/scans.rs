use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, blocking};
use crate::core::scan::ScanHistory;
use crate::planner::{MailScanReport, PlannerError};

#[derive(Debug, Deserialize)]
pub struct RecordBody {
    #[serde(default)]
    email_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GmailScanBody {
    access_token: String,
    #[serde(default)]
    max_results: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImapScanBody {
    #[serde(default)]
    user_id: Option<String>,
}

pub async fn history(
    State(planner): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ScanHistory>, PlannerError> {
    Ok(Json(blocking(&planner, move |p| p.scan_history(&user_id)).await?))
}

pub async fn record(
    State(planner): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<RecordBody>, JsonRejection>,
) -> Result<Json<ScanHistory>, PlannerError> {
    let Json(body) = body?;
    let history = blocking(&planner, move |p| {
        p.record_scan(&user_id, &body.email_ids, Utc::now())
    })
    .await?;
    Ok(Json(history))
}

pub async fn gmail(
    State(planner): State<AppState>,
    body: Result<Json<GmailScanBody>, JsonRejection>,
) -> Result<Json<Value>, PlannerError> {
    let Json(body) = body?;
    let (user, report) = planner
        .scan_gmail(&body.access_token, body.max_results, Utc::now())
        .await?;
    Ok(Json(json!({ "user": user, "scan": report })))
}

/// The body is optional; without one the account's configured owner is used.
pub async fn imap(
    State(planner): State<AppState>,
    raw: Bytes,
) -> Result<Json<MailScanReport>, PlannerError> {
    let body: ImapScanBody = if raw.iter().all(u8::is_ascii_whitespace) {
        ImapScanBody::default()
    } else {
        serde_json::from_slice(&raw).map_err(|e| PlannerError::InvalidInput(e.to_string()))?
    };
    let report = planner
        .scan_imap(body.user_id.as_deref(), Utc::now())
        .await?;
    Ok(Json(report))
}
