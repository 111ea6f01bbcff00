use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::mail::MailError;
use crate::planner::PlannerError;

impl PlannerError {
    pub fn status(&self) -> StatusCode {
        match self {
            PlannerError::NotFound(_) => StatusCode::NOT_FOUND,
            PlannerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PlannerError::Store(_) | PlannerError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // An expired or revoked Gmail token is the caller's to fix
            PlannerError::Mail(MailError::Api { status: 401, .. }) => StatusCode::UNAUTHORIZED,
            PlannerError::Ai(_) | PlannerError::Mail(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for PlannerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::debug!("Request rejected: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for PlannerError {
    fn from(rejection: JsonRejection) -> Self {
        PlannerError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for PlannerError {
    fn from(rejection: QueryRejection) -> Self {
        PlannerError::InvalidInput(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiError;

    #[test]
    fn statuses() {
        assert_eq!(
            PlannerError::NotFound("task x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PlannerError::InvalidInput("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PlannerError::Ai(AiError::EmptyResponse).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            PlannerError::Mail(MailError::Api {
                status: 401,
                message: "Invalid Credentials".into()
            })
            .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            PlannerError::Mail(MailError::Imap("down".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn panicked_handler_work_is_a_500() {
        let join = tokio::task::spawn_blocking(|| panic!("store exploded"))
            .await
            .unwrap_err();
        let err = PlannerError::from(join);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("background task failed"));
    }
}
