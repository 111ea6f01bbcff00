//! HTTP API tests driven through the router with `oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use taskplanner::config::PlannerConfig;
use taskplanner::planner::Planner;
use taskplanner::server::router;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    _dir: tempfile::TempDir,
}

impl TestApp {
    fn new() -> Self {
        Self::with_data(|_| {})
    }

    /// Let the caller write files into the data directory before the
    /// planner opens it.
    fn with_data(seed: impl FnOnce(&std::path::Path)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let config = PlannerConfig {
            data_dir: dir.path().to_path_buf(),
            ..PlannerConfig::default()
        };
        let planner = Arc::new(Planner::new(&config).unwrap());
        Self {
            router: router(planner, None),
            _dir: dir,
        }
    }

    async fn get_raw(&self, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_task_post_dedups_and_filters_by_user() {
    let app = TestApp::new();
    let task = json!({
        "title": "Finish PFA report",
        "description": "Chapter 3",
        "category": "Study",
        "urgency": 4,
        "start_at": "2030-01-10T09:00:00.000Z",
        "end_at": "2030-01-10T11:00:00.000Z",
        "deadline": "2030-01-12",
        "user_id": 2
    });

    let (status, body) = app
        .call(Method::POST, "/api/tasks", Some(json!({ "tasks": [task, task] })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "1 new tasks added");
    assert_eq!(body["count"], 1);
    assert_eq!(body["duplicates"], 1);
    assert_eq!(body["added"][0]["user_id"], "2");
    assert_eq!(body["added"][0]["deadline"], "2030-01-12T00:00:00.000Z");

    let (_, body) = app
        .call(Method::POST, "/api/tasks", Some(json!({ "tasks": [task] })))
        .await;
    assert_eq!(body["message"], "0 new tasks added");

    let (_, mine) = app.call(Method::GET, "/api/tasks?user_id=2", None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    let (_, others) = app.call(Method::GET, "/api/tasks?user_id=1", None).await;
    assert!(others.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_task_update_and_delete() {
    let app = TestApp::new();
    let (_, body) = app
        .call(
            Method::POST,
            "/api/tasks",
            Some(json!({ "tasks": [{ "title": "Old title" }] })),
        )
        .await;
    let id = body["added"][0]["id"].as_str().unwrap().to_string();

    let (status, updated) = app
        .call(
            Method::PUT,
            &format!("/api/tasks/{}", id),
            Some(json!({ "task": { "title": "New title", "urgency": "5" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "New title");
    assert_eq!(updated["urgency"], 5);
    assert_eq!(updated["id"], id.as_str());

    let (status, err) = app
        .call(
            Method::PUT,
            "/api/tasks/nope",
            Some(json!({ "task": { "title": "x" } })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(err["error"].as_str().unwrap().contains("not found"));

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/tasks/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/tasks/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tasks_stored_without_ids_can_be_updated_and_deleted() {
    let app = TestApp::with_data(|dir| {
        std::fs::write(
            dir.join("tasks.json"),
            r#"[{"title": "Imported task", "urgency": 2, "user_id": 1}]"#,
        )
        .unwrap();
    });

    let (_, listed) = app.call(Method::GET, "/api/tasks", None).await;
    let id = listed[0]["id"].as_str().unwrap().to_string();
    let (_, again) = app.call(Method::GET, "/api/tasks", None).await;
    assert_eq!(again[0]["id"], id.as_str());

    let (status, updated) = app
        .call(
            Method::PUT,
            &format!("/api/tasks/{}", id),
            Some(json!({ "task": { "title": "Imported task, edited" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], id.as_str());

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/tasks/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, remaining) = app.call(Method::GET, "/api/tasks", None).await;
    assert!(remaining.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_paths_fall_back_to_the_client_index() {
    let data = tempfile::tempdir().unwrap();
    let public = tempfile::tempdir().unwrap();
    std::fs::write(public.path().join("index.html"), "<html>planner</html>").unwrap();
    std::fs::write(public.path().join("app.js"), "console.log(1)").unwrap();
    let config = PlannerConfig {
        data_dir: data.path().to_path_buf(),
        ..PlannerConfig::default()
    };
    let planner = Arc::new(Planner::new(&config).unwrap());
    let app = TestApp {
        router: router(planner, Some(public.path())),
        _dir: data,
    };

    let (status, body) = app.get_raw("/some/client/route").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<html>planner</html>");

    let (status, body) = app.get_raw("/app.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "console.log(1)");

    // API routes still win over the static files
    let (status, health) = app.call(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn test_concurrent_posts_all_persist() {
    let app = TestApp::new();
    let posts = (0..8).map(|n| {
        app.call(
            Method::POST,
            "/api/tasks",
            Some(json!({ "tasks": [{ "title": format!("Parallel task {}", n) }] })),
        )
    });
    for (status, body) in futures::future::join_all(posts).await {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["added"].as_array().unwrap().len(), 1);
    }

    let (_, tasks) = app.call(Method::GET, "/api/tasks", None).await;
    assert_eq!(tasks.as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_malformed_body_is_a_json_400() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/tasks")
        .header("content-type", "application/json")
        .body(Body::from("{\"tasks\": [}"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_users_find_or_create() {
    let app = TestApp::new();
    let (status, user) = app
        .call(Method::POST, "/api/users", Some(json!({ "email": "a@b.com" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["id"], "1");

    let (status, same) = app
        .call(Method::POST, "/api/users", Some(json!({ "email": "A@B.com" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(same["id"], "1");

    let (_, found) = app.call(Method::GET, "/api/users?email=a@b.com", None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    let (status, one) = app.call(Method::GET, "/api/users/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["email"], "a@b.com");
    let (status, _) = app.call(Method::GET, "/api/users/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(Method::POST, "/api/users", Some(json!({ "email": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_new_task_creates_notifications() {
    let app = TestApp::new();
    let start = (Utc::now() + Duration::minutes(5)).to_rfc3339();
    app.call(
        Method::POST,
        "/api/tasks",
        Some(json!({ "tasks": [{ "title": "Standup", "start_at": start, "user_id": "3" }] })),
    )
    .await;

    let (status, notes) = app
        .call(Method::GET, "/api/notifications?user_id=3", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let notes = notes.as_array().unwrap();
    assert_eq!(notes.len(), 2);
    let reminder = notes.iter().find(|n| n["type"] == "reminder").unwrap();
    assert_eq!(reminder["reminderTime"], "10min");
    assert_eq!(reminder["urgent"], true);
    assert!(notes.iter().any(|n| n["type"] == "new-task"));

    // Running the sweep right after adds nothing new
    let (status, sweep) = app
        .call(Method::POST, "/api/notifications/sweep", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sweep["created"], 0);
}

#[tokio::test]
async fn test_notification_read_and_clear() {
    let app = TestApp::new();
    let (status, created) = app
        .call(
            Method::POST,
            "/api/notifications",
            Some(json!({ "title": "Hello", "message": "World", "type": "info", "user_id": "1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["read"], false);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/notifications",
            Some(json!({ "title": "Hello", "message": "World", "type": "info", "user_id": "1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, unread) = app
        .call(Method::GET, "/api/notifications?user_id=1&unread=true", None)
        .await;
    assert_eq!(unread.as_array().unwrap().len(), 1);
    let (status, unread) = app
        .call(Method::GET, "/api/notifications?user_id=1&unread=1", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unread.as_array().unwrap().len(), 1);
    let (status, _) = app
        .call(Method::GET, "/api/notifications?unread=maybe", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, read) = app
        .call(Method::PUT, &format!("/api/notifications/{}/read", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["read"], true);

    let (_, all) = app
        .call(Method::PUT, "/api/notifications/read-all?user_id=1", None)
        .await;
    assert_eq!(all["updated"], 0);

    let (_, cleared) = app
        .call(Method::DELETE, "/api/notifications?user_id=1", None)
        .await;
    assert_eq!(cleared["deleted"], 1);
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/notifications/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scan_history_record_and_get() {
    let app = TestApp::new();
    let (status, empty) = app.call(Method::GET, "/api/scans/5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty["processed_email_ids"], json!([]));

    let (status, history) = app
        .call(
            Method::POST,
            "/api/scans/5",
            Some(json!({ "email_ids": ["a", "b", "a"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["processed_email_ids"], json!(["a", "b"]));
    assert!(history["last_scan_at"].is_string());
}

#[tokio::test]
async fn test_analyze_without_ai_uses_keywords() {
    let app = TestApp::new();
    let (status, report) = app
        .call(
            Method::POST,
            "/api/tasks/analyze",
            Some(json!({ "text": "submit the assignment tomorrow\nhi", "user_id": "9" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["source"], "fallback");
    assert_eq!(report["added"].as_array().unwrap().len(), 1);
    assert_eq!(report["added"][0]["user_id"], "9");

    let (status, _) = app
        .call(Method::POST, "/api/tasks/analyze", Some(json!({ "text": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_imap_scan_without_account_is_400() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::POST, "/api/scans/imap", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("IMAP"));
}
