use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use section_scheduler::SolveOptions;
use section_scheduler::repository::InMemorySectionRepository;
use section_scheduler::server::{AppState, USER_HEADER, router};

fn app() -> Router {
    router(AppState {
        repository: Arc::new(InMemorySectionRepository::new()),
        defaults: SolveOptions::default(),
    })
}

fn section_json(end: &str) -> Value {
    json!({
        "id": "s1",
        "ownerId": "u1",
        "name": "First year",
        "classes": [
            {"id": "c1", "sectionId": "s1", "subjectId": "math", "day": "Mon", "start": "09:00:00", "end": "10:00:00"},
            {"id": "c2", "sectionId": "s1", "subjectId": "math", "day": "Mon", "start": "09:30:00", "end": end}
        ],
        "professors": [
            {"id": "p1", "ownerId": "u1", "name": "Ada", "subjects": ["math"]}
        ],
        "professorLinks": [
            {"id": "l1", "professorId": "p1", "sectionId": "s1", "totalClasses": 1}
        ],
        "preferences": [
            {"id": "pr1", "sectionId": "s1", "professorId": "p1",
             "target": {"kind": "subject", "id": "math"}, "value": 2, "importance": 3}
        ]
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, user: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn solves_posted_section() {
    let app = app();
    let (status, body) = send(
        &app,
        json_request("POST", "/v1/schedule/solve", None, &json!({"section": section_json("10:30:00")})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalScore"], 6);
    assert_eq!(body["assignments"][0], json!({"classId": "c1", "professorId": "p1"}));
    assert_eq!(body["assignments"][1], json!({"classId": "c2", "professorId": null}));
    assert_eq!(body["violations"][0]["reasonCode"], "TIME_CONFLICT");
}

#[tokio::test]
async fn invalid_section_is_unprocessable() {
    let app = app();
    let (status, body) = send(
        &app,
        json_request("POST", "/v1/schedule/solve", None, &json!({"section": section_json("09:30:00")})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid section input");
    assert_eq!(body["details"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn stored_section_requires_user_and_owner() {
    let app = app();

    let (status, _) = send(
        &app,
        json_request("POST", "/v1/sections/s1/solve", None, &Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        json_request("POST", "/v1/sections/s1/solve", Some("u1"), &Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        json_request("PUT", "/v1/sections/s1", Some("u2"), &section_json("10:30:00")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stored_section_is_solved_and_applied() {
    let app = app();

    let (status, _) = send(
        &app,
        json_request("PUT", "/v1/sections/s1", Some("u1"), &section_json("11:00:00")),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // other users cannot see it
    let (status, _) = send(
        &app,
        json_request("POST", "/v1/sections/s1/solve", Some("u2"), &Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        json_request("POST", "/v1/sections/s1/solve?apply=true", Some("u1"), &Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sectionId"], "s1");
    assert_eq!(body["violations"].as_array().unwrap().len(), 1);
}
