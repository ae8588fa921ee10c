use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::Router;
use http::{Request, StatusCode};
use serde_json::{json, Value};
use timetable_api::{router, AppConfig, AppState};
use tower::ServiceExt;

fn app() -> Router {
    let config = AppConfig::default();
    router(AppState::new(&config), &config)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn math_teacher() -> Value {
    json!({
        "teacherId": "ana",
        "name": "Ana",
        "allocations": [{"subject": "Math", "lessonsPerWeek": 3, "classIds": ["6A", "6B"]}]
    })
}

fn full_timetables() -> Value {
    json!([
        {
            "teacherId": "ana",
            "name": "Ana",
            "allocations": [
                {"subject": "Math", "lessonsPerWeek": 20, "classIds": ["9A"]},
                {"subject": "Math", "lessonsPerWeek": 14, "classIds": ["9B"]}
            ]
        },
        {
            "teacherId": "bruno",
            "name": "Bruno",
            "allocations": [
                {"subject": "History", "lessonsPerWeek": 20, "classIds": ["9A"]},
                {"subject": "History", "lessonsPerWeek": 14, "classIds": ["9C"]}
            ]
        }
    ])
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send(&app(), "GET", "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn empty_settings_resolve_to_the_default_week() {
    let (status, body) = send_json(&app(), "POST", "/v1/config/resolve", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weeklyCapacity"], 34);
    assert_eq!(body["slotsPerDay"]["4"], 6);
}

#[tokio::test]
async fn bad_settings_are_unprocessable() {
    let (status, body) = send_json(
        &app(),
        "POST",
        "/v1/config/resolve",
        Some(json!({"morningStart": "seven"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_settings");
}

#[tokio::test]
async fn feasibility_dry_run_names_the_overload() {
    let (status, body) = send_json(
        &app(),
        "POST",
        "/v1/feasibility",
        Some(json!({"workloads": full_timetables()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feasible"], false);
    assert_eq!(body["required"], 68);
    let message = body["issues"][0]["message"].as_str().unwrap();
    assert!(message.contains("Ana") && message.contains("Bruno"), "{message}");
    assert_eq!(body["teachers"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn generate_places_every_period() {
    let (status, body) = send_json(
        &app(),
        "POST",
        "/v1/generate",
        Some(json!({"workloads": [math_teacher()], "params": {"seed": 7}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["required"], 6);
    assert_eq!(body["result"]["completionRate"], 100.0);
    assert_eq!(body["result"]["placedLessons"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn generate_rejects_infeasible_workloads() {
    let (status, body) = send_json(
        &app(),
        "POST",
        "/v1/generate",
        Some(json!({"workloads": full_timetables()})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "infeasible_workload");
    assert_eq!(body["issues"][0]["kind"], "class_over_capacity");
}

#[tokio::test]
async fn conflicting_locks_are_a_conflict() {
    let lock = |class: &str| {
        json!({"teacherId": "ana", "subject": "Math", "classId": class, "day": 0, "slot": 0})
    };
    let (status, body) = send_json(
        &app(),
        "POST",
        "/v1/generate",
        Some(json!({"workloads": [math_teacher()], "locked": [lock("6A"), lock("6B")]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_lock");
}

fn history_run() -> Value {
    let lesson = |slot: u8| {
        json!({"teacherId": "hilda", "subject": "History", "classId": "7A", "day": 0, "slot": slot})
    };
    json!({
        "lessons": [lesson(0), lesson(1), lesson(2)],
        "workloads": [{
            "teacherId": "hilda",
            "name": "Hilda",
            "allocations": [{"subject": "History", "lessonsPerWeek": 3, "classIds": ["7A"]}]
        }]
    })
}

#[tokio::test]
async fn validate_flags_long_runs() {
    let (status, body) = send_json(&app(), "POST", "/v1/validate", Some(history_run())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["stats"]["consecutiveViolations"], 1);
    let w = &body["warnings"][0];
    assert_eq!(w["kind"], "consecutive_limit");
    assert_eq!(w["classId"], "7A");
    assert_eq!(w["day"], 0);
    assert_eq!(w["subject"], "History");
    assert_eq!((w["firstSlot"].clone(), w["lastSlot"].clone()), (json!(0), json!(2)));
}

#[tokio::test]
async fn report_is_plain_text() {
    let (status, body) = send(&app(), "POST", "/v1/validate/report", Some(history_run())).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("TIMETABLE VALIDATION REPORT"));
    assert!(text.contains("Hilda"));
}

/// Friday-only teacher with one usable slot: three Art periods never all fit,
/// so a run with no attempt cap only ends when it is cancelled.
fn never_complete() -> Value {
    let blocked: Vec<Value> = [0, 1, 3, 4, 5]
        .iter()
        .map(|s| json!({"day": 4, "slot": s}))
        .collect();
    json!([{
        "teacherId": "zed",
        "name": "Zed",
        "allocations": [{"subject": "Art", "lessonsPerWeek": 3, "classIds": ["6A"]}],
        "preferences": {
            "unavailableDays": [0, 1, 2, 3],
            "maxLessonsPerDay": 3,
            "unavailableSlots": blocked
        }
    }])
}

#[tokio::test]
async fn timed_out_generation_stops_working() {
    let mut config = AppConfig::default();
    config.request_timeout = Duration::from_millis(50);
    config.generation.max_attempts = u32::MAX;
    let app = router(AppState::new(&config), &config);

    let (status, _) = send(
        &app,
        "POST",
        "/v1/generate",
        Some(json!({
            "workloads": never_complete(),
            "params": {"maxAttempts": u32::MAX, "seed": 1, "acceptanceThreshold": 0.0}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    // The blocking run must notice the dropped request; the runtime waits
    // for it on shutdown, so an uncancelled run would hang this test.
}

#[tokio::test]
async fn jobs_run_in_the_background() {
    let app = app();
    let (status, created) = send_json(
        &app,
        "POST",
        "/v1/jobs",
        Some(json!({"workloads": [math_teacher()], "params": {"seed": 3}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["jobId"].as_str().unwrap().to_string();

    let mut last = Value::Null;
    for _ in 0..400 {
        let (_, s) = send_json(&app, "GET", &format!("/v1/jobs/{id}"), None).await;
        last = s;
        if last["status"] == "generated" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(last["status"], "generated", "{last}");

    let (status, outcome) = send_json(&app, "GET", &format!("/v1/jobs/{id}/result"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["result"]["completionRate"], 100.0);

    let (status, after) = send_json(&app, "DELETE", &format!("/v1/jobs/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["status"], "generated");
}

#[tokio::test]
async fn unknown_jobs_are_not_found() {
    let app = app();
    for (method, uri) in [
        ("GET", "/v1/jobs/missing"),
        ("GET", "/v1/jobs/missing/result"),
        ("DELETE", "/v1/jobs/missing"),
    ] {
        let (status, _) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
    }
}

#[tokio::test]
async fn openapi_document_lists_the_routes() {
    let (status, doc) = send_json(&app(), "GET", "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    for path in ["/v1/generate", "/v1/validate", "/v1/jobs/{id}"] {
        assert!(doc["paths"].get(path).is_some(), "{path}");
    }
}
