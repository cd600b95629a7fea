#![cfg(feature = "http_api")]

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use class_calendar::{
    AssignmentItem, CalendarTemplate, ClassMeetingItem, CourseCalendar, KeyValueStore,
    MemoryStore, MoveOutcome, MoveStatus, OffsetCalendar, Planner, PlannerConfig, SearchLimits,
    http_api,
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_router() -> axum::Router {
    router_with(PlannerConfig::default())
}

fn router_with(config: PlannerConfig) -> axum::Router {
    let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
    let state = http_api::AppState::new(Planner::new(store, config));
    http_api::router(state)
}

fn sample_calendar() -> CourseCalendar {
    let mut calendar = CourseCalendar::new("FM 4103");
    calendar.meetings = vec![
        ClassMeetingItem::new(d(2024, 9, 9), "Lecture 5"),
        ClassMeetingItem::new(d(2024, 9, 11), "Quiz 2"),
    ];
    calendar
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = new_router();
    let (status, bytes) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn calendar_lifecycle_via_http_api() {
    let app = new_router();
    let calendar = sample_calendar();
    let payload = serde_json::to_value(&calendar).unwrap();

    let (status, _) = send(&app, json_request("PUT", "/courses/FM%204103/calendar", &payload)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, bytes) = send(&app, get("/courses/FM%204103/calendar")).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: CourseCalendar = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(fetched, calendar);

    let (status, bytes) = send(&app, get("/courses")).await;
    assert_eq!(status, StatusCode::OK);
    let courses: Value = serde_json::from_slice(&bytes).unwrap();
    let fm = courses
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == "FM 4103")
        .unwrap();
    assert_eq!(fm["has_calendar"], true);
    assert_eq!(fm["pattern"], "MW");

    let delete = Request::builder()
        .method("DELETE")
        .uri("/courses/FM%204103/calendar")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, bytes) = send(&app, get("/courses/FM%204103/calendar")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn mismatched_course_id_is_invalid() {
    let app = new_router();
    let payload = serde_json::to_value(sample_calendar()).unwrap();
    let (status, bytes) =
        send(&app, json_request("PUT", "/courses/CA%204105/calendar", &payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn offset_and_move_via_http_api() {
    let app = new_router();
    let payload = serde_json::to_value(sample_calendar()).unwrap();
    send(&app, json_request("PUT", "/courses/FM%204103/calendar", &payload)).await;

    let (status, bytes) = send(
        &app,
        json_request(
            "POST",
            "/courses/FM%204103/offset",
            &json!({ "target_start": "2025-08-25" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let planned: OffsetCalendar = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(planned.summary.target_epoch, d(2025, 8, 25));
    assert_eq!(planned.meetings().count(), 2);

    let (status, bytes) = send(
        &app,
        json_request(
            "POST",
            "/courses/FM%204103/meetings/move",
            &json!({ "source": "2024-09-09", "target": "2024-09-11" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let outcome: MoveOutcome = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(outcome.status, MoveStatus::Moved);
    assert_eq!(outcome.relocations.len(), 2);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/courses/FM%204103/meetings/move",
            &json!({ "source": "2024-09-13", "target": "2024-09-16" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn offset_for_unknown_course_is_not_found() {
    let app = new_router();
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/courses/ZZ%209999/offset",
            &json!({ "target_start": "2025-08-25" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn class_day_lookups() {
    let app = new_router();

    let (status, bytes) = send(
        &app,
        get("/class-days/number?pattern=MW&epoch=2024-08-26&date=2024-08-28"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["class_day"], 1);

    let (_, bytes) = send(
        &app,
        get("/class-days/number?pattern=MW&epoch=2024-08-26&date=2024-08-30"),
    )
    .await;
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["class_day"].is_null());

    let (_, bytes) = send(&app, get("/class-days/date?pattern=TTH&epoch=2024-08-27&n=3")).await;
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["date"], "2024-09-05");

    let (_, bytes) = send(
        &app,
        get("/class-days/first?pattern=MW&on_or_after=2025-01-08"),
    )
    .await;
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["date"], "2025-01-13");

    let (status, _) = send(
        &app,
        get("/class-days/first?pattern=FRI&on_or_after=2025-01-08"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn fall_calendar() -> CourseCalendar {
    let mut calendar = CourseCalendar::new("FM 4103");
    calendar.assignments = vec![
        AssignmentItem::new("Reading Response")
            .with_start(d(2024, 8, 26), None)
            .with_due(d(2024, 8, 28), Some("11:59 PM")),
    ];
    calendar.meetings = vec![
        ClassMeetingItem::new(d(2024, 8, 26), "Introduction"),
        ClassMeetingItem::new(d(2024, 8, 28), "Lecture 1"),
        ClassMeetingItem::new(d(2024, 9, 4), "Quiz 1"),
        ClassMeetingItem::new(d(2024, 9, 9), "Lecture 2"),
    ];
    calendar
}

async fn put_fall_calendar(app: &axum::Router) {
    let payload = serde_json::to_value(fall_calendar()).unwrap();
    let (status, _) = send(app, json_request("PUT", "/courses/FM%204103/calendar", &payload)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn exhausted_move_is_returned_and_stored() {
    let config = PlannerConfig {
        limits: SearchLimits {
            cascade_hops: 1,
            ..SearchLimits::default()
        },
        ..PlannerConfig::default()
    };
    let app = router_with(config);
    put_fall_calendar(&app).await;

    let (status, bytes) = send(
        &app,
        json_request(
            "POST",
            "/courses/FM%204103/meetings/move",
            &json!({ "source": "2024-08-28", "target": "2024-09-04" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "exhausted");

    let (_, bytes) = send(&app, get("/courses/FM%204103/calendar")).await;
    let stored: CourseCalendar = serde_json::from_slice(&bytes).unwrap();
    let lecture = stored
        .meetings
        .iter()
        .find(|m| m.description == "Lecture 1")
        .unwrap();
    assert_eq!(lecture.date, d(2024, 9, 4));
}

#[tokio::test]
async fn patch_assignment_overrides_dates() {
    let app = new_router();
    put_fall_calendar(&app).await;

    let (status, bytes) = send(
        &app,
        json_request(
            "PATCH",
            "/courses/FM%204103/assignments/Reading%20Response",
            &json!({ "due_date": "2024-08-30", "due_time": "5:00 PM" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["updated"], 1);

    let (_, bytes) = send(&app, get("/courses/FM%204103/calendar")).await;
    let stored: CourseCalendar = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stored.assignments[0].due_date, Some(d(2024, 8, 30)));
    assert_eq!(stored.assignments[0].due_time.as_deref(), Some("5:00 PM"));

    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            "/courses/FM%204103/assignments/Missing",
            &json!({ "due_date": "2024-08-30" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn offset_without_date_uses_suggested_start() {
    let app = new_router();
    put_fall_calendar(&app).await;

    let (status, bytes) = send(&app, get("/courses/FM%204103/suggested-start")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["date"], "2025-01-15");

    let (status, bytes) = send(
        &app,
        json_request("POST", "/courses/FM%204103/offset", &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let planned: OffsetCalendar = serde_json::from_slice(&bytes).unwrap();
    // a Wednesday suggestion anchors on the following Monday
    assert_eq!(planned.summary.target_epoch, d(2025, 1, 20));
}

#[tokio::test]
async fn clear_semester_via_http_api() {
    let app = new_router();
    put_fall_calendar(&app).await;

    let (status, bytes) = send(
        &app,
        json_request("POST", "/courses/FM%204103/clear-semester", &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["semester"], "Fall");
    assert_eq!(body["removed"], 5);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/courses/FM%204103/clear-semester",
            &json!({ "date": "2025-07-15" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn template_lifecycle_via_http_api() {
    let app = new_router();
    put_fall_calendar(&app).await;

    let (status, bytes) = send(
        &app,
        json_request(
            "POST",
            "/templates",
            &json!({ "course_id": "FM 4103", "name": "Finite Fall", "semester": "fall" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let template: CalendarTemplate = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(template.id, "default-finite-fall");

    let (_, bytes) = send(&app, get("/templates?course_type=Finite%20Math&pattern=MW")).await;
    let listed: Vec<CalendarTemplate> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(listed, vec![template.clone()]);
    let (_, bytes) = send(&app, get("/templates?semester=Spring")).await;
    let listed: Vec<CalendarTemplate> = serde_json::from_slice(&bytes).unwrap();
    assert!(listed.is_empty());
    let (status, _) = send(&app, get("/templates?semester=Winter")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, bytes) = send(
        &app,
        json_request(
            "POST",
            "/courses/CA%204105/apply-template",
            &json!({ "template_id": "default-finite-fall" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let applied: CourseCalendar = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(applied.course_id, "CA 4105");
    assert_eq!(applied.meetings, template.meetings);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/courses/CA%204201/apply-template",
            &json!({ "template_id": "default-finite-fall" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let delete = Request::builder()
        .method("DELETE")
        .uri("/templates/default-finite-fall")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, get("/templates/default-finite-fall")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
