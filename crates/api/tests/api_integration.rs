//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Days, NaiveDate, Utc};
use common::UserId;
use domain::{Element, ElementCategory, Role, Space, SpaceKind, SpaceStatus};
use engine::{EngineConfig, InMemoryRoleDirectory};
use metrics_exporter_prometheus::PrometheusHandle;
use reservation_store::{CatalogStore, InMemoryStore};
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    space: Space,
    other_space: Space,
    closed: Space,
    projector: Element,
    admin: UserId,
    coordinator: UserId,
}

async fn setup() -> TestApp {
    let store = InMemoryStore::new();
    let space = Space::new("Room S", SpaceKind::Classroom, 20, "Block A").unwrap();
    let other_space = Space::new("Lab 2", SpaceKind::Lab, 30, "Block B").unwrap();
    let closed = Space::new("Old Hall", SpaceKind::Auditorium, 80, "Block C")
        .unwrap()
        .with_status(SpaceStatus::Blocked);
    let projector = Element::new("Projector", ElementCategory::Technology, 3).unwrap();
    for s in [&space, &other_space, &closed] {
        store.put_space(s.clone()).await.unwrap();
    }
    store.put_element(projector.clone()).await.unwrap();

    let admin = UserId::new();
    let coordinator = UserId::new();
    let directory =
        InMemoryRoleDirectory::with_users([(admin, Role::Admin), (coordinator, Role::Coordinator)]);

    let state = api::create_state(store, directory, EngineConfig::default());
    let app = api::create_app(state, get_metrics_handle());

    TestApp {
        app,
        space,
        other_space,
        closed,
        projector,
        admin,
        coordinator,
    }
}

/// A date safely in the future for the engine's past-date rule.
fn day() -> NaiveDate {
    Utc::now().date_naive() + Days::new(30)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<UserId>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn reservation_body(space: &Space, start: &str, end: &str, lines: Value) -> Value {
    json!({
        "space_id": space.id,
        "date": day(),
        "start_time": start,
        "end_time": end,
        "motive": "Quarterly planning workshop",
        "lines": lines,
    })
}

#[tokio::test]
async fn test_health_check() {
    let t = setup().await;
    let (status, json) = send(&t.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "reservation-engine");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup().await;
    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_catalog_reads() {
    let t = setup().await;

    let (status, json) = send(&t.app, "GET", "/spaces", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 3);

    let (_, json) = send(&t.app, "GET", "/spaces?available=true", None, None).await;
    let names: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Lab 2", "Room S"]);

    let (status, json) = send(&t.app, "GET", "/elements", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["stock_total"], 3);
}

#[tokio::test]
async fn test_writes_require_user_header() {
    let t = setup().await;
    let body = reservation_body(&t.space, "10:00:00", "12:00:00", json!([]));
    let (status, json) = send(&t.app, "POST", "/reservations", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["kind"], "unauthorized");
}

#[tokio::test]
async fn test_reservation_lifecycle() {
    let t = setup().await;
    let requester = UserId::new();
    let lines = json!([{ "element_id": t.projector.id, "quantity": 2 }]);

    // A: submitted and pending
    let body = reservation_body(&t.space, "10:00:00", "12:00:00", lines.clone());
    let (status, a) = send(&t.app, "POST", "/reservations", Some(requester), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(a["status"], "pending");
    let a_id = a["id"].as_str().unwrap().to_string();

    // B: overlapping window on the same space
    let body = reservation_body(&t.space, "11:00:00", "13:00:00", json!([]));
    let (status, err) = send(&t.app, "POST", "/reservations", Some(UserId::new()), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "conflict");
    assert_eq!(err["conflicts"][0]["id"], a_id.as_str());

    // C: same projectors on another space
    let body = reservation_body(&t.other_space, "10:00:00", "12:00:00", lines);
    let (status, err) = send(&t.app, "POST", "/reservations", Some(UserId::new()), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["shortfalls"][0]["available"], 1);
    assert_eq!(err["shortfalls"][0]["requested"], 2);

    // Requesters cannot approve.
    let approve = format!("/reservations/{a_id}/approve");
    let (status, err) = send(&t.app, "POST", &approve, Some(requester), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["kind"], "forbidden");

    let (status, approved) = send(&t.app, "POST", &approve, Some(t.coordinator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");
    assert_eq!(approved["reviewed_by"], t.coordinator.to_string());

    // The approved reservation does not conflict with itself.
    let uri = format!(
        "/availability?space_id={}&date={}&start=10:00:00&end=12:00:00&exclude={a_id}",
        t.space.id,
        day()
    );
    let (status, report) = send(&t.app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["available"], true);

    let cancel = format!("/reservations/{a_id}/cancel");
    let (status, cancelled) = send(&t.app, "POST", &cancel, Some(requester), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    // B now fits.
    let body = reservation_body(&t.space, "11:00:00", "13:00:00", json!([]));
    let (status, _) = send(&t.app, "POST", "/reservations", Some(UserId::new()), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let history = format!("/reservations/{a_id}/history");
    let (status, events) = send(&t.app, "GET", &history, Some(requester), None).await;
    assert_eq!(status, StatusCode::OK);
    let types: Vec<_> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec![
            "ReservationSubmitted",
            "ReservationApproved",
            "ReservationCancelled"
        ]
    );
}

#[tokio::test]
async fn test_reject_requires_reason_and_is_not_repeatable() {
    let t = setup().await;
    let body = reservation_body(&t.space, "08:00:00", "09:00:00", json!([]));
    let (_, r) = send(&t.app, "POST", "/reservations", Some(UserId::new()), Some(body)).await;
    let reject = format!("/reservations/{}/reject", r["id"].as_str().unwrap());

    let (status, err) = send(
        &t.app,
        "POST",
        &reject,
        Some(t.coordinator),
        Some(json!({ "reason": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "validation");

    let reason = json!({ "reason": "Room booked for exams" });
    let (status, rejected) =
        send(&t.app, "POST", &reject, Some(t.coordinator), Some(reason.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["rejection_reason"], "Room booked for exams");

    let (status, err) = send(&t.app, "POST", &reject, Some(t.coordinator), Some(reason)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "illegal_transition");
}

#[tokio::test]
async fn test_admin_force_cancel() {
    let t = setup().await;
    let body = reservation_body(&t.space, "14:00:00", "15:00:00", json!([]));
    let (_, r) = send(&t.app, "POST", "/reservations", Some(UserId::new()), Some(body)).await;
    let id = r["id"].as_str().unwrap();
    send(
        &t.app,
        "POST",
        &format!("/reservations/{id}/approve"),
        Some(t.admin),
        None,
    )
    .await;

    let cancel = format!("/reservations/{id}/cancel");
    let (status, _) = send(&t.app, "POST", &cancel, Some(t.admin), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, cancelled) =
        send(&t.app, "POST", &cancel, Some(t.admin), Some(json!({ "force": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["cancelled_by"], t.admin.to_string());
}

#[tokio::test]
async fn test_validation_and_lookup_errors() {
    let t = setup().await;
    let user = UserId::new();

    let mut body = reservation_body(&t.space, "10:00:00", "11:00:00", json!([]));
    body["motive"] = json!("short");
    let (status, err) = send(&t.app, "POST", "/reservations", Some(user), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "validation");

    let body = reservation_body(&t.space, "12:00:00", "11:00:00", json!([]));
    let (status, _) = send(&t.app, "POST", "/reservations", Some(user), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut body = reservation_body(&t.space, "10:00:00", "11:00:00", json!([]));
    body["space_id"] = json!(uuid::Uuid::new_v4());
    let (status, err) = send(&t.app, "POST", "/reservations", Some(user), Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["kind"], "not_found");

    let uri = format!("/reservations/{}", uuid::Uuid::new_v4());
    let (status, _) = send(&t.app, "GET", &uri, Some(user), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, "GET", "/reservations/not-a-uuid", Some(user), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = reservation_body(&t.closed, "10:00:00", "11:00:00", json!([]));
    let (status, err) = send(&t.app, "POST", "/reservations", Some(user), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["space_status"], "blocked");
}

#[tokio::test]
async fn test_listing_is_scoped() {
    let t = setup().await;
    let alice = UserId::new();
    let bob = UserId::new();
    for (user, start, end) in [
        (alice, "08:00:00", "09:00:00"),
        (bob, "09:00:00", "10:00:00"),
    ] {
        let body = reservation_body(&t.space, start, end, json!([]));
        let (status, _) = send(&t.app, "POST", "/reservations", Some(user), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, mine) = send(&t.app, "GET", "/reservations", Some(alice), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["requester_id"], alice.to_string());

    let uri = format!("/reservations?space_id={}&status=pending", t.space.id);
    let (_, all) = send(&t.app, "GET", &uri, Some(t.coordinator), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
    assert_eq!(all[0]["start_time"], "08:00:00");

    let (status, queue) = send(&t.app, "GET", "/reservations/pending", Some(t.coordinator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue.as_array().unwrap().len(), 2);

    let (status, _) = send(&t.app, "GET", "/reservations/pending", Some(alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let other = mine[0]["id"].as_str().unwrap();
    let (status, _) = send(&t.app, "GET", &format!("/reservations/{other}"), Some(bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_amend_pending_reservation() {
    let t = setup().await;
    let owner = UserId::new();
    let body = reservation_body(&t.space, "10:00:00", "11:00:00", json!([]));
    let (_, r) = send(&t.app, "POST", "/reservations", Some(owner), Some(body)).await;
    let uri = format!("/reservations/{}", r["id"].as_str().unwrap());

    let (status, _) = send(
        &t.app,
        "PATCH",
        &uri,
        Some(owner),
        Some(json!({ "start_time": "10:30:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, amended) = send(
        &t.app,
        "PATCH",
        &uri,
        Some(owner),
        Some(json!({
            "date": day(),
            "start_time": "10:30:00",
            "end_time": "11:30:00",
            "lines": [{ "element_id": t.projector.id, "quantity": 3 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amended["start_time"], "10:30:00");
    assert_eq!(amended["lines"][0]["quantity"], 3);
    assert_eq!(amended["version"], 2);

    let stock = json!({
        "date": day(),
        "start": "11:00:00",
        "end": "12:00:00",
        "lines": [{ "element_id": t.projector.id, "quantity": 1 }]
    });
    let (status, report) = send(&t.app, "POST", "/availability/stock", None, Some(stock)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["sufficient"], false);
    assert_eq!(report["shortfalls"][0]["available"], 0);
}
