use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::router::{appointment_routes, directory_routes, AppointmentState};
use shared_utils::test_utils::{TestClinic, TestConfig};

async fn create_test_app() -> (Router, TestClinic) {
    let clinic = TestClinic::new(1, 2).await;
    let state = Arc::new(AppointmentState::new(
        &TestConfig::default().to_app_config(),
        clinic.repository.clone(),
        Arc::new(clinic.clock.clone()),
    ));
    (appointment_routes(state), clinic)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap() };
    (status, json)
}

fn booking(clinic: &TestClinic, patient: usize, scheduled_at: &str) -> Value {
    json!({
        "patient_id": clinic.patient_id(patient),
        "doctor_id": clinic.doctor_id(0),
        "scheduled_at": scheduled_at,
        "reason": "Persistent dry cough for two weeks",
        "appointment_type": "consultation"
    })
}

#[tokio::test]
async fn test_book_appointment_returns_created_record() {
    let (app, clinic) = create_test_app().await;

    let (status, json) = send(&app, "POST", "/", Some(booking(&clinic, 0, "2024-01-10T10:00:00Z"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["appointment"]["status"], "scheduled");
    assert_eq!(json["appointment"]["appointment_type"], "consultation");
    assert_eq!(json["appointment"]["doctor_id"], json!(clinic.doctor_id(0)));
}

#[tokio::test]
async fn test_conflicting_booking_is_409() {
    let (app, clinic) = create_test_app().await;
    let (_, first) = send(&app, "POST", "/", Some(booking(&clinic, 0, "2024-01-10T10:00:00Z"))).await;

    let (status, json) = send(&app, "POST", "/", Some(booking(&clinic, 1, "2024-01-10T10:20:00Z"))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    let first_id = first["appointment"]["id"].as_str().unwrap();
    assert!(json["error"].as_str().unwrap().contains(first_id));
}

#[tokio::test]
async fn test_missing_fields_are_400() {
    let (app, clinic) = create_test_app().await;

    let body = json!({ "doctor_id": clinic.doctor_id(0), "reason": "short" });
    let (status, json) = send(&app, "POST", "/", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Missing required fields"));
}

#[tokio::test]
async fn test_conflict_check_endpoint() {
    let (app, clinic) = create_test_app().await;
    let (_, first) = send(&app, "POST", "/", Some(booking(&clinic, 0, "2024-01-10T10:00:00Z"))).await;

    let uri = format!(
        "/conflicts/check?doctor_id={}&candidate_time=2024-01-10T10:20:00Z",
        clinic.doctor_id(0)
    );
    let (status, json) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["has_conflict"], true);
    assert_eq!(json["conflict"]["result"], "conflict_with");
    assert_eq!(json["conflict"]["appointment_id"], first["appointment"]["id"]);

    let uri = format!(
        "/conflicts/check?doctor_id={}&candidate_time=2024-01-10T10:31:00Z",
        clinic.doctor_id(0)
    );
    let (_, json) = send(&app, "GET", &uri, None).await;
    assert_eq!(json["has_conflict"], false);
    assert_eq!(json["conflict"]["result"], "no_conflict");
}

#[tokio::test]
async fn test_complete_then_cancel_is_rejected() {
    let (app, clinic) = create_test_app().await;
    let (_, booked) = send(&app, "POST", "/", Some(booking(&clinic, 0, "2024-01-10T10:00:00Z"))).await;
    let id = booked["appointment"]["id"].as_str().unwrap().to_string();

    let (status, json) = send(
        &app,
        "POST",
        &format!("/{}/complete", id),
        Some(json!({ "final_cost": 120.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["appointment"]["status"], "completed");
    assert_eq!(json["appointment"]["cost"], 120.5);

    let (status, json) = send(&app, "POST", &format!("/{}/cancel", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("completed"));
}

#[tokio::test]
async fn test_doctor_listing_with_status_filter() {
    let (app, clinic) = create_test_app().await;
    send(&app, "POST", "/", Some(booking(&clinic, 0, "2024-01-10T10:00:00Z"))).await;
    let (_, second) = send(&app, "POST", "/", Some(booking(&clinic, 1, "2024-01-10T11:00:00Z"))).await;
    let second_id = second["appointment"]["id"].as_str().unwrap();
    send(&app, "POST", &format!("/{}/cancel", second_id), None).await;

    let uri = format!("/doctors/{}?status=cancelled", clinic.doctor_id(0));
    let (status, json) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["appointments"][0]["id"], second_id);

    let uri = format!("/doctors/{}?status=postponed", clinic.doctor_id(0));
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_missing_is_404() {
    let (app, _clinic) = create_test_app().await;

    let (status, json) = send(&app, "DELETE", &format!("/{}", Uuid::new_v4()), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_register_doctor_and_patient() {
    let clinic = TestClinic::new(0, 0).await;
    let state = Arc::new(AppointmentState::new(
        &TestConfig::default().to_app_config(),
        clinic.repository.clone(),
        Arc::new(clinic.clock.clone()),
    ));
    let app = directory_routes(state);

    let (status, json) = send(
        &app,
        "POST",
        "/doctors",
        Some(json!({
            "first_name": "Elena",
            "last_name": "Smirnova",
            "specialty": "Cardiology",
            "license_number": "LIC-77"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let doctor_id = json["doctor"]["id"].as_str().unwrap().to_string();
    assert_ne!(doctor_id, Uuid::nil().to_string());

    let (status, json) = send(&app, "GET", &format!("/doctors/{}", doctor_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["specialty"], "Cardiology");

    let (status, json) = send(
        &app,
        "POST",
        "/patients",
        Some(json!({ "first_name": "Oleg", "last_name": "", "insurance_policy": "POL-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("last_name"));
}

#[tokio::test]
async fn test_patient_appointments_listing() {
    let (app, clinic) = create_test_app().await;
    send(&app, "POST", "/", Some(booking(&clinic, 0, "2024-01-10T10:00:00Z"))).await;
    send(&app, "POST", "/", Some(booking(&clinic, 1, "2024-01-10T11:00:00Z"))).await;

    let (status, json) = send(&app, "GET", &format!("/patients/{}", clinic.patient_id(1)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["appointments"][0]["patient_id"], json!(clinic.patient_id(1)));

    let (status, _) = send(&app, "GET", &format!("/patients/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_directory_listing_and_restricted_delete() {
    let clinic = TestClinic::new(1, 2).await;
    let state = Arc::new(AppointmentState::new(
        &TestConfig::default().to_app_config(),
        clinic.repository.clone(),
        Arc::new(clinic.clock.clone()),
    ));
    let appointments = appointment_routes(state.clone());
    let directory = directory_routes(state);

    let (status, json) = send(&directory, "GET", "/patients", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);

    let (_, booked) = send(&appointments, "POST", "/", Some(booking(&clinic, 0, "2024-01-10T10:00:00Z"))).await;
    let appointment_id = booked["appointment"]["id"].as_str().unwrap().to_string();

    let doctor_uri = format!("/doctors/{}", clinic.doctor_id(0));
    let (status, json) = send(&directory, "DELETE", &doctor_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("still has appointments"));

    let (status, _) = send(&directory, "DELETE", &format!("/patients/{}", clinic.patient_id(1)), None).await;
    assert_eq!(status, StatusCode::OK);

    send(&appointments, "DELETE", &format!("/{}", appointment_id), None).await;
    let (status, _) = send(&directory, "DELETE", &doctor_uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&directory, "GET", "/doctors", None).await;
    assert_eq!(json["total"], 0);
    let (_, json) = send(&directory, "GET", "/patients", None).await;
    assert_eq!(json["total"], 1);
    let (status, _) = send(&directory, "DELETE", &doctor_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
