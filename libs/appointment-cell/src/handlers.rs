// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::{Doctor, Patient};

use crate::models::{
    parse_status, AppointmentChanges, AppointmentDraft, CompleteAppointmentRequest,
    ConflictCheckQuery, DoctorAppointmentsQuery,
};
use crate::router::AppointmentState;

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Json(request): Json<AppointmentDraft>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.scheduling.create(request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.scheduling.get(appointment_id).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<AppointmentChanges>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.scheduling.update(appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.scheduling.cancel(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CompleteAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .scheduling
        .complete(appointment_id, request.final_cost)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.scheduling.delete(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppointmentState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DoctorAppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let appointments = state.scheduling.list_for_doctor(doctor_id, status).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppointmentState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.scheduling.list_for_patient(patient_id).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let result = state
        .scheduling
        .check_conflict(query.doctor_id, query.candidate_time, query.exclude_appointment_id)
        .await?;

    Ok(Json(json!({
        "has_conflict": result.has_conflict(),
        "conflict": result
    })))
}

// ==============================================================================
// DIRECTORY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppointmentState>>,
) -> Result<Json<Value>, AppError> {
    let doctors = state.directory.list_doctors().await?;
    Ok(Json(json!({ "doctors": doctors, "total": doctors.len() })))
}

#[axum::debug_handler]
pub async fn register_doctor(
    State(state): State<Arc<AppointmentState>>,
    Json(doctor): Json<Doctor>,
) -> Result<Json<Value>, AppError> {
    let doctor = state.directory.register_doctor(doctor).await?;
    Ok(Json(json!({ "success": true, "doctor": doctor })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppointmentState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = state.directory.get_doctor(doctor_id).await?;
    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppointmentState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.directory.delete_doctor(doctor_id).await?;
    Ok(Json(json!({ "success": true, "message": "Doctor deleted" })))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<AppointmentState>>,
) -> Result<Json<Value>, AppError> {
    let patients = state.directory.list_patients().await?;
    Ok(Json(json!({ "patients": patients, "total": patients.len() })))
}

#[axum::debug_handler]
pub async fn register_patient(
    State(state): State<Arc<AppointmentState>>,
    Json(patient): Json<Patient>,
) -> Result<Json<Value>, AppError> {
    let patient = state.directory.register_patient(patient).await?;
    Ok(Json(json!({ "success": true, "patient": patient })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppointmentState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let patient = state.directory.get_patient(patient_id).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<AppointmentState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.directory.delete_patient(patient_id).await?;
    Ok(Json(json!({ "success": true, "message": "Patient deleted" })))
}
