// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::Actor;
use shared_models::error::AppError;

use crate::models::{BookAppointmentRequest, CompleteAppointmentRequest};
use crate::router::AppointmentCellState;
use crate::services::patient_for_booking;

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let patient_id = patient_for_booking(&actor, request.patient_id)?;

    let appointment = state
        .booking
        .book(request.slot_id, patient_id, request.reason)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "message": "Appointment booked successfully"
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.lifecycle.list_for_actor(&actor).await;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.lifecycle.get(appointment_id, &actor).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.lifecycle.cancel(appointment_id, &actor).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CompleteAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .lifecycle
        .complete(appointment_id, &actor, &request.medications, &request.notes)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed"
    })))
}
