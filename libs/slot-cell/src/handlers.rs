// libs/slot-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::auth::Actor;
use shared_models::error::AppError;

use crate::models::{CreateSlotRequest, CreateTemplateRequest, SlotQuery};
use crate::router::SlotCellState;

fn require_doctor_authority(actor: &Actor, doctor_id: Uuid) -> Result<(), AppError> {
    if actor.acts_for_doctor(doctor_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Not authorized to manage slots for this doctor".to_string(),
        ))
    }
}

#[axum::debug_handler]
pub async fn create_slots_from_template(
    State(state): State<Arc<SlotCellState>>,
    Path(doctor_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_doctor_authority(&actor, doctor_id)?;

    let template = request.into_template(doctor_id);
    let summary = state.generator.generate(&template).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "created": summary.created,
            "skipped": summary.skipped,
            "message": format!("Created {} slots", summary.created)
        })),
    ))
}

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<SlotCellState>>,
    Path(doctor_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_doctor_authority(&actor, doctor_id)?;

    let slot = state
        .generator
        .create_single(doctor_id, request.date, request.start_time, request.duration_minutes)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "slot": slot
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<Arc<SlotCellState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let from = query.date.or(query.date_from);

    let slots: Vec<_> = state
        .store
        .list_by_doctor(doctor_id, from)
        .await
        .into_iter()
        .filter(|slot| query.date.map_or(true, |date| slot.date == date))
        .filter(|slot| !query.available_only || !slot.is_booked)
        .collect();

    Ok(Json(json!({
        "success": true,
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<Arc<SlotCellState>>,
    Path((doctor_id, slot_id)): Path<(Uuid, Uuid)>,
    Extension(actor): Extension<Actor>,
) -> Result<StatusCode, AppError> {
    require_doctor_authority(&actor, doctor_id)?;

    let slot = state.store.get(slot_id).await?;
    if slot.doctor_id != doctor_id {
        return Err(AppError::NotFound(format!("Slot {} not found", slot_id)));
    }

    state.store.delete(slot_id).await?;
    info!("Doctor {} slot {} deleted by {}", doctor_id, slot_id, actor.user_id);

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn clear_future_slots(
    State(state): State<Arc<SlotCellState>>,
    Path(doctor_id): Path<Uuid>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    require_doctor_authority(&actor, doctor_id)?;

    let deleted = state
        .store
        .clear_unbooked_from(doctor_id, state.clock.today())
        .await;

    Ok(Json(json!({
        "success": true,
        "deleted": deleted
    })))
}
