// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::auth::Actor;
use shared_models::error::AppError;
use slot_cell::{Slot, SlotError};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub medications: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// A fresh `booked` appointment on the given slot.
    pub fn for_slot(slot: &Slot, patient_id: Uuid, reason: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            slot_id: slot.id,
            doctor_id: slot.doctor_id,
            patient_id,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            reason: reason.filter(|r| !r.trim().is_empty()),
            status: AppointmentStatus::Booked,
            medications: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Booked and completed appointments keep their slot occupied.
    pub fn holds_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    /// Patient, doctor and administrators may see an appointment.
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        actor.is_patient(self.patient_id) || actor.acts_for_doctor(self.doctor_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Booked => write!(f, "booked"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub slot_id: Uuid,
    pub reason: Option<String>,
    /// Only administrators book on behalf of a patient.
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteAppointmentRequest {
    pub medications: String,
    pub notes: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppointmentError {
    #[error("Slot {0} is already booked")]
    SlotAlreadyBooked(Uuid),

    #[error("Slot {0} starts in the past")]
    SlotInPast(Uuid),

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Appointment {0} not found")]
    AppointmentNotFound(Uuid),

    #[error(transparent)]
    Slot(#[from] SlotError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::SlotAlreadyBooked(_) | AppointmentError::InvalidTransition { .. } => {
                AppError::Conflict(err.to_string())
            }
            AppointmentError::SlotInPast(_) | AppointmentError::InvalidArgument(_) => {
                AppError::BadRequest(err.to_string())
            }
            AppointmentError::NotAuthorized(_) => AppError::Forbidden(err.to_string()),
            AppointmentError::AppointmentNotFound(_) => AppError::NotFound(err.to_string()),
            AppointmentError::Slot(slot_err) => AppError::from(slot_err),
        }
    }
}
