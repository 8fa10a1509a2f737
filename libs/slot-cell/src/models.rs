// libs/slot-cell/src/models.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::services::calendar::intervals_overlap;

// ==============================================================================
// SLOT
// ==============================================================================

/// A concrete, fixed-length interval a doctor offers for booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_booked: bool,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    /// Builds an unbooked slot. Fails when the interval would cross midnight
    /// or has no length.
    pub fn new(
        doctor_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        duration_minutes: u32,
    ) -> Result<Self, SlotError> {
        if duration_minutes == 0 {
            return Err(SlotError::InvalidTemplate(
                "Slot duration must be positive".to_string(),
            ));
        }

        let (end_time, wrapped) =
            start_time.overflowing_add_signed(Duration::minutes(duration_minutes as i64));
        if wrapped != 0 || end_time <= start_time {
            return Err(SlotError::InvalidTemplate(format!(
                "Slot starting at {} must end on the same day",
                start_time
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            doctor_id,
            date,
            start_time,
            end_time,
            is_booked: false,
            created_at: Utc::now(),
        })
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Half-open overlap on the same doctor and date.
    pub fn overlaps(&self, other: &Slot) -> bool {
        self.doctor_id == other.doctor_id
            && self.date == other.date
            && intervals_overlap(self.start_time, self.end_time, other.start_time, other.end_time)
    }
}

// ==============================================================================
// AVAILABILITY TEMPLATE
// ==============================================================================

/// A weekly working pattern that is expanded into slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityTemplate {
    pub doctor_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: u32,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    pub weekdays: Vec<Weekday>,
    pub horizon_weeks: u32,
    /// First day to generate for; today when absent or in the past.
    pub start_date: Option<NaiveDate>,
}

impl AvailabilityTemplate {
    pub fn break_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.break_start, self.break_end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_slot_duration")]
    pub slot_duration_minutes: u32,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    pub weekdays: Vec<Weekday>,
    #[serde(default = "default_horizon_weeks")]
    pub horizon_weeks: u32,
    pub start_date: Option<NaiveDate>,
}

impl CreateTemplateRequest {
    pub fn into_template(self, doctor_id: Uuid) -> AvailabilityTemplate {
        AvailabilityTemplate {
            doctor_id,
            start_time: self.start_time,
            end_time: self.end_time,
            slot_duration_minutes: self.slot_duration_minutes,
            break_start: self.break_start,
            break_end: self.break_end,
            weekdays: self.weekdays,
            horizon_weeks: self.horizon_weeks,
            start_date: self.start_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotQuery {
    pub date_from: Option<NaiveDate>,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub available_only: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub created: usize,
    pub skipped: usize,
}

pub const DEFAULT_SLOT_DURATION_MINUTES: u32 = 30;

fn default_slot_duration() -> u32 {
    DEFAULT_SLOT_DURATION_MINUTES
}

fn default_horizon_weeks() -> u32 {
    4
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("Invalid availability template: {0}")]
    InvalidTemplate(String),

    #[error("Slot overlaps an existing slot for doctor {doctor_id} on {date} at {start_time}")]
    SlotConflict {
        doctor_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
    },

    #[error("Slot {0} not found")]
    SlotNotFound(Uuid),

    #[error("Slot {0} is booked and cannot be removed")]
    SlotBooked(Uuid),
}

impl From<SlotError> for AppError {
    fn from(err: SlotError) -> Self {
        match err {
            SlotError::InvalidTemplate(_) => AppError::BadRequest(err.to_string()),
            SlotError::SlotConflict { .. } | SlotError::SlotBooked(_) => {
                AppError::Conflict(err.to_string())
            }
            SlotError::SlotNotFound(_) => AppError::NotFound(err.to_string()),
        }
    }
}
