// libs/slot-cell/src/services/generator.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{AvailabilityTemplate, GenerationSummary, Slot, SlotError, DEFAULT_SLOT_DURATION_MINUTES};
use crate::services::calendar::{intervals_overlap, matching_dates, minutes_between, Clock};
use crate::services::store::SlotStore;

/// Expands availability templates into slots and publishes them.
pub struct SlotGenerator {
    store: Arc<SlotStore>,
    clock: Arc<dyn Clock>,
    granularity_minutes: u32,
    max_horizon_weeks: u32,
}

impl SlotGenerator {
    pub fn new(config: &AppConfig, store: Arc<SlotStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            granularity_minutes: config.slot_granularity_minutes.max(1),
            max_horizon_weeks: config.max_horizon_weeks.max(1),
        }
    }

    pub fn validate_template(&self, template: &AvailabilityTemplate) -> Result<(), SlotError> {
        self.validate_duration(template.slot_duration_minutes)?;

        if template.end_time <= template.start_time {
            return Err(SlotError::InvalidTemplate(
                "End time must be after start time".to_string(),
            ));
        }

        if template.horizon_weeks == 0 || template.horizon_weeks > self.max_horizon_weeks {
            return Err(SlotError::InvalidTemplate(format!(
                "Horizon must be between 1 and {} weeks",
                self.max_horizon_weeks
            )));
        }

        match (template.break_start, template.break_end) {
            (Some(start), Some(end)) if end <= start => Err(SlotError::InvalidTemplate(
                "Break end must be after break start".to_string(),
            )),
            (Some(_), None) | (None, Some(_)) => Err(SlotError::InvalidTemplate(
                "Break needs both a start and an end".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn validate_duration(&self, minutes: u32) -> Result<(), SlotError> {
        if minutes == 0 || minutes % self.granularity_minutes != 0 {
            return Err(SlotError::InvalidTemplate(format!(
                "Slot duration must be a positive multiple of {} minutes",
                self.granularity_minutes
            )));
        }
        Ok(())
    }

    /// All slots a template describes, before deduplication against the store.
    pub fn candidates(&self, template: &AvailabilityTemplate) -> Result<Vec<Slot>, SlotError> {
        self.validate_template(template)?;

        let today = self.clock.today();
        let first_day = template.start_date.map_or(today, |date| date.max(today));
        let step = Duration::minutes(template.slot_duration_minutes as i64);
        let break_window = template.break_window();

        let window = minutes_between(template.start_time, template.end_time);
        if window % template.slot_duration_minutes as i64 != 0 {
            debug!(
                "Working window of {} minutes leaves a remainder for {}-minute slots",
                window, template.slot_duration_minutes
            );
        }

        let mut slots = Vec::new();
        for date in matching_dates(first_day, template.horizon_weeks, &template.weekdays) {
            for (start, end) in day_steps(template.start_time, template.end_time, step) {
                let in_break = break_window
                    .is_some_and(|(b_start, b_end)| intervals_overlap(start, end, b_start, b_end));
                if in_break {
                    continue;
                }
                slots.push(Slot::new(
                    template.doctor_id,
                    date,
                    start,
                    template.slot_duration_minutes,
                )?);
            }
        }

        Ok(slots)
    }

    /// Publishes a template. Candidates that collide with an existing slot
    /// (same start or any overlap) are counted as skipped.
    pub async fn generate(&self, template: &AvailabilityTemplate) -> Result<GenerationSummary, SlotError> {
        let candidates = self.candidates(template)?;
        let mut summary = GenerationSummary::default();

        for slot in candidates {
            match self.store.insert(slot).await {
                Ok(_) => summary.created += 1,
                Err(SlotError::SlotConflict { .. }) => summary.skipped += 1,
                Err(e) => return Err(e),
            }
        }

        info!(
            "Generated slots for doctor {}: {} created, {} skipped",
            template.doctor_id, summary.created, summary.skipped
        );
        Ok(summary)
    }

    /// Publishes one slot outside of any template.
    pub async fn create_single(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        duration_minutes: Option<u32>,
    ) -> Result<Slot, SlotError> {
        let duration = duration_minutes.unwrap_or(DEFAULT_SLOT_DURATION_MINUTES);
        self.validate_duration(duration)?;

        let slot = Slot::new(doctor_id, date, start_time, duration)?;
        let slot = self.store.insert(slot).await?;
        debug!("Created slot {} for doctor {} on {} at {}", slot.id, doctor_id, date, start_time);
        Ok(slot)
    }
}

/// Consecutive `[start, start + step)` intervals that fit before `end`.
fn day_steps(start: NaiveTime, end: NaiveTime, step: Duration) -> Vec<(NaiveTime, NaiveTime)> {
    let mut steps = Vec::new();
    let mut cursor = start;
    loop {
        let (next, wrapped) = cursor.overflowing_add_signed(step);
        if wrapped != 0 || next > end || next <= cursor {
            break;
        }
        steps.push((cursor, next));
        cursor = next;
    }
    steps
}
