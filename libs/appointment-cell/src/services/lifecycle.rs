// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_models::auth::{Actor, Role};
use slot_cell::SlotStore;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::notification::{Notification, NotificationDispatcher, NotificationEvent};
use crate::services::store::AppointmentStore;

// Lock order: appointment mutex first, then the slot mutex.

pub struct AppointmentLifecycleService {
    slots: Arc<SlotStore>,
    appointments: Arc<AppointmentStore>,
    notifications: NotificationDispatcher,
}

impl AppointmentLifecycleService {
    pub fn new(
        slots: Arc<SlotStore>,
        appointments: Arc<AppointmentStore>,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            slots,
            appointments,
            notifications,
        }
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if current_status.is_terminal() {
            debug!("Appointment already {}; refusing {}", current_status, new_status);
            return Err(AppointmentError::InvalidTransition {
                from: current_status,
                to: new_status,
            });
        }
        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidTransition {
                from: current_status,
                to: new_status,
            });
        }
        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Booked => vec![AppointmentStatus::Cancelled, AppointmentStatus::Completed],
            // Terminal states
            AppointmentStatus::Cancelled | AppointmentStatus::Completed => vec![],
        }
    }

    /// Cancels a booked appointment and frees its slot for rebooking.
    #[instrument(skip(self, actor), fields(appointment_id = %appointment_id, actor = %actor.user_id))]
    pub async fn cancel(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.appointments.lock(appointment_id).await?;

        if !appointment.is_visible_to(actor) {
            return Err(AppointmentError::NotAuthorized(
                "Only the patient, the doctor or an administrator can cancel".to_string(),
            ));
        }
        self.validate_status_transition(appointment.status, AppointmentStatus::Cancelled)?;

        // Both records change under their locks, so no reader sees the slot
        // free while the appointment still holds it.
        let mut slot = self.slots.acquire(appointment.slot_id).await?;
        slot.mark_unbooked();
        appointment.status = AppointmentStatus::Cancelled;
        appointment.updated_at = Utc::now();
        drop(slot);

        let cancelled = appointment.clone();
        drop(appointment);

        info!("Appointment {} cancelled; slot {} is free again", cancelled.id, cancelled.slot_id);
        self.notifications
            .notify(Notification::for_appointment(NotificationEvent::Cancelled, &cancelled));

        Ok(cancelled)
    }

    /// Completes a visit with its prescription. The slot stays consumed.
    #[instrument(skip(self, actor, medications, notes), fields(appointment_id = %appointment_id, actor = %actor.user_id))]
    pub async fn complete(
        &self,
        appointment_id: Uuid,
        actor: &Actor,
        medications: &str,
        notes: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.appointments.lock(appointment_id).await?;

        if !actor.acts_for_doctor(appointment.doctor_id) {
            return Err(AppointmentError::NotAuthorized(
                "Only the doctor or an administrator can complete".to_string(),
            ));
        }
        self.validate_status_transition(appointment.status, AppointmentStatus::Completed)?;

        let medications = medications.trim();
        let notes = notes.trim();
        if medications.is_empty() || notes.is_empty() {
            return Err(AppointmentError::InvalidArgument(
                "Medications and notes are both required".to_string(),
            ));
        }

        appointment.status = AppointmentStatus::Completed;
        appointment.medications = Some(medications.to_string());
        appointment.notes = Some(notes.to_string());
        appointment.updated_at = Utc::now();

        let completed = appointment.clone();
        drop(appointment);

        info!("Appointment {} completed", completed.id);
        self.notifications
            .notify(Notification::for_appointment(NotificationEvent::Completed, &completed));

        Ok(completed)
    }

    pub async fn get(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        let appointment = self.appointments.get(appointment_id).await?;
        if !appointment.is_visible_to(actor) {
            debug!("Actor {} may not view appointment {}", actor.user_id, appointment_id);
            return Err(AppointmentError::NotAuthorized(
                "Not allowed to view this appointment".to_string(),
            ));
        }
        Ok(appointment)
    }

    /// Patients see their own appointments, doctors those on their slots,
    /// administrators all of them. Newest first.
    pub async fn list_for_actor(&self, actor: &Actor) -> Vec<Appointment> {
        match actor.role {
            Role::Patient => self.appointments.list_for_patient(actor.user_id).await,
            Role::Doctor => self.appointments.list_for_doctor(actor.user_id).await,
            Role::Admin => self.appointments.list_all().await,
        }
    }
}
