// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_models::auth::{Actor, Role};
use slot_cell::{Clock, SlotError, SlotStore};

use crate::models::{Appointment, AppointmentError};
use crate::services::notification::{Notification, NotificationDispatcher, NotificationEvent};
use crate::services::store::AppointmentStore;

/// Turns a free slot into a booked appointment, at most once per slot.
pub struct BookingEngine {
    slots: Arc<SlotStore>,
    appointments: Arc<AppointmentStore>,
    clock: Arc<dyn Clock>,
    notifications: NotificationDispatcher,
}

impl BookingEngine {
    pub fn new(
        slots: Arc<SlotStore>,
        appointments: Arc<AppointmentStore>,
        clock: Arc<dyn Clock>,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            slots,
            appointments,
            clock,
            notifications,
        }
    }

    /// The slot mutex is held from the booked check until both the flag and
    /// the appointment are written, so concurrent callers on one slot see
    /// exactly one success. Both writes happen after the last await.
    #[instrument(skip(self, reason), fields(slot_id = %slot_id, patient_id = %patient_id))]
    pub async fn book(
        &self,
        slot_id: Uuid,
        patient_id: Uuid,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let mut guard = self.slots.acquire(slot_id).await?;

        if guard.slot().is_booked {
            debug!("Slot {} already booked", slot_id);
            return Err(AppointmentError::SlotAlreadyBooked(slot_id));
        }

        if guard.slot().starts_at() < self.clock.now() {
            warn!("Refusing to book slot {} starting at {}", slot_id, guard.slot().starts_at());
            return Err(AppointmentError::SlotInPast(slot_id));
        }

        let appointment = Appointment::for_slot(guard.slot(), patient_id, reason);
        let mut writer = self.appointments.writer().await;
        guard.mark_booked().map_err(|e| match e {
            SlotError::SlotBooked(id) => AppointmentError::SlotAlreadyBooked(id),
            other => AppointmentError::Slot(other),
        })?;
        let appointment = writer.insert(appointment);
        drop(writer);
        drop(guard);

        info!(
            "Appointment {} booked on slot {} for patient {}",
            appointment.id, slot_id, patient_id
        );
        self.notifications
            .notify(Notification::for_appointment(NotificationEvent::Booked, &appointment));

        Ok(appointment)
    }
}

/// Whose appointment a booking request creates. Patients book for
/// themselves; administrators must name the patient; doctors cannot book.
pub fn patient_for_booking(actor: &Actor, requested: Option<Uuid>) -> Result<Uuid, AppointmentError> {
    match actor.role {
        Role::Patient => match requested {
            Some(other) if other != actor.user_id => Err(AppointmentError::NotAuthorized(
                "Patients can only book for themselves".to_string(),
            )),
            _ => Ok(actor.user_id),
        },
        Role::Admin => requested.ok_or_else(|| {
            AppointmentError::InvalidArgument("patient_id is required when booking as admin".to_string())
        }),
        Role::Doctor => Err(AppointmentError::NotAuthorized(
            "Doctors cannot book appointments".to_string(),
        )),
    }
}
