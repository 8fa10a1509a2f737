// libs/appointment-cell/src/services/store.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, RwLockWriteGuard};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError};

#[derive(Default)]
struct AppointmentIndex {
    appointments: HashMap<Uuid, Arc<Mutex<Appointment>>>,
    by_patient: HashMap<Uuid, Vec<Uuid>>,
    by_doctor: HashMap<Uuid, Vec<Uuid>>,
    by_slot: HashMap<Uuid, Vec<Uuid>>,
}

/// Write access to the appointment index. Registering through a writer is
/// synchronous, so a caller can take it before changing any other state.
pub struct AppointmentWriter<'a> {
    index: RwLockWriteGuard<'a, AppointmentIndex>,
}

impl AppointmentWriter<'_> {
    pub fn insert(&mut self, appointment: Appointment) -> Appointment {
        let index = &mut *self.index;
        index.by_patient.entry(appointment.patient_id).or_default().push(appointment.id);
        index.by_doctor.entry(appointment.doctor_id).or_default().push(appointment.id);
        index.by_slot.entry(appointment.slot_id).or_default().push(appointment.id);
        index
            .appointments
            .insert(appointment.id, Arc::new(Mutex::new(appointment.clone())));
        appointment
    }
}

/// Appointment records, one mutex each. Records are never removed.
#[derive(Default)]
pub struct AppointmentStore {
    index: RwLock<AppointmentIndex>,
}

impl AppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn writer(&self) -> AppointmentWriter<'_> {
        AppointmentWriter {
            index: self.index.write().await,
        }
    }

    pub async fn insert(&self, appointment: Appointment) -> Appointment {
        self.writer().await.insert(appointment)
    }

    /// Exclusive hold on one appointment for a lifecycle transition.
    pub async fn lock(&self, appointment_id: Uuid) -> Result<OwnedMutexGuard<Appointment>, AppointmentError> {
        let cell = self
            .index
            .read()
            .await
            .appointments
            .get(&appointment_id)
            .cloned()
            .ok_or(AppointmentError::AppointmentNotFound(appointment_id))?;
        Ok(cell.lock_owned().await)
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        Ok(self.lock(appointment_id).await?.clone())
    }

    pub async fn list_all(&self) -> Vec<Appointment> {
        let cells: Vec<_> = self.index.read().await.appointments.values().cloned().collect();
        Self::snapshot(cells).await
    }

    pub async fn list_for_patient(&self, patient_id: Uuid) -> Vec<Appointment> {
        let cells = self.cells(|index| index.by_patient.get(&patient_id)).await;
        Self::snapshot(cells).await
    }

    pub async fn list_for_doctor(&self, doctor_id: Uuid) -> Vec<Appointment> {
        let cells = self.cells(|index| index.by_doctor.get(&doctor_id)).await;
        Self::snapshot(cells).await
    }

    /// Every appointment ever made on a slot, cancelled ones included.
    pub async fn list_for_slot(&self, slot_id: Uuid) -> Vec<Appointment> {
        let cells = self.cells(|index| index.by_slot.get(&slot_id)).await;
        Self::snapshot(cells).await
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.appointments.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn cells<F>(&self, select: F) -> Vec<Arc<Mutex<Appointment>>>
    where
        F: FnOnce(&AppointmentIndex) -> Option<&Vec<Uuid>>,
    {
        let index = self.index.read().await;
        select(&index)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| index.appointments.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    // Newest first.
    async fn snapshot(cells: Vec<Arc<Mutex<Appointment>>>) -> Vec<Appointment> {
        let mut appointments = Vec::with_capacity(cells.len());
        for cell in cells {
            appointments.push(cell.lock().await.clone());
        }
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        appointments
    }
}
