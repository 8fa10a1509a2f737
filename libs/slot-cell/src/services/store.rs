// libs/slot-cell/src/services/store.rs
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Slot, SlotError};

// Lock discipline: the index lock is only ever held for synchronous work.
// A task may wait on the index while holding a slot mutex, never the reverse.
// Removals take every lock they need before mutating anything, so a dropped
// call leaves the store untouched.

#[derive(Debug)]
struct SlotEntry {
    slot: Slot,
    retired: bool,
}

#[derive(Debug, Clone, Copy)]
struct IndexedInterval {
    id: Uuid,
    end_time: NaiveTime,
}

type DayKey = (NaiveDate, NaiveTime);

#[derive(Default)]
struct SlotIndex {
    slots: HashMap<Uuid, Arc<Mutex<SlotEntry>>>,
    by_doctor: HashMap<Uuid, BTreeMap<DayKey, IndexedInterval>>,
}

impl SlotIndex {
    fn find_overlap(&self, slot: &Slot) -> Option<IndexedInterval> {
        let timeline = self.by_doctor.get(&slot.doctor_id)?;
        // Intervals never overlap, so only the latest one starting before
        // the new end can reach into the new interval.
        timeline
            .range((slot.date, NaiveTime::MIN)..(slot.date, slot.end_time))
            .next_back()
            .map(|(_, interval)| *interval)
            .filter(|interval| interval.end_time > slot.start_time)
    }

    fn remove(&mut self, slot: &Slot) {
        self.slots.remove(&slot.id);
        if let Some(timeline) = self.by_doctor.get_mut(&slot.doctor_id) {
            timeline.remove(&(slot.date, slot.start_time));
            if timeline.is_empty() {
                self.by_doctor.remove(&slot.doctor_id);
            }
        }
    }
}

/// Exclusive hold on one slot. Booking state changes only through a guard.
#[derive(Debug)]
pub struct SlotGuard {
    entry: OwnedMutexGuard<SlotEntry>,
}

impl SlotGuard {
    pub fn slot(&self) -> &Slot {
        &self.entry.slot
    }

    pub fn mark_booked(&mut self) -> Result<Slot, SlotError> {
        if self.entry.slot.is_booked {
            return Err(SlotError::SlotBooked(self.entry.slot.id));
        }
        self.entry.slot.is_booked = true;
        Ok(self.entry.slot.clone())
    }

    pub fn mark_unbooked(&mut self) -> Slot {
        self.entry.slot.is_booked = false;
        self.entry.slot.clone()
    }
}

/// In-memory slot collection with a per-doctor timeline index and one
/// mutex per slot.
#[derive(Default)]
pub struct SlotStore {
    index: RwLock<SlotIndex>,
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a slot, rejecting any interval that overlaps an existing slot of
    /// the same doctor on the same date.
    pub async fn insert(&self, slot: Slot) -> Result<Slot, SlotError> {
        let mut index = self.index.write().await;

        if let Some(existing) = index.find_overlap(&slot) {
            debug!(
                "Slot {} on {} at {} overlaps existing slot {}",
                slot.doctor_id, slot.date, slot.start_time, existing.id
            );
            return Err(SlotError::SlotConflict {
                doctor_id: slot.doctor_id,
                date: slot.date,
                start_time: slot.start_time,
            });
        }

        index
            .by_doctor
            .entry(slot.doctor_id)
            .or_default()
            .insert(
                (slot.date, slot.start_time),
                IndexedInterval {
                    id: slot.id,
                    end_time: slot.end_time,
                },
            );
        index.slots.insert(
            slot.id,
            Arc::new(Mutex::new(SlotEntry {
                slot: slot.clone(),
                retired: false,
            })),
        );

        Ok(slot)
    }

    pub async fn get(&self, slot_id: Uuid) -> Result<Slot, SlotError> {
        let guard = self.acquire(slot_id).await?;
        Ok(guard.slot().clone())
    }

    /// Locks a live slot for a booking-state transition.
    pub async fn acquire(&self, slot_id: Uuid) -> Result<SlotGuard, SlotError> {
        let cell = self.cell(slot_id).await?;
        let entry = cell.lock_owned().await;
        if entry.retired {
            return Err(SlotError::SlotNotFound(slot_id));
        }
        Ok(SlotGuard { entry })
    }

    /// Slots of a doctor ordered by `(date, start_time)`, optionally from a
    /// given date onwards.
    pub async fn list_by_doctor(&self, doctor_id: Uuid, date_from: Option<NaiveDate>) -> Vec<Slot> {
        let cells = self.cells_from(doctor_id, date_from).await;

        let mut slots = Vec::with_capacity(cells.len());
        for cell in cells {
            let entry = cell.lock().await;
            if !entry.retired {
                slots.push(entry.slot.clone());
            }
        }
        slots
    }

    pub async fn delete(&self, slot_id: Uuid) -> Result<Slot, SlotError> {
        let mut guard = self.acquire(slot_id).await?;
        if guard.entry.slot.is_booked {
            return Err(SlotError::SlotBooked(slot_id));
        }

        let mut index = self.index.write().await;
        guard.entry.retired = true;
        index.remove(&guard.entry.slot);

        debug!("Deleted slot {}", slot_id);
        Ok(guard.entry.slot.clone())
    }

    /// Deletes every unbooked slot of the doctor dated on or after `date`.
    pub async fn clear_unbooked_from(&self, doctor_id: Uuid, date: NaiveDate) -> usize {
        let cells = self.cells_from(doctor_id, Some(date)).await;

        // Timeline order, so concurrent clears lock slots in the same order.
        let mut entries = Vec::with_capacity(cells.len());
        for cell in cells {
            entries.push(cell.lock_owned().await);
        }
        let mut index = self.index.write().await;

        let mut cleared = 0;
        for entry in entries.iter_mut().filter(|e| !e.retired && !e.slot.is_booked) {
            entry.retired = true;
            index.remove(&entry.slot);
            cleared += 1;
        }

        info!("Cleared {} unbooked slots for doctor {} from {}", cleared, doctor_id, date);
        cleared
    }

    pub async fn mark_unbooked(&self, slot_id: Uuid) -> Result<Slot, SlotError> {
        let mut guard = self.acquire(slot_id).await?;
        Ok(guard.mark_unbooked())
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn cell(&self, slot_id: Uuid) -> Result<Arc<Mutex<SlotEntry>>, SlotError> {
        self.index
            .read()
            .await
            .slots
            .get(&slot_id)
            .cloned()
            .ok_or(SlotError::SlotNotFound(slot_id))
    }

    async fn cells_from(&self, doctor_id: Uuid, date_from: Option<NaiveDate>) -> Vec<Arc<Mutex<SlotEntry>>> {
        let index = self.index.read().await;
        let Some(timeline) = index.by_doctor.get(&doctor_id) else {
            return Vec::new();
        };

        let lower = (date_from.unwrap_or(NaiveDate::MIN), NaiveTime::MIN);
        timeline
            .range(lower..)
            .filter_map(|(_, interval)| index.slots.get(&interval.id).cloned())
            .collect()
    }
}
