// libs/appointment-cell/src/services/notification.rs
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::Appointment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    Booked,
    Cancelled,
    Completed,
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationEvent::Booked => write!(f, "booked"),
            NotificationEvent::Cancelled => write!(f, "cancelled"),
            NotificationEvent::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub event: NotificationEvent,
    pub appointment_id: Uuid,
    pub slot_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub reason: Option<String>,
    pub medications: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl Notification {
    pub fn for_appointment(event: NotificationEvent, appointment: &Appointment) -> Self {
        Self {
            event,
            appointment_id: appointment.id,
            slot_id: appointment.slot_id,
            doctor_id: appointment.doctor_id,
            patient_id: appointment.patient_id,
            date: appointment.date,
            start_time: appointment.start_time,
            end_time: appointment.end_time,
            reason: appointment.reason.clone(),
            medications: appointment.medications.clone(),
            notes: appointment.notes.clone(),
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Notification endpoint answered with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            event = %notification.event,
            appointment_id = %notification.appointment_id,
            patient_id = %notification.patient_id,
            doctor_id = %notification.doctor_id,
            "Appointment {} on {} at {}",
            notification.event,
            notification.date,
            notification.start_time
        );
        Ok(())
    }
}

/// POSTs each notification as JSON to a fixed endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        let response = self.client.post(&self.url).json(notification).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Rejected(status.as_u16()));
        }

        debug!("Delivered {} notification for {}", notification.event, notification.appointment_id);
        Ok(())
    }
}

/// Fans notifications out to in-process subscribers.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        if self.sender.send(notification.clone()).is_err() {
            debug!("No subscribers for {} notification", notification.event);
        }
        Ok(())
    }
}

/// Webhook delivery when configured, the log otherwise.
pub fn notifier_from_config(config: &AppConfig) -> Arc<dyn Notifier> {
    match config.notification_webhook_url.as_deref() {
        Some(url) if config.is_webhook_configured() => {
            info!("Delivering notifications to webhook {}", url);
            Arc::new(WebhookNotifier::new(url))
        }
        _ => {
            info!("No notification webhook configured; notifications go to the log");
            Arc::new(LogNotifier)
        }
    }
}

/// Handle to the background delivery task. Queuing never blocks and never
/// fails the caller; delivery is attempted once.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    /// Starts the delivery task. Must be called inside a tokio runtime.
    pub fn spawn(notifier: Arc<dyn Notifier>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<Notification>(capacity.max(1));

        tokio::spawn(async move {
            while let Some(notification) = receiver.recv().await {
                if let Err(e) = notifier.deliver(&notification).await {
                    warn!(
                        "Failed to deliver {} notification for appointment {}: {}",
                        notification.event, notification.appointment_id, e
                    );
                }
            }
            debug!("Notification queue closed");
        });

        Self { sender }
    }

    pub fn notify(&self, notification: Notification) {
        match self.sender.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => warn!(
                "Notification queue full; dropping {} event for appointment {}",
                dropped.event, dropped.appointment_id
            ),
            Err(mpsc::error::TrySendError::Closed(dropped)) => warn!(
                "Notification queue closed; dropping {} event for appointment {}",
                dropped.event, dropped.appointment_id
            ),
        }
    }
}
