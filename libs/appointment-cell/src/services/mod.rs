pub mod booking;
pub mod lifecycle;
pub mod notification;
pub mod store;

pub use booking::{patient_for_booking, BookingEngine};
pub use lifecycle::AppointmentLifecycleService;
pub use notification::{
    notifier_from_config, BroadcastNotifier, LogNotifier, Notification, NotificationDispatcher,
    NotificationError, NotificationEvent, Notifier, WebhookNotifier,
};
pub use store::{AppointmentStore, AppointmentWriter};
