// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;
use slot_cell::{Clock, SlotStore};

use crate::handlers;
use crate::services::{AppointmentLifecycleService, AppointmentStore, BookingEngine, NotificationDispatcher};

#[derive(Clone)]
pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub appointments: Arc<AppointmentStore>,
    pub booking: Arc<BookingEngine>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
}

impl AppointmentCellState {
    pub fn new(
        config: Arc<AppConfig>,
        slots: Arc<SlotStore>,
        clock: Arc<dyn Clock>,
        notifications: NotificationDispatcher,
    ) -> Self {
        let appointments = Arc::new(AppointmentStore::new());
        let booking = Arc::new(BookingEngine::new(
            Arc::clone(&slots),
            Arc::clone(&appointments),
            clock,
            notifications.clone(),
        ));
        let lifecycle = Arc::new(AppointmentLifecycleService::new(
            slots,
            Arc::clone(&appointments),
            notifications,
        ));

        Self {
            config,
            appointments,
            booking,
            lifecycle,
        }
    }
}

pub fn appointment_routes(state: Arc<AppointmentCellState>) -> Router {
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/my", get(handlers::get_my_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/cancel", put(handlers::cancel_appointment))
        .route("/{appointment_id}/complete", put(handlers::complete_appointment))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth_middleware,
        ))
        .with_state(state)
}
