// libs/slot-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{Clock, SlotGenerator, SlotStore};

/// Everything the slot handlers share.
#[derive(Clone)]
pub struct SlotCellState {
    pub config: Arc<AppConfig>,
    pub store: Arc<SlotStore>,
    pub generator: Arc<SlotGenerator>,
    pub clock: Arc<dyn Clock>,
}

impl SlotCellState {
    pub fn new(config: Arc<AppConfig>, store: Arc<SlotStore>, clock: Arc<dyn Clock>) -> Self {
        let generator = Arc::new(SlotGenerator::new(&config, Arc::clone(&store), Arc::clone(&clock)));
        Self {
            config,
            store,
            generator,
            clock,
        }
    }
}

pub fn slot_routes(state: Arc<SlotCellState>) -> Router {
    Router::new()
        .route(
            "/{doctor_id}/slots",
            post(handlers::create_slot).get(handlers::list_slots),
        )
        .route("/{doctor_id}/slots/bulk", post(handlers::create_slots_from_template))
        .route("/{doctor_id}/slots/future", delete(handlers::clear_future_slots))
        .route("/{doctor_id}/slots/{slot_id}", delete(handlers::delete_slot))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth_middleware,
        ))
        .with_state(state)
}
