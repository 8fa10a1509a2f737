pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::{slot_routes, SlotCellState};
pub use services::{Clock, FixedClock, SlotGenerator, SlotGuard, SlotStore, SystemClock};
