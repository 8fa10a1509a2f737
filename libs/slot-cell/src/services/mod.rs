pub mod calendar;
pub mod generator;
pub mod store;

pub use calendar::{Clock, FixedClock, SystemClock};
pub use generator::SlotGenerator;
pub use store::{SlotGuard, SlotStore};
