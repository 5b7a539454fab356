pub mod interval;
pub mod open_slot;

pub use interval::{Boundary, Interval, NewInterval};
pub use open_slot::OpenSlot;
