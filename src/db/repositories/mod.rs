pub mod intervals;
pub mod open_slots;

pub use intervals::CategoryTotals;
