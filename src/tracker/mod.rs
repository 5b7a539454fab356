pub mod controller;
pub mod state;

pub use controller::TrackingController;
pub use state::{ClosedSpan, StartOutcome, StopOutcome, TrackingState};
