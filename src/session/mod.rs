pub mod machine;
pub mod state;

pub use machine::{EditSessions, SubmitOutcome};
pub use state::{EditSession, SessionKind};
