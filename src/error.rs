//! Error taxonomy for tracking and reporting operations.

use thiserror::Error;

use crate::categories::UserId;

/// Input that cannot be accepted as an interval boundary.
///
/// Always recoverable: the caller re-prompts and the edit dialogue stays where it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("could not read '{0}' as a time, expected HH:MM or YYYY-MM-DD HH:MM")]
    MalformedTime(String),

    #[error("the end of an interval cannot be before its start")]
    EndBeforeStart,

    #[error("the time is in the future")]
    FutureTime,
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An open slot already exists for the user. Only reachable through a
    /// sequencing bug in the controller, never through user input.
    #[error("user {user_id} already has an open tracking slot")]
    Conflict { user_id: UserId },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),
}

impl TrackerError {
    /// Recovers a domain error raised inside a storage closure, or wraps the
    /// failure as a storage error.
    pub fn from_storage(err: anyhow::Error) -> Self {
        match err.downcast::<TrackerError>() {
            Ok(tracker_err) => tracker_err,
            Err(err) => match err.downcast::<ValidationError>() {
                Ok(validation) => TrackerError::Validation(validation),
                Err(err) => TrackerError::Storage(err),
            },
        }
    }
}

pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::{TrackerError, ValidationError};

    #[test]
    fn downcasts_domain_errors_out_of_storage_failures() {
        let err = anyhow::Error::new(ValidationError::EndBeforeStart);
        assert!(matches!(
            TrackerError::from_storage(err),
            TrackerError::Validation(ValidationError::EndBeforeStart)
        ));

        let err = anyhow::Error::new(TrackerError::Conflict { user_id: 7 });
        assert!(matches!(
            TrackerError::from_storage(err),
            TrackerError::Conflict { user_id: 7 }
        ));

        let err = anyhow!("disk I/O error");
        assert!(matches!(TrackerError::from_storage(err), TrackerError::Storage(_)));
    }
}
