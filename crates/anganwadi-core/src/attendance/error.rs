use thiserror::Error;

use crate::api::ApiError;
use crate::models::AttendanceStatus;

#[derive(Error, Debug)]
pub enum AttendanceError {
    /// Every roster source failed without a single usable answer.
    #[error("Attendance data unavailable for {center} after {attempts} attempts: {last_error}")]
    DataUnavailable {
        center: String,
        attempts: usize,
        #[source]
        last_error: ApiError,
    },

    /// The server rejected a write. The optimistic change has been rolled back.
    #[error("Failed to save attendance for {subject}: {source}")]
    MutationFailed {
        subject: String,
        #[source]
        source: ApiError,
    },

    #[error("Cannot update nutrition/health details for {child_id} while status is {status}")]
    InvalidTransition {
        child_id: String,
        status: AttendanceStatus,
    },

    #[error("Network error: {0}")]
    NetworkError(#[from] ApiError),

    #[error("Child {0} is not on the current roster")]
    UnknownChild(String),
}
