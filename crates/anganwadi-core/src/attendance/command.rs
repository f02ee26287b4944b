use chrono::NaiveTime;

use crate::models::{AttendanceRecord, AttendanceStatus, Roster};

use super::error::AttendanceError;

/// Time-in stamp format.
pub const TIME_IN_FORMAT: &str = "%H:%M";

/// Set one child's status as of a wall-clock time.
///
/// Applying a command never mutates its input; it returns a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkAttendanceCommand {
    pub child_id: String,
    pub status: AttendanceStatus,
    pub at: NaiveTime,
}

impl MarkAttendanceCommand {
    pub fn new(child_id: impl Into<String>, status: AttendanceStatus, at: NaiveTime) -> Self {
        Self {
            child_id: child_id.into(),
            status,
            at,
        }
    }

    /// The command applied when a write fails: back to unmarked.
    pub fn rollback(child_id: impl Into<String>) -> Self {
        Self::new(child_id, AttendanceStatus::Unmarked, NaiveTime::default())
    }

    pub fn apply_to_record(&self, record: &AttendanceRecord) -> AttendanceRecord {
        let mut next = record.clone();
        next.status = self.status;

        if self.status.records_time_in() {
            // Keep the first arrival stamp when re-marking an attending child
            let already_in = record.status.records_time_in() && record.time_in.is_some();
            if !already_in {
                next.time_in = Some(self.at.format(TIME_IN_FORMAT).to_string());
            }
        } else {
            next.time_in = None;
        }

        if !self.status.allows_details() {
            next.nutrition_received = false;
            next.health_check_done = false;
        }
        next
    }

    pub fn apply(&self, roster: &Roster) -> Result<Roster, AttendanceError> {
        let mut next = roster.clone();
        let record = next
            .get_mut(&self.child_id)
            .ok_or_else(|| AttendanceError::UnknownChild(self.child_id.clone()))?;
        *record = self.apply_to_record(record);
        Ok(next)
    }
}
