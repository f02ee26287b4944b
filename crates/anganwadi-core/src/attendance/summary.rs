use serde::Serialize;

use crate::models::{AttendanceStatus, Roster};

/// Counts derived from a roster. Recomputed on every change, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Summary {
    pub total: u32,
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub sick: u32,
    pub half_day: u32,
    pub unmarked: u32,
    /// present + late + half-day
    pub total_present: u32,
    /// Whole percent, 0 for an empty roster
    pub attendance_rate: u32,
    pub nutrition_count: u32,
    pub health_check_count: u32,
}

impl Summary {
    pub fn from_roster(roster: &Roster) -> Self {
        let mut summary = Summary {
            total: roster.records.len() as u32,
            ..Default::default()
        };

        for record in &roster.records {
            match record.status {
                AttendanceStatus::Present => summary.present += 1,
                AttendanceStatus::Absent => summary.absent += 1,
                AttendanceStatus::Late => summary.late += 1,
                AttendanceStatus::Sick => summary.sick += 1,
                AttendanceStatus::HalfDay => summary.half_day += 1,
                AttendanceStatus::Unmarked => summary.unmarked += 1,
            }
            if record.status.counts_as_attended() {
                summary.total_present += 1;
            }
            if record.nutrition_received {
                summary.nutrition_count += 1;
            }
            if record.health_check_done {
                summary.health_check_count += 1;
            }
        }

        summary.attendance_rate = if summary.total == 0 {
            0
        } else {
            (summary.total_present as f64 / summary.total as f64 * 100.0).round() as u32
        };
        summary
    }

    pub fn rate_display(&self) -> String {
        format!("{}%", self.attendance_rate)
    }
}
