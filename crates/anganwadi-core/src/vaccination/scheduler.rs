use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::models::{Child, VaccinationEntry, VaccinationStatus, VaccineDose, VACCINE_CALENDAR};

/// Days past the due date after which a dose counts as overdue.
pub const OVERDUE_GRACE_DAYS: i64 = 30;

/// Derive a dose's status for a child of `age_months` on `today`.
pub fn dose_status(dose: &VaccineDose, due_date: NaiveDate, age_months: u32, today: NaiveDate) -> VaccinationStatus {
    if age_months < dose.due_age_months() {
        return VaccinationStatus::Scheduled;
    }
    let days_past = (today - due_date).num_days();
    if days_past > OVERDUE_GRACE_DAYS {
        VaccinationStatus::Overdue
    } else {
        VaccinationStatus::Due
    }
}

/// Computes outstanding doses as of a fixed day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaccinationScheduler {
    today: NaiveDate,
}

impl VaccinationScheduler {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Scheduler for the local calendar day.
    pub fn for_today() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Outstanding doses for one child, in calendar order.
    ///
    /// A dose counts as given only when its exact calendar name is in the child's
    /// administered list. Children without a date of birth get no entries.
    pub fn pending_doses(&self, child: &Child) -> Vec<VaccinationEntry> {
        let Some(dob) = child.date_of_birth else {
            debug!(child_id = %child.id, "No date of birth, skipping vaccine schedule");
            return Vec::new();
        };
        let age_months = child.age_in_months_on(self.today).unwrap_or(0);

        VACCINE_CALENDAR
            .iter()
            .filter(|dose| !child.has_received(dose.name))
            .map(|dose| {
                let due_date = dose.due_date(dob);
                VaccinationEntry {
                    child_id: child.id.clone(),
                    child_name: child.name.clone(),
                    vaccine_name: dose.name.to_string(),
                    due_date,
                    status: dose_status(dose, due_date, age_months, self.today),
                }
            })
            .collect()
    }

    /// Calendar doses the child has already received, marked completed.
    pub fn completed_doses(&self, child: &Child) -> Vec<VaccinationEntry> {
        let Some(dob) = child.date_of_birth else {
            return Vec::new();
        };
        VACCINE_CALENDAR
            .iter()
            .filter(|dose| child.has_received(dose.name))
            .map(|dose| VaccinationEntry {
                child_id: child.id.clone(),
                child_name: child.name.clone(),
                vaccine_name: dose.name.to_string(),
                due_date: dose.due_date(dob),
                status: VaccinationStatus::Completed,
            })
            .collect()
    }

    /// Pending doses for every child, sorted by due date regardless of child order.
    pub fn schedule(&self, children: &[Child]) -> Vec<VaccinationEntry> {
        let mut entries: Vec<VaccinationEntry> = children
            .iter()
            .flat_map(|child| self.pending_doses(child))
            .collect();
        entries.sort_by_key(|e| e.due_date);
        entries
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VaccinationCounts {
    pub scheduled: u32,
    pub due: u32,
    pub overdue: u32,
    pub completed: u32,
}

impl VaccinationCounts {
    pub fn from_entries(entries: &[VaccinationEntry]) -> Self {
        let mut counts = Self::default();
        for entry in entries {
            match entry.status {
                VaccinationStatus::Scheduled => counts.scheduled += 1,
                VaccinationStatus::Due => counts.due += 1,
                VaccinationStatus::Overdue => counts.overdue += 1,
                VaccinationStatus::Completed => counts.completed += 1,
            }
        }
        counts
    }

    /// Doses needing action now.
    pub fn actionable(&self) -> u32 {
        self.due + self.overdue
    }
}
