use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A dose in the fixed immunization calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaccineDose {
    pub name: &'static str,
    pub due_weeks: u32,
    pub description: &'static str,
}

impl VaccineDose {
    /// Offset from birth at which the dose falls due.
    pub fn offset(&self) -> Duration {
        Duration::weeks(self.due_weeks as i64)
    }

    pub fn due_date(&self, date_of_birth: NaiveDate) -> NaiveDate {
        date_of_birth + self.offset()
    }

    /// Due age expressed in completed 30-day months.
    pub fn due_age_months(&self) -> u32 {
        self.due_weeks * 7 / 30
    }
}

/// National immunization calendar, in administration order. Append-only.
pub const VACCINE_CALENDAR: &[VaccineDose] = &[
    VaccineDose { name: "BCG", due_weeks: 0, description: "Tuberculosis, given at birth" },
    VaccineDose { name: "Hepatitis B Birth", due_weeks: 0, description: "Hepatitis B birth dose" },
    VaccineDose { name: "OPV 1", due_weeks: 6, description: "Oral polio vaccine, first dose" },
    VaccineDose { name: "DPT 1", due_weeks: 6, description: "Diphtheria, pertussis, tetanus, first dose" },
    VaccineDose { name: "Hepatitis B 1", due_weeks: 6, description: "Hepatitis B, first dose" },
    VaccineDose { name: "OPV 2", due_weeks: 10, description: "Oral polio vaccine, second dose" },
    VaccineDose { name: "DPT 2", due_weeks: 10, description: "Diphtheria, pertussis, tetanus, second dose" },
    VaccineDose { name: "Hepatitis B 2", due_weeks: 10, description: "Hepatitis B, second dose" },
    VaccineDose { name: "OPV 3", due_weeks: 14, description: "Oral polio vaccine, third dose" },
    VaccineDose { name: "DPT 3", due_weeks: 14, description: "Diphtheria, pertussis, tetanus, third dose" },
    VaccineDose { name: "Hepatitis B 3", due_weeks: 14, description: "Hepatitis B, third dose" },
    VaccineDose { name: "MMR 1", due_weeks: 39, description: "Measles, mumps, rubella, first dose" },
    VaccineDose { name: "MMR 2", due_weeks: 70, description: "Measles, mumps, rubella, second dose" },
    VaccineDose { name: "DPT Booster", due_weeks: 70, description: "Diphtheria, pertussis, tetanus booster" },
];

pub fn find_dose(name: &str) -> Option<&'static VaccineDose> {
    VACCINE_CALENDAR.iter().find(|d| d.name == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum VaccinationStatus {
    Scheduled,
    Due,
    Overdue,
    Completed,
}

impl std::fmt::Display for VaccinationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaccinationStatus::Scheduled => write!(f, "Scheduled"),
            VaccinationStatus::Due => write!(f, "Due"),
            VaccinationStatus::Overdue => write!(f, "Overdue"),
            VaccinationStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// A computed schedule line. Rebuilt on every load, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct VaccinationEntry {
    pub child_id: String,
    pub child_name: String,
    pub vaccine_name: String,
    pub due_date: NaiveDate,
    pub status: VaccinationStatus,
}

/// A dose as recorded by the health service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministeredVaccine {
    #[serde(alias = "name", alias = "vaccine")]
    pub vaccine_name: String,
    #[serde(default)]
    pub date_given: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body for recording a newly administered dose.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVaccination {
    pub child_id: String,
    pub vaccine_name: String,
    pub date_given: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
