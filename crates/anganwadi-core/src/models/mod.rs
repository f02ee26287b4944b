//! Data models for anganwadi entities.
//!
//! - `Child`: registration reference data
//! - `Roster`, `AttendanceRecord`, `AttendanceStatus`: a day's attendance
//! - Vaccination types: the fixed `VACCINE_CALENDAR` and computed `VaccinationEntry`

pub mod attendance;
pub mod child;
pub mod vaccination;

pub use attendance::{
    AttendanceHistoryEntry, AttendanceRecord, AttendanceStatistics, AttendanceStatus,
    DetailsPatch, Provenance, Roster,
};
pub use child::{months_between, Child};
pub use vaccination::{
    find_dose, AdministeredVaccine, NewVaccination, VaccinationEntry, VaccinationStatus,
    VaccineDose, VACCINE_CALENDAR,
};
