//! Core library for the anganwadi front office: daily attendance
//! reconciliation and vaccination due-date scheduling.

pub mod api;
pub mod attendance;
pub mod config;
pub mod export;
pub mod models;
pub mod utils;
pub mod vaccination;

pub use api::{ApiClient, ApiError, ApiResult};
pub use attendance::{
    AttendanceBackend, AttendanceError, AttendanceMutator, AttendanceResolver, AttendanceView, Summary,
};
pub use config::Config;
pub use export::ExportFormat;
pub use models::{AttendanceRecord, AttendanceStatus, Child, Roster, VaccinationEntry, VaccinationStatus};
pub use vaccination::{VaccinationBackend, VaccinationScheduler, VaccinationService};
