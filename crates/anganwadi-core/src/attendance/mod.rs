//! Attendance reconciliation.
//!
//! - `AttendanceResolver`: today's roster via an ordered fallback chain
//! - `AttendanceMutator`: single and bulk marks with optimistic update/rollback
//! - `Summary`: counts and attendance rate derived from a roster
//! - `AttendanceView`: the view-owned snapshot plus staleness tracking

pub mod backend;
pub mod command;
pub mod error;
pub mod mutator;
pub mod resolver;
pub mod summary;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::AttendanceBackend;
pub use command::MarkAttendanceCommand;
pub use error::AttendanceError;
pub use mutator::{AttendanceMutator, MarkOutcome, PendingMark};
pub use resolver::{resolve_with, AttendanceEndpoint, AttendanceResolver, RegistrationLookup, ResolvedRoster, RosterSource};
pub use summary::Summary;
pub use view::{AttendanceView, FetchTicket, MutationToken};
