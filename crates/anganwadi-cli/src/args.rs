//! Command-line argument definitions.

use anganwadi_core::export::ExportFormat;
use anganwadi_core::models::{AttendanceStatus, DetailsPatch};
use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "anganwadi",
    version,
    about = "Front office for anganwadi attendance and vaccination tracking",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show today's roster and summary
    Roster {
        /// Center name (defaults to the configured center)
        center: Option<String>,

        /// Only show children with this status
        #[arg(long, value_parser = parse_any_status)]
        status: Option<AttendanceStatus>,

        /// Filter by child name or id
        #[arg(long)]
        search: Option<String>,
    },

    /// Mark one child
    Mark {
        child_id: String,

        /// present, absent, late, sick or half-day
        #[arg(value_parser = parse_status)]
        status: AttendanceStatus,
    },

    /// Mark every child, or only the listed ones
    Bulk {
        #[arg(value_parser = parse_status)]
        status: AttendanceStatus,

        child_ids: Vec<String>,
    },

    /// Record nutrition, health check or notes
    #[command(group(
        ArgGroup::new("detail")
            .required(true)
            .multiple(true)
            .args(["nutrition", "health_check", "notes"])
    ))]
    Details {
        child_id: String,

        /// Nutrition was received today
        #[arg(long)]
        nutrition: bool,

        /// Health check was done today
        #[arg(long)]
        health_check: bool,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Show a child's attendance history
    History {
        child_id: String,

        /// First day, YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,

        /// Last day, YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show attendance statistics
    Stats {
        center: Option<String>,

        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,

        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,
    },

    /// Show vaccination doses due
    Vaccines {
        center: Option<String>,

        /// Include doses that are not due yet
        #[arg(long = "all")]
        include_scheduled: bool,
    },

    /// Write today's roster to a file
    Export {
        /// csv or xls
        #[arg(value_parser = parse_format)]
        format: ExportFormat,

        center: Option<String>,
    },
}

/// Build the patch for `details`. Unset switches leave the stored flag alone.
pub fn details_patch(nutrition: bool, health_check: bool, notes: Option<String>) -> DetailsPatch {
    DetailsPatch {
        nutrition_received: nutrition.then_some(true),
        health_check_done: health_check.then_some(true),
        notes,
    }
}

/// A status that can be written. `unmarked` is not one.
fn parse_status(raw: &str) -> Result<AttendanceStatus, String> {
    match AttendanceStatus::parse(raw) {
        Some(AttendanceStatus::Unmarked) | None => Err(format!("unknown status '{}'", raw)),
        Some(status) => Ok(status),
    }
}

fn parse_any_status(raw: &str) -> Result<AttendanceStatus, String> {
    AttendanceStatus::parse(raw).ok_or_else(|| format!("unknown status '{}'", raw))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", raw))
}

fn parse_format(raw: &str) -> Result<ExportFormat, String> {
    ExportFormat::parse(raw).ok_or_else(|| format!("unknown export format '{}'", raw))
}
