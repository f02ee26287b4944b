use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::Child;

/// Daily attendance status for one child.
///
/// Any status may replace any other; there is no ordering between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum AttendanceStatus {
    #[default]
    Unmarked,
    Present,
    Absent,
    Late,
    Sick,
    HalfDay,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 6] = [
        AttendanceStatus::Unmarked,
        AttendanceStatus::Present,
        AttendanceStatus::Absent,
        AttendanceStatus::Late,
        AttendanceStatus::Sick,
        AttendanceStatus::HalfDay,
    ];

    /// Parse a status string as sent by the backend or typed by a user.
    /// Returns `None` for anything outside the fixed status set.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unmarked" | "" => Some(AttendanceStatus::Unmarked),
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "late" => Some(AttendanceStatus::Late),
            "sick" => Some(AttendanceStatus::Sick),
            "half-day" | "half_day" | "halfday" | "half day" => Some(AttendanceStatus::HalfDay),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Unmarked => "unmarked",
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Sick => "sick",
            AttendanceStatus::HalfDay => "half-day",
        }
    }

    /// Child is physically at the center and gets a time-in stamp.
    pub fn records_time_in(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }

    /// Nutrition and health-check flags are only meaningful for these statuses.
    pub fn allows_details(&self) -> bool {
        self.records_time_in()
    }

    /// Counts towards `totalPresent` in the summary.
    pub fn counts_as_attended(&self) -> bool {
        matches!(
            self,
            AttendanceStatus::Present | AttendanceStatus::Late | AttendanceStatus::HalfDay
        )
    }
}

impl From<String> for AttendanceStatus {
    fn from(s: String) -> Self {
        Self::parse(&s).unwrap_or_default()
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceStatus::Unmarked => write!(f, "Unmarked"),
            AttendanceStatus::Present => write!(f, "Present"),
            AttendanceStatus::Absent => write!(f, "Absent"),
            AttendanceStatus::Late => write!(f, "Late"),
            AttendanceStatus::Sick => write!(f, "Sick"),
            AttendanceStatus::HalfDay => write!(f, "Half Day"),
        }
    }
}

/// One child's attendance for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AttendanceRecord {
    #[serde(alias = "_id", alias = "id")]
    pub child_id: String,
    #[serde(alias = "name", default)]
    pub child_name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(alias = "parentName", default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub status: AttendanceStatus,
    #[serde(default)]
    pub time_in: Option<String>,
    #[serde(default)]
    pub time_out: Option<String>,
    #[serde(default)]
    pub nutrition_received: bool,
    #[serde(default)]
    pub health_check_done: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AttendanceRecord {
    /// Default record synthesized for a registered child with no attendance row yet.
    pub fn from_child(child: &Child) -> Self {
        Self {
            child_id: child.id.clone(),
            child_name: child.name.clone(),
            age: child.age,
            gender: child.gender.clone(),
            guardian_name: child.guardian_name.clone(),
            status: AttendanceStatus::Absent,
            time_in: None,
            time_out: None,
            nutrition_received: false,
            health_check_done: false,
            notes: None,
        }
    }

    pub fn age_str(&self) -> String {
        self.age.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string())
    }
}

/// The set of attendance records for one center on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Roster {
    #[serde(default = "today")]
    pub date: NaiveDate,
    #[serde(rename = "anganwadiCenter", alias = "center", default)]
    pub center: String,
    #[serde(rename = "children", alias = "records", default)]
    pub records: Vec<AttendanceRecord>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl Roster {
    pub fn empty(center: &str, date: NaiveDate) -> Self {
        Self {
            date,
            center: center.to_string(),
            records: Vec::new(),
        }
    }

    /// Roster derived from registration data: every child defaults to absent.
    pub fn from_children(center: &str, date: NaiveDate, children: &[Child]) -> Self {
        Self {
            date,
            center: center.to_string(),
            records: children.iter().map(AttendanceRecord::from_child).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, child_id: &str) -> Option<&AttendanceRecord> {
        self.records.iter().find(|r| r.child_id == child_id)
    }

    pub fn get_mut(&mut self, child_id: &str) -> Option<&mut AttendanceRecord> {
        self.records.iter_mut().find(|r| r.child_id == child_id)
    }

    /// Case-insensitive name search, used by list views.
    pub fn search(&self, query: &str) -> Vec<&AttendanceRecord> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.records.iter().collect();
        }
        self.records
            .iter()
            .filter(|r| r.child_name.to_lowercase().contains(&query) || r.child_id == query)
            .collect()
    }
}

/// Where a roster came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// Returned by the dedicated attendance endpoint.
    Authoritative,
    /// Synthesized from registration data found under `center_name`.
    Derived { center_name: String },
    /// Every source answered but no children are registered.
    NoChildrenRegistered,
}

impl Provenance {
    pub fn label(&self) -> String {
        match self {
            Provenance::Authoritative => "authoritative".to_string(),
            Provenance::Derived { center_name } => format!("derived ({})", center_name),
            Provenance::NoChildrenRegistered => "no children registered".to_string(),
        }
    }
}

/// Partial update for the auxiliary fields of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailsPatch {
    pub nutrition_received: Option<bool>,
    pub health_check_done: Option<bool>,
    pub notes: Option<String>,
}

impl DetailsPatch {
    pub fn is_empty(&self) -> bool {
        self.nutrition_received.is_none() && self.health_check_done.is_none() && self.notes.is_none()
    }

    pub fn apply(&self, record: &mut AttendanceRecord) {
        if let Some(n) = self.nutrition_received {
            record.nutrition_received = n;
        }
        if let Some(h) = self.health_check_done {
            record.health_check_done = h;
        }
        if let Some(ref notes) = self.notes {
            record.notes = Some(notes.clone());
        }
    }
}

/// One day of a child's attendance history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceHistoryEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub status: AttendanceStatus,
    #[serde(default)]
    pub time_in: Option<String>,
    #[serde(default)]
    pub time_out: Option<String>,
    #[serde(default)]
    pub nutrition_received: bool,
    #[serde(default)]
    pub health_check_done: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Aggregate numbers reported by the statistics endpoint for a date range.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStatistics {
    #[serde(default)]
    pub total_days: u32,
    #[serde(default)]
    pub total_records: u32,
    #[serde(default)]
    pub present: u32,
    #[serde(default)]
    pub absent: u32,
    #[serde(default)]
    pub late: u32,
    #[serde(default)]
    pub sick: u32,
    #[serde(default)]
    pub half_day: u32,
    #[serde(default)]
    pub attendance_rate: f64,
}
