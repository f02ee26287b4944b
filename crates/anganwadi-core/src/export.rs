//! Attendance export as CSV or as an HTML table that spreadsheet tools open
//! as `.xls`.
//!
//! Both writers render the same `ExportRow` model, so row order and derived
//! values are identical between formats.

use chrono::{NaiveDate, NaiveDateTime};

use crate::attendance::Summary;
use crate::models::{AttendanceRecord, Roster};
use crate::utils::{file_slug, format_optional, yes_no};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

pub const COLUMNS: [&str; 11] = [
    "S.No",
    "Child Name",
    "Age",
    "Gender",
    "Guardian Name",
    "Status",
    "Time In",
    "Time Out",
    "Nutrition",
    "Health Check",
    "Notes",
];

/// Rows before the first child row: report header, summary block and
/// the column header.
pub const HEADER_ROWS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    /// HTML table with an `.xls` extension
    Xls,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xls" | "excel" => Some(ExportFormat::Xls),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xls => "xls",
        }
    }

    pub fn render(&self, roster: &Roster, summary: &Summary, generated_at: NaiveDateTime) -> String {
        match self {
            ExportFormat::Csv => to_delimited(roster, summary, generated_at),
            ExportFormat::Xls => to_html_table(roster, summary, generated_at),
        }
    }
}

/// `attendance_<center>_<date>.<ext>`
pub fn file_name(center: &str, date: NaiveDate, format: ExportFormat) -> String {
    format!(
        "attendance_{}_{}.{}",
        file_slug(center),
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// One child row with every derived value already rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub cells: [String; 11],
}

impl ExportRow {
    pub fn new(index: usize, record: &AttendanceRecord) -> Self {
        Self {
            cells: [
                (index + 1).to_string(),
                record.child_name.clone(),
                record.age_str(),
                format_optional(&record.gender, "-"),
                format_optional(&record.guardian_name, "-"),
                record.status.as_str().to_uppercase(),
                format_optional(&record.time_in, "-"),
                format_optional(&record.time_out, "-"),
                yes_no(record.nutrition_received).to_string(),
                yes_no(record.health_check_done).to_string(),
                format_optional(&record.notes, ""),
            ],
        }
    }
}

pub fn rows(roster: &Roster) -> Vec<ExportRow> {
    roster
        .records
        .iter()
        .enumerate()
        .map(|(i, record)| ExportRow::new(i, record))
        .collect()
}

/// Report header and summary block as label/value pairs.
fn header_block(roster: &Roster, summary: &Summary, generated_at: NaiveDateTime) -> Vec<(String, String)> {
    vec![
        ("Report".to_string(), "Daily Attendance".to_string()),
        ("Anganwadi Center".to_string(), roster.center.clone()),
        ("Date".to_string(), roster.date.format("%Y-%m-%d").to_string()),
        ("Generated".to_string(), generated_at.format(TIMESTAMP_FORMAT).to_string()),
        ("Total Children".to_string(), summary.total.to_string()),
        ("Present".to_string(), summary.present.to_string()),
        ("Absent".to_string(), summary.absent.to_string()),
        ("Late".to_string(), summary.late.to_string()),
        ("Sick".to_string(), summary.sick.to_string()),
        ("Half Day".to_string(), summary.half_day.to_string()),
        ("Unmarked".to_string(), summary.unmarked.to_string()),
        ("Attendance Rate".to_string(), summary.rate_display()),
        ("Nutrition Provided".to_string(), summary.nutrition_count.to_string()),
        ("Health Checks".to_string(), summary.health_check_count.to_string()),
    ]
}

// ============================================================================
// CSV
// ============================================================================

/// Quote a field unconditionally, doubling embedded quotes.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn csv_line<S: AsRef<str>>(fields: &[S]) -> String {
    fields.iter().map(|f| quote(f.as_ref())).collect::<Vec<_>>().join(",")
}

/// Quoted, comma-delimited export. Lines end with CRLF.
pub fn to_delimited(roster: &Roster, summary: &Summary, generated_at: NaiveDateTime) -> String {
    let mut lines: Vec<String> = header_block(roster, summary, generated_at)
        .into_iter()
        .map(|(label, value)| csv_line(&[label, value]))
        .collect();
    lines.push(csv_line(&COLUMNS));
    lines.extend(rows(roster).iter().map(|row| csv_line(&row.cells)));

    let mut out = lines.join("\r\n");
    out.push_str("\r\n");
    out
}

// ============================================================================
// HTML table (.xls)
// ============================================================================

fn cell(tag: &str, value: &str) -> String {
    format!("<{tag}>{}</{tag}>", html_escape::encode_text(value))
}

pub fn to_html_table(roster: &Roster, summary: &Summary, generated_at: NaiveDateTime) -> String {
    let mut html = String::new();
    html.push_str("<html xmlns:o=\"urn:schemas-microsoft-com:office:office\" ");
    html.push_str("xmlns:x=\"urn:schemas-microsoft-com:office:excel\">\n");
    html.push_str("<head><meta charset=\"UTF-8\"></head>\n<body>\n<table border=\"1\">\n");

    for (label, value) in header_block(roster, summary, generated_at) {
        html.push_str(&format!("<tr>{}{}</tr>\n", cell("th", &label), cell("td", &value)));
    }

    html.push_str("<tr>");
    for column in COLUMNS {
        html.push_str(&cell("th", column));
    }
    html.push_str("</tr>\n");

    for row in rows(roster) {
        html.push_str("<tr>");
        for value in &row.cells {
            html.push_str(&cell("td", value));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}
