//! In-memory backend used by the attendance and vaccination unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};

use crate::api::{ApiError, ApiResult, BulkMarkRequest, HistoryQuery, MarkRequest};
use crate::models::{AttendanceHistoryEntry, AttendanceRecord, AttendanceStatistics, Child, Roster};

use super::backend::AttendanceBackend;

pub fn child(id: &str, name: &str) -> Child {
    Child {
        id: id.to_string(),
        name: name.to_string(),
        age: Some(3),
        age_in_months: None,
        gender: Some("female".to_string()),
        date_of_birth: None,
        guardian_name: Some(format!("Guardian of {}", name)),
        guardian_phone: None,
        center: None,
        vaccines_given: Vec::new(),
    }
}

#[derive(Default)]
struct State {
    today: HashMap<String, Roster>,
    children: HashMap<String, Vec<Child>>,
    children_lookups: Vec<String>,
    marks: Vec<MarkRequest>,
    bulk_marks: Vec<BulkMarkRequest>,
    fail_children: bool,
    fail_marks: bool,
    fail_bulk: bool,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn set_today(&self, center: &str, roster: Roster) {
        self.state().today.insert(center.to_string(), roster);
    }

    pub fn add_children(&self, center: &str, children: Vec<Child>) {
        self.state().children.entry(center.to_string()).or_default().extend(children);
    }

    pub fn fail_children(&self, fail: bool) {
        self.state().fail_children = fail;
    }

    pub fn fail_marks(&self, fail: bool) {
        self.state().fail_marks = fail;
    }

    pub fn fail_bulk(&self, fail: bool) {
        self.state().fail_bulk = fail;
    }

    pub fn children_lookups(&self) -> Vec<String> {
        self.state().children_lookups.clone()
    }

    pub fn marks(&self) -> Vec<MarkRequest> {
        self.state().marks.clone()
    }

    pub fn bulk_marks(&self) -> Vec<BulkMarkRequest> {
        self.state().bulk_marks.clone()
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[async_trait]
impl AttendanceBackend for FakeBackend {
    async fn fetch_today(&self, center: &str) -> ApiResult<Roster> {
        self.state()
            .today
            .get(center)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("no attendance for {}", center)))
    }

    async fn fetch_active_children(&self, center: &str) -> ApiResult<Vec<Child>> {
        let mut state = self.state();
        state.children_lookups.push(center.to_string());
        if state.fail_children {
            return Err(ApiError::ServerError("registration down".to_string()));
        }
        Ok(state.children.get(center).cloned().unwrap_or_default())
    }

    async fn mark(&self, request: &MarkRequest) -> ApiResult<()> {
        let mut state = self.state();
        state.marks.push(request.clone());
        if state.fail_marks {
            return Err(ApiError::ServerError("write rejected".to_string()));
        }
        Ok(())
    }

    async fn bulk_mark(&self, request: &BulkMarkRequest) -> ApiResult<()> {
        let mut state = self.state();
        state.bulk_marks.push(request.clone());
        if state.fail_bulk {
            return Err(ApiError::ServerError("bulk rejected".to_string()));
        }

        let center = request.anganwadi_center.clone();
        let children = state.children.get(&center).cloned().unwrap_or_default();
        let roster = state
            .today
            .entry(center.clone())
            .or_insert_with(|| Roster::from_children(&center, today(), &children));
        for record in roster.records.iter_mut() {
            let selected = request
                .child_ids
                .as_ref()
                .map(|ids| ids.contains(&record.child_id))
                .unwrap_or(true);
            if selected {
                record.status = request.status;
            }
        }
        Ok(())
    }

    async fn fetch_history(&self, child_id: &str, _query: &HistoryQuery) -> ApiResult<Vec<AttendanceHistoryEntry>> {
        let state = self.state();
        let entries = state
            .today
            .values()
            .filter_map(|r| r.get(child_id).map(|rec| (r.date, rec)))
            .map(|(date, rec): (NaiveDate, &AttendanceRecord)| AttendanceHistoryEntry {
                date,
                status: rec.status,
                time_in: rec.time_in.clone(),
                time_out: rec.time_out.clone(),
                nutrition_received: rec.nutrition_received,
                health_check_done: rec.health_check_done,
                notes: rec.notes.clone(),
            })
            .collect();
        Ok(entries)
    }

    async fn fetch_statistics(
        &self,
        center: &str,
        _start_date: Option<NaiveDate>,
        _end_date: Option<NaiveDate>,
    ) -> ApiResult<AttendanceStatistics> {
        let state = self.state();
        let roster = state
            .today
            .get(center)
            .ok_or_else(|| ApiError::NotFound(center.to_string()))?;
        let summary = super::Summary::from_roster(roster);
        Ok(AttendanceStatistics {
            total_days: 1,
            total_records: summary.total,
            present: summary.present,
            absent: summary.absent,
            late: summary.late,
            sick: summary.sick,
            half_day: summary.half_day,
            attendance_rate: summary.attendance_rate as f64,
        })
    }
}
