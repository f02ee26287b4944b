//! Vaccination due-list loading and scheduling.
//!
//! The scheduler is pure date arithmetic over a child's date of birth and
//! administered doses. `VaccinationService` gathers those inputs from the
//! health service and records new doses.

mod backend;
mod scheduler;

pub use backend::VaccinationBackend;
pub use scheduler::{dose_status, VaccinationCounts, VaccinationScheduler, OVERDUE_GRACE_DAYS};

use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::ApiResult;
use crate::models::{find_dose, Child, NewVaccination, VaccinationEntry};

/// Maximum concurrent per-child vaccination lookups.
const MAX_CONCURRENT_REQUESTS: usize = 5;

/// A computed due list plus its badge counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DueList {
    pub entries: Vec<VaccinationEntry>,
    pub counts: VaccinationCounts,
}

#[derive(Clone)]
pub struct VaccinationService {
    backend: Arc<dyn VaccinationBackend>,
}

impl VaccinationService {
    pub fn new(backend: Arc<dyn VaccinationBackend>) -> Self {
        Self { backend }
    }

    /// Fetch children from the health service and fill in administered
    /// doses for any child whose listing came without them.
    ///
    /// A failed per-child lookup leaves that child's list as fetched.
    pub async fn load_children(&self, center: Option<&str>) -> ApiResult<Vec<Child>> {
        let mut children = self.backend.fetch_health_children(center).await?;
        debug!(count = children.len(), "Health children fetched");

        let missing: Vec<(usize, String)> = children
            .iter()
            .enumerate()
            .filter(|(_, c)| c.vaccines_given.is_empty())
            .map(|(i, c)| (i, c.id.clone()))
            .collect();

        let backend = &self.backend;
        let results: Vec<(usize, String, ApiResult<_>)> = stream::iter(missing)
            .map(|(index, id)| async move {
                let result = backend.fetch_child_vaccinations(&id).await;
                (index, id, result)
            })
            .buffer_unordered(MAX_CONCURRENT_REQUESTS)
            .collect()
            .await;

        for (index, id, result) in results {
            match result {
                Ok(doses) => {
                    children[index].vaccines_given = doses.into_iter().map(|d| d.vaccine_name).collect();
                }
                Err(e) => warn!(child_id = %id, error = %e, "Vaccination lookup failed"),
            }
        }
        Ok(children)
    }

    /// Load children and compute their outstanding doses.
    pub async fn due_list(&self, center: Option<&str>, scheduler: &VaccinationScheduler) -> ApiResult<DueList> {
        let children = self.load_children(center).await?;
        let entries = scheduler.schedule(&children);
        let counts = VaccinationCounts::from_entries(&entries);
        info!(
            children = children.len(),
            due = counts.due,
            overdue = counts.overdue,
            "Vaccination due list computed"
        );
        Ok(DueList { entries, counts })
    }

    /// Record a dose as administered on `date_given`.
    pub async fn record(
        &self,
        child_id: &str,
        vaccine_name: &str,
        date_given: NaiveDate,
        notes: Option<String>,
    ) -> ApiResult<()> {
        if find_dose(vaccine_name).is_none() {
            // Stored as given, but it will never match a calendar dose
            warn!(vaccine = %vaccine_name, "Vaccine name is not in the calendar");
        }
        let vaccination = NewVaccination {
            child_id: child_id.to_string(),
            vaccine_name: vaccine_name.to_string(),
            date_given,
            notes,
        };
        self.backend.record_vaccination(&vaccination).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::models::{AdministeredVaccine, VaccinationStatus, VACCINE_CALENDAR};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeHealth {
        children: Vec<Child>,
        doses: HashMap<String, Vec<&'static str>>,
        failing: Vec<String>,
        lookups: Mutex<Vec<String>>,
        recorded: Mutex<Vec<NewVaccination>>,
    }

    #[async_trait]
    impl VaccinationBackend for FakeHealth {
        async fn fetch_health_children(&self, _center: Option<&str>) -> ApiResult<Vec<Child>> {
            Ok(self.children.clone())
        }

        async fn fetch_child_vaccinations(&self, child_id: &str) -> ApiResult<Vec<AdministeredVaccine>> {
            self.lookups.lock().unwrap().push(child_id.to_string());
            if self.failing.iter().any(|id| id == child_id) {
                return Err(ApiError::ServerError("health down".to_string()));
            }
            Ok(self
                .doses
                .get(child_id)
                .map(|names| {
                    names
                        .iter()
                        .map(|n| AdministeredVaccine {
                            vaccine_name: n.to_string(),
                            date_given: None,
                            notes: None,
                        })
                        .collect()
                })
                .unwrap_or_default())
        }

        async fn record_vaccination(&self, vaccination: &NewVaccination) -> ApiResult<()> {
            self.recorded.lock().unwrap().push(vaccination.clone());
            Ok(())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn child(id: &str, dob: NaiveDate, given: &[&str]) -> Child {
        let mut c = crate::attendance::testing::child(id, id);
        c.date_of_birth = Some(dob);
        c.vaccines_given = given.iter().map(|s| s.to_string()).collect();
        c
    }

    #[tokio::test]
    async fn test_load_children_fills_missing_doses() {
        let backend = Arc::new(FakeHealth {
            children: vec![
                child("listed", date(2026, 1, 18), &["BCG"]),
                child("bare", date(2026, 1, 18), &[]),
            ],
            doses: HashMap::from([("bare".to_string(), vec!["BCG", "OPV 1"])]),
            ..Default::default()
        });
        let service = VaccinationService::new(backend.clone());

        let children = service.load_children(Some("C")).await.unwrap();
        assert_eq!(children[0].vaccines_given, vec!["BCG"]);
        assert_eq!(children[1].vaccines_given, vec!["BCG", "OPV 1"]);
        assert_eq!(*backend.lookups.lock().unwrap(), vec!["bare".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_lookup_keeps_child() {
        let backend = Arc::new(FakeHealth {
            children: vec![child("a", date(2026, 1, 18), &[])],
            failing: vec!["a".to_string()],
            ..Default::default()
        });
        let service = VaccinationService::new(backend);

        let list = service
            .due_list(None, &VaccinationScheduler::new(date(2026, 10, 18)))
            .await
            .unwrap();
        assert_eq!(list.entries.len(), VACCINE_CALENDAR.len());
        assert_eq!(list.counts.due, 1);
    }

    #[tokio::test]
    async fn test_due_list_is_sorted_and_counted() {
        let backend = Arc::new(FakeHealth {
            children: vec![
                child("young", date(2026, 9, 1), &["BCG", "Hepatitis B Birth"]),
                child("old", date(2025, 3, 1), &["BCG"]),
            ],
            ..Default::default()
        });
        let service = VaccinationService::new(backend);

        let list = service
            .due_list(Some("C"), &VaccinationScheduler::new(date(2026, 10, 18)))
            .await
            .unwrap();
        assert!(list.entries.windows(2).all(|w| w[0].due_date <= w[1].due_date));
        assert_eq!(list.entries[0].child_id, "old");
        // Six weeks old: first doses just fell due, nothing overdue yet
        let young: Vec<_> = list.entries.iter().filter(|e| e.child_id == "young").collect();
        assert!(young.iter().all(|e| e.status != VaccinationStatus::Overdue));
        assert_eq!(young.iter().filter(|e| e.status == VaccinationStatus::Due).count(), 3);
        let total = list.counts.scheduled + list.counts.due + list.counts.overdue;
        assert_eq!(total as usize, list.entries.len());
    }

    #[tokio::test]
    async fn test_record_forwards_dose() {
        let backend = Arc::new(FakeHealth::default());
        let service = VaccinationService::new(backend.clone());

        service
            .record("a", "MMR 1", date(2026, 10, 18), Some("left arm".to_string()))
            .await
            .unwrap();
        let recorded = backend.recorded.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].vaccine_name, "MMR 1");
        assert_eq!(recorded[0].date_given, date(2026, 10, 18));
    }
}
