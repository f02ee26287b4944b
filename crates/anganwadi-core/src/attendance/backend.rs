use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use crate::api::{ApiClient, ApiResult, BulkMarkRequest, HistoryQuery, MarkRequest, ACTIVE_STATUS};
use crate::models::{AttendanceHistoryEntry, AttendanceStatistics, Child, Roster};

/// Page size used when walking the registration list.
const CHILDREN_PAGE_LIMIT: u32 = 100;

/// Upper bound on pages fetched for one center.
const MAX_CHILDREN_PAGES: u32 = 50;

/// The REST calls the attendance workflow depends on.
#[async_trait]
pub trait AttendanceBackend: Send + Sync {
    /// `GET /attendance/today/:center`
    async fn fetch_today(&self, center: &str) -> ApiResult<Roster>;

    /// `GET /registration/children` for every page of active children at `center`.
    async fn fetch_active_children(&self, center: &str) -> ApiResult<Vec<Child>>;

    /// `POST /attendance/mark`
    async fn mark(&self, request: &MarkRequest) -> ApiResult<()>;

    /// `POST /attendance/bulk-mark`
    async fn bulk_mark(&self, request: &BulkMarkRequest) -> ApiResult<()>;

    /// `GET /attendance/history/:childId`
    async fn fetch_history(&self, child_id: &str, query: &HistoryQuery) -> ApiResult<Vec<AttendanceHistoryEntry>>;

    /// `GET /attendance/statistics/:center`
    async fn fetch_statistics(
        &self,
        center: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> ApiResult<AttendanceStatistics>;
}

#[async_trait]
impl AttendanceBackend for ApiClient {
    async fn fetch_today(&self, center: &str) -> ApiResult<Roster> {
        self.fetch_today_roster(center).await
    }

    async fn fetch_active_children(&self, center: &str) -> ApiResult<Vec<Child>> {
        let mut all = Vec::new();
        for page in 1..=MAX_CHILDREN_PAGES {
            let batch = self
                .fetch_children(center, ACTIVE_STATUS, page, CHILDREN_PAGE_LIMIT)
                .await?;
            let done = (batch.len() as u32) < CHILDREN_PAGE_LIMIT;
            all.extend(batch);
            if done {
                break;
            }
            debug!(center = %center, page = page, "Fetching next page of children");
        }
        Ok(all)
    }

    async fn mark(&self, request: &MarkRequest) -> ApiResult<()> {
        self.mark_attendance(request).await
    }

    async fn bulk_mark(&self, request: &BulkMarkRequest) -> ApiResult<()> {
        ApiClient::bulk_mark(self, request).await
    }

    async fn fetch_history(&self, child_id: &str, query: &HistoryQuery) -> ApiResult<Vec<AttendanceHistoryEntry>> {
        ApiClient::fetch_history(self, child_id, query).await
    }

    async fn fetch_statistics(
        &self,
        center: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> ApiResult<AttendanceStatistics> {
        ApiClient::fetch_statistics(self, center, start_date, end_date).await
    }
}
