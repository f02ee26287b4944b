//! API client for communicating with the anganwadi REST backend.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests for attendance, registration, and health data.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{header, Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{
    AdministeredVaccine, AttendanceHistoryEntry, AttendanceRecord, AttendanceStatistics,
    AttendanceStatus, Child, NewVaccination, Roster,
};

use super::error::{ApiError, ApiResult};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Registration status filter used when deriving a roster from children.
pub const ACTIVE_STATUS: &str = "active";

// ============================================================================
// Request bodies
// ============================================================================

/// Body of `POST /attendance/mark`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    pub child_id: String,
    pub child_name: String,
    pub anganwadi_center: String,
    pub status: AttendanceStatus,
    pub time_in: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_out: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition_received: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_done: Option<bool>,
}

impl MarkRequest {
    /// Full-record persistence body for `record` at `center`.
    pub fn from_record(center: &str, record: &AttendanceRecord) -> Self {
        Self {
            child_id: record.child_id.clone(),
            child_name: record.child_name.clone(),
            anganwadi_center: center.to_string(),
            status: record.status,
            time_in: record.time_in.clone(),
            time_out: record.time_out.clone(),
            notes: record.notes.clone(),
            nutrition_received: Some(record.nutrition_received),
            health_check_done: Some(record.health_check_done),
        }
    }
}

/// Body of `POST /attendance/bulk-mark`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMarkRequest {
    pub anganwadi_center: String,
    pub status: AttendanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_ids: Option<Vec<String>>,
}

/// Optional filters for `GET /attendance/history/:childId`.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<u32>,
}

/// API client for the anganwadi backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url` (e.g. `https://host/api`)
    pub fn new(base_url: &str) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidResponse(format!("Invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidResponse(format!("Not a base URL: {}", base_url)));
        }

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from path segments. Segments are percent-encoded,
    /// so free-text center names are safe to pass through.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidResponse(format!("Not a base URL: {}", self.base_url)))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn auth_headers(&self) -> ApiResult<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidResponse(format!("Invalid token: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: reqwest::Response) -> ApiResult<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send_with_retry<T, F>(&self, url: &Url, build: F) -> ApiResult<T>
    where
        T: DeserializeOwned,
        F: Fn() -> ApiResult<reqwest::RequestBuilder>,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build()?.send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    let text = response.text().await?;
                    return serde_json::from_str(&text).map_err(|e| {
                        ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
                    });
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &Url) -> ApiResult<T> {
        debug!(url = %url, "GET");
        self.send_with_retry(url, || Ok(self.client.get(url.clone()).headers(self.auth_headers()?)))
            .await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, url: &Url, body: &B) -> ApiResult<T> {
        debug!(url = %url, "POST");
        self.send_with_retry(url, || {
            Ok(self.client.post(url.clone()).headers(self.auth_headers()?).json(body))
        })
        .await
    }

    // ===== Attendance =====

    /// Fetch today's roster from the dedicated attendance endpoint
    pub async fn fetch_today_roster(&self, center: &str) -> ApiResult<Roster> {
        let url = self.endpoint(&["attendance", "today", center])?;
        let envelope: Envelope<Roster> = self.get(&url).await?;
        let mut roster = envelope.into_data()?;
        if roster.center.is_empty() {
            roster.center = center.to_string();
        }
        Ok(roster)
    }

    /// Persist a single child's attendance record
    pub async fn mark_attendance(&self, request: &MarkRequest) -> ApiResult<()> {
        let url = self.endpoint(&["attendance", "mark"])?;
        let envelope: Envelope<serde_json::Value> = self.post(&url, request).await?;
        envelope.check()
    }

    /// Apply one status to many children in a single call
    pub async fn bulk_mark(&self, request: &BulkMarkRequest) -> ApiResult<()> {
        let url = self.endpoint(&["attendance", "bulk-mark"])?;
        let envelope: Envelope<serde_json::Value> = self.post(&url, request).await?;
        envelope.check()
    }

    /// Fetch a child's attendance history
    pub async fn fetch_history(&self, child_id: &str, query: &HistoryQuery) -> ApiResult<Vec<AttendanceHistoryEntry>> {
        let mut url = self.endpoint(&["attendance", "history", child_id])?;
        let mut pairs = date_range_pairs(query.start_date, query.end_date);
        if let Some(limit) = query.limit {
            pairs.push(("limit", limit.to_string()));
        }
        append_query(&mut url, &pairs);
        let envelope: Envelope<HistoryData> = self.get(&url).await?;
        Ok(envelope.into_data()?.into_entries())
    }

    /// Fetch aggregate attendance statistics for a center over a date range
    pub async fn fetch_statistics(
        &self,
        center: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> ApiResult<AttendanceStatistics> {
        let mut url = self.endpoint(&["attendance", "statistics", center])?;
        append_query(&mut url, &date_range_pairs(start_date, end_date));
        let envelope: Envelope<AttendanceStatistics> = self.get(&url).await?;
        envelope.into_data()
    }

    // ===== Registration =====

    /// Fetch registered children for a center, filtered by registration status
    pub async fn fetch_children(
        &self,
        center: &str,
        status: &str,
        page: u32,
        limit: u32,
    ) -> ApiResult<Vec<Child>> {
        let mut url = self.endpoint(&["registration", "children"])?;
        url.query_pairs_mut()
            .append_pair("anganwadiCenter", center)
            .append_pair("status", status)
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());

        let envelope: Envelope<ChildrenData> = self.get(&url).await?;
        let children = envelope.into_data()?.into_children();
        debug!(center = %center, count = children.len(), "Registration children fetched");
        Ok(children)
    }

    // ===== Health =====

    /// Fetch children known to the health service, with vaccination lists
    pub async fn fetch_health_children(&self, center: Option<&str>) -> ApiResult<Vec<Child>> {
        let mut url = self.endpoint(&["health", "children"])?;
        if let Some(center) = center {
            url.query_pairs_mut().append_pair("anganwadiCenter", center);
        }
        let envelope: Envelope<ChildrenData> = self.get(&url).await?;
        Ok(envelope.into_data()?.into_children())
    }

    /// Fetch the doses already administered to a child
    pub async fn fetch_child_vaccinations(&self, child_id: &str) -> ApiResult<Vec<AdministeredVaccine>> {
        let url = self.endpoint(&["health", "children", child_id, "vaccinations"])?;
        let envelope: Envelope<VaccinationsData> = self.get(&url).await?;
        Ok(envelope.into_data()?.into_vaccines())
    }

    /// Record a newly administered dose
    pub async fn record_vaccination(&self, vaccination: &NewVaccination) -> ApiResult<()> {
        let url = self.endpoint(&["health", "vaccinations"])?;
        let envelope: Envelope<serde_json::Value> = self.post(&url, vaccination).await?;
        envelope.check()
    }
}

/// Optional `startDate`/`endDate` filters as query pairs.
fn date_range_pairs(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(start) = start {
        pairs.push(("startDate", start.to_string()));
    }
    if let Some(end) = end {
        pairs.push(("endDate", end.to_string()));
    }
    pairs
}

/// Append `pairs` to `url`. An empty list leaves the URL without a `?`.
fn append_query(url: &mut Url, pairs: &[(&str, String)]) {
    if pairs.is_empty() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (key, value) in pairs {
        query.append_pair(key, value);
    }
}

// ============================================================================
// Internal API response types
// ============================================================================

/// Standard `{ success, data, message }` wrapper returned by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: Option<bool>,
    data: Option<T>,
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn check(&self) -> ApiResult<()> {
        if self.success == Some(false) {
            return Err(ApiError::Rejected(
                self.message.clone().unwrap_or_else(|| "unspecified".to_string()),
            ));
        }
        Ok(())
    }

    fn into_data(self) -> ApiResult<T> {
        self.check()?;
        self.data
            .ok_or_else(|| ApiError::InvalidResponse("Response has no data field".to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChildrenData {
    List(Vec<Child>),
    Paged {
        #[serde(default)]
        children: Vec<Child>,
    },
}

impl ChildrenData {
    fn into_children(self) -> Vec<Child> {
        match self {
            ChildrenData::List(children) => children,
            ChildrenData::Paged { children } => children,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoryData {
    List(Vec<AttendanceHistoryEntry>),
    Wrapped {
        #[serde(alias = "history", default)]
        records: Vec<AttendanceHistoryEntry>,
    },
}

impl HistoryData {
    fn into_entries(self) -> Vec<AttendanceHistoryEntry> {
        match self {
            HistoryData::List(entries) => entries,
            HistoryData::Wrapped { records } => records,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VaccinationsData {
    List(Vec<AdministeredVaccine>),
    Wrapped {
        #[serde(default)]
        vaccinations: Vec<AdministeredVaccine>,
    },
}

impl VaccinationsData {
    fn into_vaccines(self) -> Vec<AdministeredVaccine> {
        match self {
            VaccinationsData::List(v) => v,
            VaccinationsData::Wrapped { vaccinations } => vaccinations,
        }
    }
}
