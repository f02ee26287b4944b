use async_trait::async_trait;

use crate::api::{ApiClient, ApiResult};
use crate::models::{AdministeredVaccine, Child, NewVaccination};

/// The health-service calls the vaccination workflow depends on.
#[async_trait]
pub trait VaccinationBackend: Send + Sync {
    /// `GET /health/children`
    async fn fetch_health_children(&self, center: Option<&str>) -> ApiResult<Vec<Child>>;

    /// `GET /health/children/:id/vaccinations`
    async fn fetch_child_vaccinations(&self, child_id: &str) -> ApiResult<Vec<AdministeredVaccine>>;

    /// `POST /health/vaccinations`
    async fn record_vaccination(&self, vaccination: &NewVaccination) -> ApiResult<()>;
}

#[async_trait]
impl VaccinationBackend for ApiClient {
    async fn fetch_health_children(&self, center: Option<&str>) -> ApiResult<Vec<Child>> {
        ApiClient::fetch_health_children(self, center).await
    }

    async fn fetch_child_vaccinations(&self, child_id: &str) -> ApiResult<Vec<AdministeredVaccine>> {
        ApiClient::fetch_child_vaccinations(self, child_id).await
    }

    async fn record_vaccination(&self, vaccination: &NewVaccination) -> ApiResult<()> {
        ApiClient::record_vaccination(self, vaccination).await
    }
}
