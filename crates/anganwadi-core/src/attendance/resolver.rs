//! Roster resolution over an ordered chain of data sources.
//!
//! The dedicated attendance endpoint is tried first. When it fails or has
//! nothing for today, the registration list for the center is turned into a
//! default roster, first under the requested center name and then under each
//! configured alternate spelling. The first source with usable data wins.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::api::{ApiError, HistoryQuery};
use crate::models::{AttendanceHistoryEntry, AttendanceStatistics, Provenance, Roster};

use super::backend::AttendanceBackend;
use super::error::AttendanceError;
use super::view::AttendanceView;

/// A roster together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRoster {
    pub roster: Roster,
    pub provenance: Provenance,
}

impl ResolvedRoster {
    pub fn is_no_children_registered(&self) -> bool {
        self.provenance == Provenance::NoChildrenRegistered
    }
}

/// One step of the fallback chain.
///
/// `Ok(None)` means the source answered but had nothing usable; `Err` means
/// it could not be reached or refused the request.
#[async_trait]
pub trait RosterSource: Send + Sync {
    fn name(&self) -> String;

    async fn try_fetch(&self, center: &str, date: NaiveDate) -> Result<Option<ResolvedRoster>, ApiError>;
}

/// `GET /attendance/today/:center`
pub struct AttendanceEndpoint {
    backend: Arc<dyn AttendanceBackend>,
}

impl AttendanceEndpoint {
    pub fn new(backend: Arc<dyn AttendanceBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl RosterSource for AttendanceEndpoint {
    fn name(&self) -> String {
        "attendance endpoint".to_string()
    }

    async fn try_fetch(&self, center: &str, _date: NaiveDate) -> Result<Option<ResolvedRoster>, ApiError> {
        let roster = self.backend.fetch_today(center).await?;
        if roster.is_empty() {
            return Ok(None);
        }
        Ok(Some(ResolvedRoster {
            roster,
            provenance: Provenance::Authoritative,
        }))
    }
}

/// Registration list for a center, every child defaulted to absent.
///
/// `lookup_name` overrides the name sent upstream; the roster keeps the
/// requested center name either way.
pub struct RegistrationLookup {
    backend: Arc<dyn AttendanceBackend>,
    lookup_name: Option<String>,
}

impl RegistrationLookup {
    pub fn new(backend: Arc<dyn AttendanceBackend>) -> Self {
        Self {
            backend,
            lookup_name: None,
        }
    }

    pub fn alias(backend: Arc<dyn AttendanceBackend>, name: impl Into<String>) -> Self {
        Self {
            backend,
            lookup_name: Some(name.into()),
        }
    }
}

#[async_trait]
impl RosterSource for RegistrationLookup {
    fn name(&self) -> String {
        match self.lookup_name {
            Some(ref name) => format!("registration ({})", name),
            None => "registration".to_string(),
        }
    }

    async fn try_fetch(&self, center: &str, date: NaiveDate) -> Result<Option<ResolvedRoster>, ApiError> {
        let lookup = self.lookup_name.as_deref().unwrap_or(center);
        let children = self.backend.fetch_active_children(lookup).await?;
        if children.is_empty() {
            return Ok(None);
        }
        Ok(Some(ResolvedRoster {
            roster: Roster::from_children(center, date, &children),
            provenance: Provenance::Derived {
                center_name: lookup.to_string(),
            },
        }))
    }
}

/// Produces today's roster for a center by walking the source chain.
#[derive(Clone)]
pub struct AttendanceResolver {
    backend: Arc<dyn AttendanceBackend>,
    aliases: Vec<String>,
}

impl AttendanceResolver {
    /// `aliases` are alternate spellings of center names tried after the
    /// requested name yields no children.
    pub fn new(backend: Arc<dyn AttendanceBackend>, aliases: Vec<String>) -> Self {
        Self { backend, aliases }
    }

    pub fn backend(&self) -> &Arc<dyn AttendanceBackend> {
        &self.backend
    }

    /// The ordered chain for `center`. Aliases identical to `center` are skipped.
    pub fn sources_for(&self, center: &str) -> Vec<Box<dyn RosterSource>> {
        let mut sources: Vec<Box<dyn RosterSource>> = vec![
            Box::new(AttendanceEndpoint::new(Arc::clone(&self.backend))),
            Box::new(RegistrationLookup::new(Arc::clone(&self.backend))),
        ];
        for alias in &self.aliases {
            if alias.trim().is_empty() || alias == center {
                continue;
            }
            sources.push(Box::new(RegistrationLookup::alias(Arc::clone(&self.backend), alias.clone())));
        }
        sources
    }

    pub async fn resolve_roster(&self, center: &str) -> Result<ResolvedRoster, AttendanceError> {
        self.resolve_roster_on(center, Local::now().date_naive()).await
    }

    pub async fn resolve_roster_on(&self, center: &str, date: NaiveDate) -> Result<ResolvedRoster, AttendanceError> {
        resolve_with(&self.sources_for(center), center, date).await
    }

    /// Resolve and hand the result to `view`, unless a newer reload has
    /// started in the meantime. Returns whether the result was applied.
    pub async fn reload(&self, view: &mut AttendanceView) -> Result<bool, AttendanceError> {
        let ticket = view.begin_fetch();
        let resolved = self.resolve_roster(&ticket.center).await?;
        Ok(view.apply_fetch(&ticket, resolved))
    }

    pub async fn history(
        &self,
        child_id: &str,
        query: &HistoryQuery,
    ) -> Result<Vec<AttendanceHistoryEntry>, AttendanceError> {
        Ok(self.backend.fetch_history(child_id, query).await?)
    }

    pub async fn statistics(
        &self,
        center: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<AttendanceStatistics, AttendanceError> {
        Ok(self.backend.fetch_statistics(center, start_date, end_date).await?)
    }
}

/// Try each source in order and return the first usable roster.
///
/// When at least one source answered but none had data the result is an
/// empty roster flagged `NoChildrenRegistered`. When no source answered at
/// all the result is `DataUnavailable`.
pub async fn resolve_with(
    sources: &[Box<dyn RosterSource>],
    center: &str,
    date: NaiveDate,
) -> Result<ResolvedRoster, AttendanceError> {
    let mut answered = false;
    let mut last_error = None;

    for source in sources {
        match source.try_fetch(center, date).await {
            Ok(Some(resolved)) => {
                info!(
                    center = %center,
                    source = %source.name(),
                    count = resolved.roster.len(),
                    provenance = %resolved.provenance.label(),
                    "Roster resolved"
                );
                return Ok(resolved);
            }
            Ok(None) => {
                debug!(center = %center, source = %source.name(), "Source returned no children");
                answered = true;
            }
            Err(e) => {
                debug!(center = %center, source = %source.name(), error = %e, "Source failed, falling back");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(last_error) if !answered => {
            warn!(center = %center, attempts = sources.len(), "All roster sources failed");
            Err(AttendanceError::DataUnavailable {
                center: center.to_string(),
                attempts: sources.len(),
                last_error,
            })
        }
        _ => {
            info!(center = %center, "No children registered");
            Ok(ResolvedRoster {
                roster: Roster::empty(center, date),
                provenance: Provenance::NoChildrenRegistered,
            })
        }
    }
}
