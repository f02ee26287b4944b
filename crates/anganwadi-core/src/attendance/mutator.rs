//! Attendance writes with optimistic local updates.
//!
//! A single mark is applied to the view first, then persisted. On failure the
//! record goes back to `unmarked` (not to its previous status). Bulk marks are
//! not applied optimistically; the roster is re-resolved after the server
//! accepts them.

use std::sync::Arc;

use chrono::{Local, NaiveTime};
use tracing::{debug, info, warn};

use crate::api::{ApiResult, BulkMarkRequest, MarkRequest};
use crate::models::{AttendanceStatus, DetailsPatch};

use super::backend::AttendanceBackend;
use super::command::MarkAttendanceCommand;
use super::error::AttendanceError;
use super::resolver::AttendanceResolver;
use super::view::{AttendanceView, MutationToken};

/// A single mark already applied to the view and waiting for the server.
#[derive(Debug, Clone)]
pub struct PendingMark {
    token: MutationToken,
    request: MarkRequest,
}

impl PendingMark {
    pub fn child_id(&self) -> &str {
        &self.token.child_id
    }

    pub fn request(&self) -> &MarkRequest {
        &self.request
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// Server accepted the write; the optimistic state stands.
    Confirmed,
    /// A newer write or refresh replaced this one before it completed.
    Superseded,
}

#[derive(Clone)]
pub struct AttendanceMutator {
    backend: Arc<dyn AttendanceBackend>,
    resolver: AttendanceResolver,
}

impl AttendanceMutator {
    pub fn new(resolver: AttendanceResolver) -> Self {
        Self {
            backend: Arc::clone(resolver.backend()),
            resolver,
        }
    }

    // ===== Single mark, in phases =====

    /// Apply the status locally and return the write to persist.
    pub fn begin_mark(
        &self,
        view: &mut AttendanceView,
        child_id: &str,
        status: AttendanceStatus,
        at: NaiveTime,
    ) -> Result<PendingMark, AttendanceError> {
        let command = MarkAttendanceCommand::new(child_id, status, at);
        let next = command.apply(view.roster())?;
        let request = next
            .get(child_id)
            .map(|record| MarkRequest::from_record(view.center(), record))
            .ok_or_else(|| AttendanceError::UnknownChild(child_id.to_string()))?;

        view.replace_roster(next);
        let token = view.issue_token(child_id);
        debug!(child_id = %child_id, status = %status.as_str(), "Optimistic mark applied");
        Ok(PendingMark { token, request })
    }

    /// Send a pending mark. Does not touch the view, so it can run while the
    /// view keeps serving other events.
    pub async fn persist(&self, pending: &PendingMark) -> ApiResult<()> {
        self.backend.mark(&pending.request).await
    }

    /// Settle a pending mark against the server's answer.
    pub fn complete_mark(
        &self,
        view: &mut AttendanceView,
        pending: PendingMark,
        result: ApiResult<()>,
    ) -> Result<MarkOutcome, AttendanceError> {
        let current = view.is_current(&pending.token);
        match result {
            Ok(()) if current => Ok(MarkOutcome::Confirmed),
            Ok(()) => {
                debug!(child_id = %pending.child_id(), "Mark confirmed after being superseded");
                Ok(MarkOutcome::Superseded)
            }
            Err(e) => {
                if current {
                    let rolled_back = view
                        .record(pending.child_id())
                        .map(|record| MarkAttendanceCommand::rollback(pending.child_id()).apply_to_record(record));
                    if let Some(record) = rolled_back {
                        view.replace_record(&pending.token, record);
                    }
                    warn!(child_id = %pending.child_id(), error = %e, "Mark failed, record reset to unmarked");
                } else {
                    warn!(child_id = %pending.child_id(), error = %e, "Superseded mark failed, state left as is");
                }
                Err(AttendanceError::MutationFailed {
                    subject: pending.token.child_id,
                    source: e,
                })
            }
        }
    }

    // ===== Convenience entry points =====

    pub async fn mark_one(
        &self,
        view: &mut AttendanceView,
        child_id: &str,
        status: AttendanceStatus,
    ) -> Result<MarkOutcome, AttendanceError> {
        self.mark_one_at(view, child_id, status, Local::now().time()).await
    }

    pub async fn mark_one_at(
        &self,
        view: &mut AttendanceView,
        child_id: &str,
        status: AttendanceStatus,
        at: NaiveTime,
    ) -> Result<MarkOutcome, AttendanceError> {
        let pending = self.begin_mark(view, child_id, status, at)?;
        let result = self.persist(&pending).await;
        self.complete_mark(view, pending, result)
    }

    /// Apply one status to the whole roster, or to `child_ids`, in a single
    /// call, then re-resolve the roster from the server.
    ///
    /// Returns whether the refreshed roster was applied to the view.
    pub async fn mark_bulk(
        &self,
        view: &mut AttendanceView,
        status: AttendanceStatus,
        child_ids: Option<Vec<String>>,
    ) -> Result<bool, AttendanceError> {
        let center = view.center().to_string();
        let request = BulkMarkRequest {
            anganwadi_center: center.clone(),
            status,
            child_ids,
        };
        self.backend
            .bulk_mark(&request)
            .await
            .map_err(|e| AttendanceError::MutationFailed {
                subject: center.clone(),
                source: e,
            })?;

        info!(
            center = %center,
            status = %status.as_str(),
            count = request.child_ids.as_ref().map(|ids| ids.len()).unwrap_or(view.roster().len()),
            "Bulk mark accepted, refreshing roster"
        );
        // In-flight single marks for these children must not land on top of
        // the refreshed roster. A rejected bulk call leaves them current so
        // their own failures still roll back.
        view.invalidate(request.child_ids.as_deref());
        self.resolver.reload(view).await
    }

    /// Update nutrition/health-check flags or notes without touching status
    /// or times. Only allowed for present or late children.
    pub async fn patch_details(
        &self,
        view: &mut AttendanceView,
        child_id: &str,
        patch: DetailsPatch,
    ) -> Result<(), AttendanceError> {
        let previous = view
            .record(child_id)
            .cloned()
            .ok_or_else(|| AttendanceError::UnknownChild(child_id.to_string()))?;

        if !previous.status.allows_details() {
            return Err(AttendanceError::InvalidTransition {
                child_id: child_id.to_string(),
                status: previous.status,
            });
        }
        if patch.is_empty() {
            return Ok(());
        }

        let mut patched = previous.clone();
        patch.apply(&mut patched);
        let request = MarkRequest::from_record(view.center(), &patched);

        let token = view.issue_token(child_id);
        view.replace_record(&token, patched);

        match self.backend.mark(&request).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if view.replace_record(&token, previous) {
                    warn!(child_id = %child_id, error = %e, "Details update failed, restored previous values");
                }
                Err(AttendanceError::MutationFailed {
                    subject: child_id.to_string(),
                    source: e,
                })
            }
        }
    }
}
