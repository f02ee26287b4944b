//! View-owned attendance state.
//!
//! The view holds the current roster snapshot and its summary, and decides
//! whether late-arriving results still apply:
//! - every roster fetch gets a monotonic id; only the newest fetch is applied
//! - every single-child write gets a token; a newer write for the same child,
//!   a bulk mark touching the child, or an applied fetch makes it stale

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{AttendanceRecord, Provenance, Roster};

use super::resolver::ResolvedRoster;
use super::summary::Summary;

/// Issued by `begin_fetch`, handed back with the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub id: u64,
    pub center: String,
}

/// Identifies one in-flight write for one child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationToken {
    pub child_id: String,
    seq: u64,
    epoch: u64,
}

#[derive(Debug, Clone)]
pub struct AttendanceView {
    center: String,
    roster: Roster,
    summary: Summary,
    provenance: Option<Provenance>,
    last_fetch_id: u64,
    /// Bumped whenever a fetched roster replaces the snapshot.
    epoch: u64,
    next_seq: u64,
    child_seqs: HashMap<String, u64>,
}

impl AttendanceView {
    pub fn new(center: impl Into<String>, date: NaiveDate) -> Self {
        let center = center.into();
        Self {
            roster: Roster::empty(&center, date),
            center,
            summary: Summary::default(),
            provenance: None,
            last_fetch_id: 0,
            epoch: 0,
            next_seq: 0,
            child_seqs: HashMap::new(),
        }
    }

    pub fn center(&self) -> &str {
        &self.center
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    pub fn record(&self, child_id: &str) -> Option<&AttendanceRecord> {
        self.roster.get(child_id)
    }

    /// True once a fetch has resolved with zero registered children.
    pub fn no_children_registered(&self) -> bool {
        self.provenance == Some(Provenance::NoChildrenRegistered)
    }

    // ===== Fetches =====

    /// Start a roster fetch. Any fetch started earlier becomes stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.last_fetch_id += 1;
        FetchTicket {
            id: self.last_fetch_id,
            center: self.center.clone(),
        }
    }

    /// Apply a fetch result unless a newer fetch has been started.
    pub fn apply_fetch(&mut self, ticket: &FetchTicket, resolved: ResolvedRoster) -> bool {
        if ticket.id != self.last_fetch_id || ticket.center != self.center {
            warn!(
                fetch_id = ticket.id,
                latest = self.last_fetch_id,
                center = %ticket.center,
                "Discarding stale roster fetch"
            );
            return false;
        }
        self.epoch += 1;
        self.provenance = Some(resolved.provenance);
        self.replace_roster(resolved.roster);
        true
    }

    /// Point the view at another center. In-flight fetches for the old
    /// center are discarded on arrival.
    pub fn switch_center(&mut self, center: impl Into<String>, date: NaiveDate) {
        let center = center.into();
        self.last_fetch_id += 1;
        self.epoch += 1;
        self.roster = Roster::empty(&center, date);
        self.center = center;
        self.provenance = None;
        self.child_seqs.clear();
        self.summary = Summary::default();
    }

    // ===== Writes =====

    /// Issue a token for a new write to `child_id`, superseding older ones.
    pub fn issue_token(&mut self, child_id: &str) -> MutationToken {
        self.next_seq += 1;
        self.child_seqs.insert(child_id.to_string(), self.next_seq);
        MutationToken {
            child_id: child_id.to_string(),
            seq: self.next_seq,
            epoch: self.epoch,
        }
    }

    /// Make every outstanding write for these children stale.
    /// `None` invalidates the whole roster.
    pub fn invalidate(&mut self, child_ids: Option<&[String]>) {
        match child_ids {
            Some(ids) => {
                for id in ids {
                    self.next_seq += 1;
                    self.child_seqs.insert(id.clone(), self.next_seq);
                }
            }
            None => {
                self.next_seq += 1;
                let seq = self.next_seq;
                for record in &self.roster.records {
                    self.child_seqs.insert(record.child_id.clone(), seq);
                }
                // Also covers children that arrive with the next fetch
                self.epoch += 1;
            }
        }
    }

    pub fn is_current(&self, token: &MutationToken) -> bool {
        token.epoch == self.epoch && self.child_seqs.get(&token.child_id) == Some(&token.seq)
    }

    /// Swap in a new snapshot and recompute the summary.
    pub fn replace_roster(&mut self, roster: Roster) {
        self.summary = Summary::from_roster(&roster);
        debug!(
            center = %self.center,
            total = self.summary.total,
            rate = self.summary.attendance_rate,
            "Roster updated"
        );
        self.roster = roster;
    }

    /// Replace one record if `token` is still current.
    pub(crate) fn replace_record(&mut self, token: &MutationToken, record: AttendanceRecord) -> bool {
        if !self.is_current(token) {
            return false;
        }
        let mut next = self.roster.clone();
        match next.get_mut(&token.child_id) {
            Some(slot) => *slot = record,
            None => return false,
        }
        self.replace_roster(next);
        true
    }
}
