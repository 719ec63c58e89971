//! Reconciliation of a change batch against the current host overrides
//!
//! The remote store can only replace its host list as a whole, so the
//! reconciler computes the complete list that must be written back.
//!
//! ## Merge Order
//!
//! For every existing record, in order:
//!
//! 1. key requested for deletion → dropped
//! 2. key requested for update → replaced in place by the updated endpoint
//! 3. otherwise → kept unchanged
//!
//! Then every create whose key is not held by a retained record is appended,
//! in the order given. Deletion wins over update for the same key. Duplicate
//! keys inside the create list are not collapsed.

use crate::error::Result;
use crate::record::{Changes, Endpoint, HostKey, HostRecord, to_host_record};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Result of a reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Full host list to write back
    pub hosts: Vec<HostRecord>,
    /// What happened to each input
    pub summary: ReconcileSummary,
}

/// Per-disposition counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Existing records written back untouched
    pub kept: usize,
    /// Existing records replaced by an update
    pub updated: usize,
    /// Existing records dropped
    pub deleted: usize,
    /// New records appended
    pub created: usize,
    /// Creates dropped because the key already exists
    pub skipped_creates: usize,
}

/// Compute the host list that results from applying `changes` to `existing`
///
/// # Errors
///
/// Validation errors from splitting names or mapping endpoints. Callers that
/// need a guarantee of no partial work should run [`validate`] first.
pub fn reconcile(existing: Vec<HostRecord>, changes: &Changes) -> Result<Reconciliation> {
    let deletes: HashSet<HostKey> = changes
        .delete
        .iter()
        .map(|endpoint| HostKey::of_name(&endpoint.name))
        .collect::<Result<_>>()?;

    let mut updates: HashMap<HostKey, &Endpoint> = HashMap::with_capacity(changes.update.len());
    for endpoint in &changes.update {
        // First update for a key wins
        updates
            .entry(HostKey::of_name(&endpoint.name)?)
            .or_insert(endpoint);
    }

    let mut summary = ReconcileSummary::default();
    let mut retained = HashSet::with_capacity(existing.len());
    let mut hosts = Vec::with_capacity(existing.len() + changes.create.len());

    for record in existing {
        let key = record.key();

        if deletes.contains(&key) {
            debug!("Deleting host override {}", key);
            summary.deleted += 1;
            continue;
        }

        let record = match updates.get(&key) {
            Some(endpoint) => {
                debug!("Updating host override {}", key);
                let mut updated = to_host_record(endpoint)?;
                updated.extra = record.extra;
                summary.updated += 1;
                updated
            }
            None => {
                summary.kept += 1;
                record
            }
        };

        retained.insert(key);
        hosts.push(record);
    }

    for endpoint in &changes.create {
        let key = HostKey::of_name(&endpoint.name)?;
        if retained.contains(&key) {
            debug!("Host override {} already exists, skipping create", key);
            summary.skipped_creates += 1;
            continue;
        }

        debug!("Creating host override {}", key);
        hosts.push(to_host_record(endpoint)?);
        summary.created += 1;
    }

    Ok(Reconciliation { hosts, summary })
}

/// Check that every endpoint in the batch can be reconciled
///
/// Creates and updates must map to a host record; deletes only need a valid
/// name.
pub fn validate(changes: &Changes) -> Result<()> {
    for endpoint in changes.create.iter().chain(&changes.update) {
        to_host_record(endpoint)?;
    }
    for endpoint in &changes.delete {
        HostKey::of_name(&endpoint.name)?;
    }
    Ok(())
}
