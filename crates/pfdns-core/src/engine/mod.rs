//! Change applier
//!
//! The SyncEngine is responsible for:
//! - Listing the current host overrides as endpoints
//! - Validating a change batch before anything touches the remote store
//! - Reconciling the batch against the fetched host list
//! - Writing the whole section back and running the reconfigure triggers
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────┐
//!   Changes ────────▶│  SyncEngine  │──── EngineEvent ────▶ (monitoring)
//!                    └──────────────┘
//!                           │
//!       ┌───────────────────┼────────────────────┐
//!       │                   │                    │
//!       ▼                   ▼                    ▼
//! ┌───────────┐     ┌───────────────┐     ┌─────────────┐
//! │  fetch    │     │  reconcile    │     │  persist +  │
//! │ (remote)  │     │  (pure)       │     │  triggers   │
//! └───────────┘     └───────────────┘     └─────────────┘
//! ```
//!
//! ## Apply Flow
//!
//! 1. Empty batch → success, no remote call
//! 2. Validate every endpoint and name
//! 3. Fetch the section
//! 4. Reconcile
//! 5. Dry-run → log the would-be host list and stop
//! 6. Persist the section
//! 7. Run each reconfigure trigger in order
//!
//! There are no retries. A failed trigger leaves the data committed; applying
//! the same batch again converges to the same host list.
//!
//! ## Concurrency
//!
//! Two applies against the same store are not coordinated here. Callers that
//! may run concurrently must serialize (the webhook holds a mutex).

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::reconcile::{self, ReconcileSummary};
use crate::record::{Changes, Endpoint, HostOverrideSection, HostRecord, to_endpoint};
use crate::traits::RemoteStore;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

/// Stage of an apply at which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStage {
    /// Input rejected before any remote call
    Validate,
    /// Section could not be fetched
    Fetch,
    /// Section could not be written back
    Persist,
    /// A reconfigure trigger failed
    Reconfigure,
}

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A non-empty batch was accepted for processing
    ApplyStarted {
        creates: usize,
        updates: usize,
        deletes: usize,
    },

    /// The final host list was computed
    Reconciled {
        summary: ReconcileSummary,
        total: usize,
    },

    /// Dry-run stopped before writing
    DryRunCompleted { hosts: usize },

    /// The section was written back
    Persisted { hosts: usize },

    /// A reconfigure trigger ran successfully
    Reconfigured { trigger: String },

    /// The apply failed
    ApplyFailed { stage: ApplyStage, error: String },
}

/// What an apply did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The batch was empty
    NoChanges,
    /// Dry-run: the host list that would have been written
    DryRun { hosts: Vec<HostRecord> },
    /// The host list that was written
    Applied { hosts: Vec<HostRecord> },
}

impl ApplyOutcome {
    /// Host list written (or that would have been), empty for [`ApplyOutcome::NoChanges`]
    pub fn hosts(&self) -> &[HostRecord] {
        match self {
            ApplyOutcome::NoChanges => &[],
            ApplyOutcome::DryRun { hosts } | ApplyOutcome::Applied { hosts } => hosts,
        }
    }
}

/// Change applier over a remote store
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Call [`SyncEngine::list_endpoints()`] / [`SyncEngine::apply_changes()`]
/// 3. Drain the event receiver (optional; events are dropped when it fills up)
pub struct SyncEngine {
    /// Remote store holding the section
    store: Box<dyn RemoteStore>,

    /// Section holding the host overrides
    section: String,

    /// Scripts run after a successful write
    reconfigure_triggers: Vec<String>,

    /// Compute without writing
    dry_run: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        store: Box<dyn RemoteStore>,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            store,
            section: config.section,
            reconfigure_triggers: config.reconfigure_triggers,
            dry_run: config.dry_run,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Whether writes are suppressed
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Name of the underlying remote store
    pub fn store_name(&self) -> &'static str {
        self.store.store_name()
    }

    /// Current host overrides as endpoints
    ///
    /// # Errors
    ///
    /// [`Error::RemoteFetch`] when the section cannot be fetched or read.
    pub async fn list_endpoints(&self) -> Result<Vec<Endpoint>> {
        let (_, hosts) = self.fetch().await?;
        Ok(hosts.iter().map(to_endpoint).collect())
    }

    /// Apply a change batch
    ///
    /// # Errors
    ///
    /// - validation errors ([`Error::is_validation`]): nothing was sent to the store
    /// - [`Error::RemoteFetch`]: nothing was written
    /// - [`Error::RemotePersist`]: remote state unknown
    /// - [`Error::RemoteReconfigure`]: data written, services not reloaded
    pub async fn apply_changes(&self, changes: &Changes) -> Result<ApplyOutcome> {
        if changes.is_empty() {
            debug!("Empty change batch, nothing to do");
            return Ok(ApplyOutcome::NoChanges);
        }

        self.emit_event(EngineEvent::ApplyStarted {
            creates: changes.create.len(),
            updates: changes.update.len(),
            deletes: changes.delete.len(),
        });

        if let Err(e) = reconcile::validate(changes) {
            warn!("Rejected change batch: {}", e);
            return Err(self.failed(ApplyStage::Validate, e));
        }

        let (mut section, existing) = self
            .fetch()
            .await
            .map_err(|e| self.failed(ApplyStage::Fetch, e))?;

        let reconciliation = reconcile::reconcile(existing, changes)
            .map_err(|e| self.failed(ApplyStage::Validate, e))?;
        let hosts = reconciliation.hosts;

        info!(
            "Reconciled {} changes: {} kept, {} updated, {} deleted, {} created, {} creates skipped",
            changes.len(),
            reconciliation.summary.kept,
            reconciliation.summary.updated,
            reconciliation.summary.deleted,
            reconciliation.summary.created,
            reconciliation.summary.skipped_creates,
        );
        self.emit_event(EngineEvent::Reconciled {
            summary: reconciliation.summary,
            total: hosts.len(),
        });

        if self.dry_run {
            match serde_json::to_string(&hosts) {
                Ok(json) => info!("Dry-run, host overrides not written: {}", json),
                Err(e) => warn!("Dry-run, host overrides not written (unprintable: {})", e),
            }
            self.emit_event(EngineEvent::DryRunCompleted { hosts: hosts.len() });
            return Ok(ApplyOutcome::DryRun { hosts });
        }

        section
            .set_hosts(&hosts)
            .map_err(|e| self.failed(ApplyStage::Persist, Error::remote_persist(e.to_string())))?;
        self.persist(section)
            .await
            .map_err(|e| self.failed(ApplyStage::Persist, e))?;
        info!("Wrote {} host overrides to {}", hosts.len(), self.section);
        self.emit_event(EngineEvent::Persisted { hosts: hosts.len() });

        self.reconfigure()
            .await
            .map_err(|e| self.failed(ApplyStage::Reconfigure, e))?;

        Ok(ApplyOutcome::Applied { hosts })
    }

    /// Fetch the section and read its host list
    async fn fetch(&self) -> Result<(HostOverrideSection, Vec<HostRecord>)> {
        let value = self.store.fetch_section(&self.section).await.map_err(|e| {
            Error::remote_fetch(format!("{} ({}): {}", self.section, self.store.store_name(), e))
        })?;

        let section = HostOverrideSection::from_value(value)
            .map_err(|e| Error::remote_fetch(format!("{}: {}", self.section, e)))?;
        let hosts = section
            .hosts()
            .map_err(|e| Error::remote_fetch(format!("{}: {}", self.section, e)))?;

        debug!("Fetched {} host overrides from {}", hosts.len(), self.section);
        Ok((section, hosts))
    }

    /// Write the whole section back
    async fn persist(&self, section: HostOverrideSection) -> Result<()> {
        let result = self
            .store
            .persist_section(&self.section, &section.into_value())
            .await
            .map_err(|e| {
                Error::remote_persist(format!("{} ({}): {}", self.section, self.store.store_name(), e))
            })?;

        if !result.success {
            return Err(Error::remote_persist(format!(
                "{} ({}): store reported failure",
                self.section,
                self.store.store_name()
            )));
        }
        Ok(())
    }

    /// Run the reconfigure triggers in order, stopping at the first failure
    async fn reconfigure(&self) -> Result<()> {
        for trigger in &self.reconfigure_triggers {
            let result = self
                .store
                .execute_trigger(trigger)
                .await
                .map_err(|e| Error::remote_reconfigure(format!("{}: {}", trigger, e)))?;

            if !result.success {
                return Err(Error::remote_reconfigure(format!(
                    "{}: store reported failure",
                    trigger
                )));
            }

            debug!("Ran reconfigure trigger: {}", trigger);
            self.emit_event(EngineEvent::Reconfigured {
                trigger: trigger.clone(),
            });
        }
        Ok(())
    }

    /// Log and report a failed apply, handing the error back
    fn failed(&self, stage: ApplyStage, error: Error) -> Error {
        if stage != ApplyStage::Validate {
            error!("Apply failed at {:?}: {}", stage, error);
        }
        self.emit_event(EngineEvent::ApplyFailed {
            stage,
            error: error.to_string(),
        });
        error
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Embedders that ignore events drop the receiver
            Err(TrySendError::Closed(event)) => {
                debug!("Event receiver dropped, discarding {:?}", event);
            }
        }
    }
}
