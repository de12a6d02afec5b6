//! Sync orchestrator state machine.
//!
//! ```text
//!          StartSync                 all collections committed
//!   Idle ─────────────▶ Running ──────────────────────────────▶ Success ──▶ Idle
//!                        ▲   │
//!      backoff elapsed   │   │ error
//!                        │   ▼
//!                        Failed ── fatal, or attempts exhausted: run ends here
//! ```
//!
//! Each run processes the collections in [`Collection::ALL`] order. Per
//! collection: fetch the change list after the committed cursor, reconcile it,
//! fetch content for the upserts in chunks, and commit everything plus the
//! new cursor as one unit. A retryable error restarts the run from the first
//! collection after a backoff; units committed earlier in the run stay
//! committed, so the restart only refetches what is still missing.

use crate::applier::SyncApplier;
use crate::config::SyncConfig;
use crate::error::{ErrorKind, SyncError, SyncResult};
use crate::notifier::{resources_to_notify, Notifier, NoopNotifier};
use crate::reconciler::reconcile;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::transport::SyncTransport;
use chrono::{DateTime, Utc};
use feedsync_core::{Collection, CommitSummary, ContentBatch, EntityContent};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

/// Status of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No run in progress.
    Idle,
    /// A run is fetching or applying.
    Running,
    /// The last run completed.
    Success,
    /// The last attempt failed. Either a retry is pending or the run ended.
    Failed,
}

/// Observable state of the orchestrator. Process-local, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRunState {
    /// Current status.
    pub status: SyncStatus,
    /// Attempt number within the current run, 0-indexed.
    pub attempt: u32,
    /// Message of the last error, cleared on success.
    pub last_error: Option<String>,
    /// Class of the last error, cleared on success.
    pub last_error_kind: Option<ErrorKind>,
}

impl SyncRunState {
    fn idle() -> Self {
        Self {
            status: SyncStatus::Idle,
            attempt: 0,
            last_error: None,
            last_error_kind: None,
        }
    }
}

/// Cumulative statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Runs started.
    pub runs_started: u64,
    /// Runs that completed.
    pub runs_succeeded: u64,
    /// Runs that ended failed.
    pub runs_failed: u64,
    /// Runs that were cancelled.
    pub runs_cancelled: u64,
    /// Retries scheduled.
    pub retries: u64,
    /// Units committed.
    pub units_committed: u64,
    /// Entities created.
    pub entities_created: u64,
    /// Entities updated.
    pub entities_updated: u64,
    /// Entities deleted.
    pub entities_deleted: u64,
    /// Resources handed to the notifier.
    pub notifications_posted: u64,
    /// When the last run completed.
    pub last_success: Option<DateTime<Utc>>,
}

/// What a run committed.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Attempts made, at least 1.
    pub attempts: u32,
    /// Units committed, in order, across all attempts.
    pub committed: Vec<CommitSummary>,
    /// Resources handed to the notifier.
    pub notified: usize,
}

/// How a `start_sync` call ended.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Every collection is up to date.
    Succeeded(RunReport),
    /// The run ended failed.
    Failed {
        /// The error of the last attempt.
        error: SyncError,
        /// What was committed before the failure.
        report: RunReport,
    },
    /// The run was cancelled.
    Cancelled(RunReport),
    /// Another run was already in progress; this call did nothing.
    AlreadyRunning,
}

impl SyncOutcome {
    /// Returns true for [`SyncOutcome::Succeeded`].
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Succeeded(_))
    }
}

/// Resets the running flag when a run ends, however it ends.
struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { running })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Coordinates sync runs between a transport and the local store.
pub struct SyncOrchestrator<T: SyncTransport, A: SyncApplier> {
    config: SyncConfig,
    policy: RetryPolicy,
    transport: Arc<T>,
    applier: Arc<A>,
    notifier: Arc<dyn Notifier>,
    running: AtomicBool,
    cancelled: AtomicBool,
    cancel_signal: Notify,
    state: watch::Sender<SyncRunState>,
    stats: RwLock<SyncStats>,
}

impl<T: SyncTransport, A: SyncApplier> SyncOrchestrator<T, A> {
    /// Creates an orchestrator.
    pub fn new(config: SyncConfig, transport: T, applier: A) -> Self {
        Self::with_shared(config, Arc::new(transport), Arc::new(applier))
    }

    /// Creates an orchestrator over shared transport and applier handles.
    pub fn with_shared(config: SyncConfig, transport: Arc<T>, applier: Arc<A>) -> Self {
        let (state, _) = watch::channel(SyncRunState::idle());
        Self {
            policy: RetryPolicy::new(config.retry.clone()),
            config,
            transport,
            applier,
            notifier: Arc::new(NoopNotifier),
            running: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            cancel_signal: Notify::new(),
            state,
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Sets the notifier for new content in followed topics.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Current state.
    pub fn state(&self) -> SyncRunState {
        self.state.borrow().clone()
    }

    /// Watches state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<SyncRunState> {
        self.state.subscribe()
    }

    /// Cumulative statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns true while a run is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Cancels the run in progress, if any.
    ///
    /// The run stops at its next suspension point. Units already committed
    /// stay committed; the unit being prepared is dropped.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.cancel_signal.notify_waiters();
    }

    /// Runs a sync to completion, retrying per the retry policy.
    ///
    /// Returns [`SyncOutcome::AlreadyRunning`] without doing anything if a
    /// run is already in progress.
    pub async fn start_sync(&self) -> SyncOutcome {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            debug!("sync already running, request coalesced");
            return SyncOutcome::AlreadyRunning;
        };
        self.cancelled.store(false, Ordering::SeqCst);
        self.stats.write().runs_started += 1;

        let mut report = RunReport::default();
        let mut attempt = 0u32;
        let mut last_error: Option<(String, ErrorKind)> = None;

        loop {
            report.attempts = attempt + 1;
            self.publish(SyncStatus::Running, attempt, last_error.as_ref());

            let error = match self.run_once(&mut report).await {
                Ok(()) => {
                    self.publish(SyncStatus::Success, attempt, None);
                    {
                        let mut stats = self.stats.write();
                        stats.runs_succeeded += 1;
                        stats.last_success = Some(Utc::now());
                    }
                    info!(
                        attempts = report.attempts,
                        units = report.committed.len(),
                        "sync completed"
                    );
                    self.publish(SyncStatus::Idle, 0, None);
                    return SyncOutcome::Succeeded(report);
                }
                Err(error) => error,
            };

            if matches!(error, SyncError::Cancelled) {
                return self.end_cancelled(report);
            }

            last_error = Some((error.to_string(), error.kind()));
            self.publish(SyncStatus::Failed, attempt, last_error.as_ref());

            match self.policy.decide(&error, attempt) {
                RetryDecision::RetryAfter(delay) => {
                    warn!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %error,
                        "sync attempt failed, retrying"
                    );
                    self.stats.write().retries += 1;
                    let slept = self
                        .cancellable(async {
                            tokio::time::sleep(delay).await;
                            Ok(())
                        })
                        .await;
                    if slept.is_err() {
                        return self.end_cancelled(report);
                    }
                    attempt += 1;
                }
                RetryDecision::GiveUp => {
                    warn!(attempt, kind = ?error.kind(), error = %error, "sync failed");
                    self.stats.write().runs_failed += 1;
                    return SyncOutcome::Failed { error, report };
                }
            }
        }
    }

    fn end_cancelled(&self, report: RunReport) -> SyncOutcome {
        info!(units = report.committed.len(), "sync cancelled");
        self.stats.write().runs_cancelled += 1;
        self.publish(SyncStatus::Idle, 0, None);
        SyncOutcome::Cancelled(report)
    }

    fn publish(&self, status: SyncStatus, attempt: u32, error: Option<&(String, ErrorKind)>) {
        self.state.send_replace(SyncRunState {
            status,
            attempt,
            last_error: error.map(|(message, _)| message.clone()),
            last_error_kind: error.map(|(_, kind)| *kind),
        });
    }

    async fn run_once(&self, report: &mut RunReport) -> SyncResult<()> {
        for collection in Collection::ALL {
            self.sync_collection(collection, report).await?;
        }
        Ok(())
    }

    async fn sync_collection(&self, collection: Collection, report: &mut RunReport) -> SyncResult<()> {
        let snapshot = self.applier.snapshot();
        let cursor = snapshot.cursor(collection);

        let items = self
            .cancellable(self.transport.fetch_change_list(collection, cursor))
            .await?;
        debug!(%collection, cursor, items = items.len(), "change list fetched");

        let reconciliation = reconcile(&snapshot.ids(collection), &items, cursor)?;
        if reconciliation.is_empty() && reconciliation.new_cursor == cursor {
            debug!(%collection, cursor, "collection up to date");
            return Ok(());
        }

        let wanted = reconciliation.to_upsert();
        let mut fetched: BTreeMap<String, EntityContent> = BTreeMap::new();
        for chunk in wanted.chunks(self.config.fetch_batch_size.max(1)) {
            let payloads = self
                .cancellable(self.transport.fetch_entities(collection, chunk))
                .await?;
            for payload in payloads {
                if payload.collection() != collection || !chunk.iter().any(|id| id == payload.id()) {
                    warn!(%collection, id = payload.id(), "ignoring unrequested payload");
                    continue;
                }
                fetched.insert(payload.id().to_string(), payload.into());
            }
        }

        let missing: BTreeSet<&String> = wanted.iter().filter(|id| !fetched.contains_key(*id)).collect();
        if !missing.is_empty() {
            warn!(%collection, missing = ?missing, "server returned no content for some ids");
        }

        self.check_cancelled()?;

        let batch = ContentBatch {
            collection,
            upserts: fetched.into_values().collect(),
            deletes: reconciliation.to_delete.into_iter().collect(),
            new_cursor: reconciliation.new_cursor,
        };
        let summary = self.applier.apply(&batch)?;

        {
            let mut stats = self.stats.write();
            stats.units_committed += 1;
            stats.entities_created += summary.created.len() as u64;
            stats.entities_updated += summary.updated.len() as u64;
            stats.entities_deleted += summary.deleted.len() as u64;
        }

        if collection == Collection::NewsResource && cursor > 0 {
            let resources = resources_to_notify(
                &self.applier.snapshot(),
                &self.applier.preferences(),
                &summary.created,
            );
            if !resources.is_empty() {
                self.notifier.post_news_notifications(&resources);
                self.stats.write().notifications_posted += resources.len() as u64;
                report.notified += resources.len();
            }
        }

        report.committed.push(summary);
        Ok(())
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Runs `fut` unless the run is cancelled first.
    async fn cancellable<F, R>(&self, fut: F) -> SyncResult<R>
    where
        F: Future<Output = SyncResult<R>>,
    {
        let notified = self.cancel_signal.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        self.check_cancelled()?;

        tokio::select! {
            biased;
            _ = &mut notified => Err(SyncError::Cancelled),
            result = fut => result,
        }
    }
}
