//! # feedsync engine
//!
//! Offline-first synchronization of topics and news resources.
//!
//! This crate provides:
//! - Change-list reconciliation ([`reconcile`])
//! - Retry with capped exponential backoff ([`RetryPolicy`])
//! - The sync state machine ([`SyncOrchestrator`])
//! - HTTP and mock transports
//! - Database-backed sync applier
//! - User preference mutations ([`UserDataMerger`])
//!
//! ## Architecture
//!
//! The local store is the only source reads come from. A sync run pulls, per
//! collection, the change list after the committed cursor, fetches the
//! content that changed, and commits content and cursor as one unit. User
//! mutations go straight to the preference store and never wait on sync.
//!
//! ## Key Invariants
//!
//! - Cursors only move forward, and only together with the content they cover
//! - A change list item at or below the cursor fails the run; nothing is skipped
//! - At most one run per orchestrator is active
//! - Sync never writes preferences
//! - `bookmarked ⊆ viewed` after every preference mutation

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod applier;
mod config;
mod error;
mod http;
mod merger;
mod notifier;
mod orchestrator;
mod reconciler;
mod retry;
mod transport;

pub use applier::{DatabaseApplier, SyncApplier};
pub use config::{RetryConfig, SyncConfig};
pub use error::{ErrorKind, NetworkErrorKind, SyncError, SyncResult};
#[cfg(feature = "reqwest-client")]
pub use http::ReqwestClient;
pub use http::{HttpClient, HttpFailure, HttpResponse, HttpTransport};
pub use merger::UserDataMerger;
pub use notifier::{LogNotifier, NoopNotifier, Notifier, RecordingNotifier};
pub use orchestrator::{
    RunReport, SyncOrchestrator, SyncOutcome, SyncRunState, SyncStats, SyncStatus,
};
pub use reconciler::{reconcile, Reconciliation};
pub use retry::{RetryDecision, RetryPolicy};
pub use transport::{MockCall, MockFailure, MockTarget, MockTransport, SyncTransport};
