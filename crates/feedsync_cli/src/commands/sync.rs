//! Sync command implementation.

use feedsync_engine::{
    DatabaseApplier, HttpTransport, LogNotifier, ReqwestClient, SyncConfig, SyncOrchestrator,
    SyncOutcome,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Runs one sync against the remote API. Ctrl-C cancels the run; units
/// already committed stay committed.
pub async fn run(path: &Path, config: SyncConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db = super::open_store(path, true)?;
    let client = ReqwestClient::new(config.request_timeout)?;
    let transport = HttpTransport::new(config.base_url.clone(), client);

    info!(base_url = %config.base_url, path = ?path, "starting sync");
    let orchestrator = SyncOrchestrator::new(config, transport, DatabaseApplier::new(db))
        .with_notifier(Arc::new(LogNotifier));

    let run = orchestrator.start_sync();
    tokio::pin!(run);
    let outcome = tokio::select! {
        outcome = &mut run => outcome,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, cancelling sync");
            orchestrator.cancel();
            run.await
        }
    };

    let stats = orchestrator.stats();
    match outcome {
        SyncOutcome::Succeeded(report) => {
            println!(
                "✓ Sync complete: {} units committed in {} attempt(s)",
                report.committed.len(),
                report.attempts
            );
            println!(
                "  Created {}, updated {}, deleted {}, notified {}",
                stats.entities_created, stats.entities_updated, stats.entities_deleted, report.notified
            );
            Ok(())
        }
        SyncOutcome::Cancelled(report) => {
            println!("Sync cancelled after {} units", report.committed.len());
            Ok(())
        }
        SyncOutcome::Failed { error, report } => Err(format!(
            "sync failed after {} attempt(s) ({:?}): {}",
            report.attempts,
            error.kind(),
            error
        )
        .into()),
        SyncOutcome::AlreadyRunning => Err("sync already running".into()),
    }
}
