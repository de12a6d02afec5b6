//! Compact command implementation.

use std::path::Path;

/// Journal sizes around a compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactStats {
    /// Content journal bytes before.
    pub content_before: u64,
    /// Content journal bytes after.
    pub content_after: u64,
    /// Preference journal bytes before.
    pub prefs_before: u64,
    /// Preference journal bytes after.
    pub prefs_after: u64,
}

impl CompactStats {
    fn before(&self) -> u64 {
        self.content_before + self.prefs_before
    }

    fn after(&self) -> u64 {
        self.content_after + self.prefs_after
    }
}

/// Compacts both journals of an open store.
pub fn compact(
    db: &feedsync_core::Database,
    dry_run: bool,
) -> Result<CompactStats, Box<dyn std::error::Error>> {
    let content_before = db.content().journal_size()?;
    let prefs_before = db.preferences().journal_size()?;
    if !dry_run {
        db.compact()?;
    }
    Ok(CompactStats {
        content_before,
        content_after: db.content().journal_size()?,
        prefs_before,
        prefs_after: db.preferences().journal_size()?,
    })
}

/// Runs the compact command.
pub fn run(path: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let db = super::open_store(path, false)?;

    println!("Compacting journals at {:?}", path);
    if dry_run {
        println!("(dry run - no changes will be made)");
    }
    println!();

    let stats = compact(&db, dry_run)?;
    println!("  Content journal:    {} -> {} bytes", stats.content_before, stats.content_after);
    println!("  Preference journal: {} -> {} bytes", stats.prefs_before, stats.prefs_after);

    let saved = stats.before().saturating_sub(stats.after());
    println!(
        "  Space saved: {} bytes ({:.1}%)",
        saved,
        if stats.before() > 0 {
            (saved as f64 / stats.before() as f64) * 100.0
        } else {
            0.0
        }
    );
    if !dry_run {
        println!("✓ Compaction complete");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_core::{Collection, ContentBatch, Database, StoreConfig};

    #[test]
    fn compaction_shrinks_journals() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path(), StoreConfig::default()).unwrap();
        for cursor in 1..=20 {
            db.content()
                .atomic_apply(&ContentBatch::new(Collection::Topic, cursor))
                .unwrap();
        }

        let dry = compact(&db, true).unwrap();
        assert_eq!(dry.content_before, dry.content_after);

        let stats = compact(&db, false).unwrap();
        assert!(stats.content_after < stats.content_before);
        assert_eq!(db.content().read_cursor(Collection::Topic), 20);
    }
}
