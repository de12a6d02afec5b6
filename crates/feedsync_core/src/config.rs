//! Store configuration.

/// Configuration for opening a [`crate::Database`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to fsync the journal on every commit.
    pub sync_on_commit: bool,

    /// Journal size after which it is rewritten as a single snapshot frame.
    /// `0` disables compaction.
    pub compact_threshold_bytes: u64,

    /// Number of past notifications a change feed keeps for polling.
    pub notification_history: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_commit: true,
            compact_threshold_bytes: 8 * 1024 * 1024, // 8 MB
            notification_history: 256,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to fsync on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the compaction threshold.
    #[must_use]
    pub const fn compact_threshold_bytes(mut self, bytes: u64) -> Self {
        self.compact_threshold_bytes = bytes;
        self
    }

    /// Sets the notification history length.
    #[must_use]
    pub const fn notification_history(mut self, len: usize) -> Self {
        self.notification_history = len;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let config = StoreConfig::new()
            .create_if_missing(false)
            .sync_on_commit(false)
            .compact_threshold_bytes(0)
            .notification_history(4);

        assert!(!config.create_if_missing);
        assert!(!config.sync_on_commit);
        assert_eq!(config.compact_threshold_bytes, 0);
        assert_eq!(config.notification_history, 4);
    }
}
