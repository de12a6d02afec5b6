//! Optional TOML configuration file.
//!
//! Every field is optional; command-line flags override whatever the file
//! sets.
//!
//! ```toml
//! path = "/var/lib/feedsync"
//! base_url = "https://feed.example.com"
//! fetch_batch_size = 40
//! request_timeout_secs = 30
//!
//! [retry]
//! max_attempts = 5
//! base_delay_secs = 30
//! max_delay_secs = 18000
//! ```

use feedsync_engine::{RetryConfig, SyncConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config file {path:?}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("invalid config file {path:?}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// No store directory was given.
    #[error("store path required: pass --path or set `path` in the config file")]
    MissingPath,

    /// No API URL was given.
    #[error("base URL required: pass --base-url or set `base_url` in the config file")]
    MissingBaseUrl,
}

/// Retry section of the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    /// Attempts per run, including the first.
    pub max_attempts: Option<u32>,
    /// Delay after the first failure, in seconds.
    pub base_delay_secs: Option<u64>,
    /// Delay cap, in seconds.
    pub max_delay_secs: Option<u64>,
}

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Store directory.
    pub path: Option<PathBuf>,
    /// Remote API base URL.
    pub base_url: Option<String>,
    /// Ids per content request.
    pub fetch_batch_size: Option<usize>,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Retry settings.
    #[serde(default)]
    pub retry: RetrySection,
}

impl CliConfig {
    /// Loads `path`, or returns the empty configuration if `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?path, "loaded config file");
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// The store directory: `flag` if given, else the file's.
    pub fn store_path(&self, flag: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        flag.or_else(|| self.path.clone())
            .ok_or(ConfigError::MissingPath)
    }

    /// Builds the sync configuration, with flags taking precedence.
    pub fn sync_config(&self, flags: &SyncFlags) -> Result<SyncConfig, ConfigError> {
        let base_url = flags
            .base_url
            .clone()
            .or_else(|| self.base_url.clone())
            .ok_or(ConfigError::MissingBaseUrl)?;

        let mut config = SyncConfig::new(base_url);
        if let Some(size) = flags.fetch_batch_size.or(self.fetch_batch_size) {
            config = config.with_fetch_batch_size(size);
        }
        if let Some(secs) = flags.request_timeout_secs.or(self.request_timeout_secs) {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        let retry = if flags.no_retry {
            RetryConfig::no_retry()
        } else {
            let mut retry = RetryConfig::default();
            if let Some(attempts) = flags.max_attempts.or(self.retry.max_attempts) {
                retry.max_attempts = attempts.max(1);
            }
            if let Some(secs) = self.retry.base_delay_secs {
                retry = retry.with_base_delay(Duration::from_secs(secs));
            }
            if let Some(secs) = self.retry.max_delay_secs {
                retry = retry.with_max_delay(Duration::from_secs(secs));
            }
            retry
        };
        Ok(config.with_retry(retry))
    }
}

/// Sync settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SyncFlags {
    /// `--base-url`.
    pub base_url: Option<String>,
    /// `--batch-size`.
    pub fetch_batch_size: Option<usize>,
    /// `--timeout`.
    pub request_timeout_secs: Option<u64>,
    /// `--max-attempts`.
    pub max_attempts: Option<u32>,
    /// `--no-retry`.
    pub no_retry: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = r#"
        path = "/tmp/feedsync"
        base_url = "https://feed.example.com"
        fetch_batch_size = 10

        [retry]
        max_attempts = 3
        base_delay_secs = 5
    "#;

    #[test]
    fn parses_full_file() {
        let config = CliConfig::parse(FILE).unwrap();
        assert_eq!(config.path, Some(PathBuf::from("/tmp/feedsync")));
        assert_eq!(config.fetch_batch_size, Some(10));
        assert_eq!(config.retry.max_attempts, Some(3));
        assert_eq!(config.retry.max_delay_secs, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(CliConfig::parse("base_url = \"x\"\nbatch = 3").is_err());
    }

    #[test]
    fn flags_override_file() {
        let config = CliConfig::parse(FILE).unwrap();
        let flags = SyncFlags {
            base_url: Some("http://localhost:8080".into()),
            max_attempts: Some(7),
            ..SyncFlags::default()
        };
        let sync = config.sync_config(&flags).unwrap();
        assert_eq!(sync.base_url, "http://localhost:8080");
        assert_eq!(sync.fetch_batch_size, 10);
        assert_eq!(sync.retry.max_attempts, 7);
        assert_eq!(sync.retry.base_delay, Duration::from_secs(5));
        assert_eq!(sync.retry.max_delay, Duration::from_secs(5 * 60 * 60));
    }

    #[test]
    fn no_retry_flag_wins() {
        let config = CliConfig::parse(FILE).unwrap();
        let flags = SyncFlags {
            no_retry: true,
            ..SyncFlags::default()
        };
        assert_eq!(config.sync_config(&flags).unwrap().retry.max_attempts, 1);
    }

    #[test]
    fn missing_values_are_errors() {
        let config = CliConfig::default();
        assert!(matches!(
            config.sync_config(&SyncFlags::default()),
            Err(ConfigError::MissingBaseUrl)
        ));
        assert!(matches!(config.store_path(None), Err(ConfigError::MissingPath)));
        assert_eq!(
            config.store_path(Some("/x".into())).unwrap(),
            PathBuf::from("/x")
        );
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedsync.toml");
        std::fs::write(&path, FILE).unwrap();
        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://feed.example.com"));

        assert_eq!(CliConfig::load(None).unwrap(), CliConfig::default());
        assert!(matches!(
            CliConfig::load(Some(&dir.path().join("missing.toml"))),
            Err(ConfigError::Read { .. })
        ));
    }
}
