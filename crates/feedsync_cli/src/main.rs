//! feedsync CLI
//!
//! Command-line tools for a feedsync store.
//!
//! # Commands
//!
//! - `sync` - Pull topics and news resources from the remote API
//! - `inspect` - Display store statistics
//! - `follow` / `unfollow` - Change followed topics
//! - `bookmark` / `unbookmark` / `view` - Change reading state
//! - `prefs` - Show or change preferences
//! - `compact` - Rewrite the journals

mod commands;
mod config;

use clap::{Parser, Subcommand, ValueEnum};
use commands::prefs::{Intent, Settings};
use config::{CliConfig, SyncFlags};
use feedsync_core::{DarkThemeConfig, ThemeBrand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// feedsync command-line tools.
#[derive(Parser)]
#[command(name = "feedsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long, env = "FEEDSYNC_PATH")]
    path: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(global = true, short, long, env = "FEEDSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum BrandArg {
    Default,
    Android,
}

impl From<BrandArg> for ThemeBrand {
    fn from(arg: BrandArg) -> Self {
        match arg {
            BrandArg::Default => ThemeBrand::Default,
            BrandArg::Android => ThemeBrand::Android,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DarkThemeArg {
    System,
    Light,
    Dark,
}

impl From<DarkThemeArg> for DarkThemeConfig {
    fn from(arg: DarkThemeArg) -> Self {
        match arg {
            DarkThemeArg::System => DarkThemeConfig::FollowSystem,
            DarkThemeArg::Light => DarkThemeConfig::Light,
            DarkThemeArg::Dark => DarkThemeConfig::Dark,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Pull topics and news resources from the remote API
    Sync {
        /// Base URL of the API
        #[arg(long, env = "FEEDSYNC_BASE_URL")]
        base_url: Option<String>,

        /// Ids per content request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Attempts before giving up, including the first
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Fail on the first error instead of backing off
        #[arg(long)]
        no_retry: bool,
    },

    /// Display store statistics
    Inspect {
        /// Show per-topic details
        #[arg(short, long)]
        topics: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Follow topics
    Follow {
        /// Topic ids
        #[arg(required = true)]
        topic_ids: Vec<String>,
    },

    /// Unfollow topics
    Unfollow {
        /// Topic ids
        #[arg(required = true)]
        topic_ids: Vec<String>,
    },

    /// Bookmark a news resource (marks it viewed)
    Bookmark {
        /// News resource id
        resource_id: String,
    },

    /// Remove a bookmark
    Unbookmark {
        /// News resource id
        resource_id: String,
    },

    /// Mark a news resource viewed
    View {
        /// News resource id
        resource_id: String,
    },

    /// Show preferences, applying any requested changes first
    Prefs {
        /// Set the theme brand
        #[arg(long, value_enum)]
        theme_brand: Option<BrandArg>,

        /// Set the dark theme mode
        #[arg(long, value_enum)]
        dark_theme: Option<DarkThemeArg>,

        /// Enable or disable dynamic colour
        #[arg(long)]
        dynamic_color: Option<bool>,

        /// Mark onboarding complete
        #[arg(long, conflicts_with = "reset_onboarding")]
        complete_onboarding: bool,

        /// Show onboarding again
        #[arg(long)]
        reset_onboarding: bool,

        /// Clear view history (bookmarks stay viewed)
        #[arg(long)]
        clear_history: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Rewrite both journals as single snapshot records
    Compact {
        /// Dry run - show sizes only
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let file = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync {
            base_url,
            batch_size,
            timeout,
            max_attempts,
            no_retry,
        } => {
            let path = file.store_path(cli.path)?;
            let config = file.sync_config(&SyncFlags {
                base_url,
                fetch_batch_size: batch_size,
                request_timeout_secs: timeout,
                max_attempts,
                no_retry,
            })?;
            commands::sync::run(&path, config).await?;
        }
        Commands::Inspect { topics, format } => {
            let path = file.store_path(cli.path)?;
            commands::inspect::run(&path, topics, &format)?;
        }
        Commands::Follow { topic_ids } => {
            commands::prefs::run(&file.store_path(cli.path)?, &Intent::Follow(topic_ids))?;
        }
        Commands::Unfollow { topic_ids } => {
            commands::prefs::run(&file.store_path(cli.path)?, &Intent::Unfollow(topic_ids))?;
        }
        Commands::Bookmark { resource_id } => {
            commands::prefs::run(&file.store_path(cli.path)?, &Intent::Bookmark(resource_id))?;
        }
        Commands::Unbookmark { resource_id } => {
            commands::prefs::run(&file.store_path(cli.path)?, &Intent::Unbookmark(resource_id))?;
        }
        Commands::View { resource_id } => {
            commands::prefs::run(&file.store_path(cli.path)?, &Intent::View(resource_id))?;
        }
        Commands::Prefs {
            theme_brand,
            dark_theme,
            dynamic_color,
            complete_onboarding,
            reset_onboarding,
            clear_history,
            format,
        } => {
            let settings = Settings {
                theme_brand: theme_brand.map(Into::into),
                dark_theme: dark_theme.map(Into::into),
                dynamic_color,
                complete_onboarding,
                reset_onboarding,
                clear_history,
            };
            commands::prefs::run_show(&file.store_path(cli.path)?, &settings, &format)?;
        }
        Commands::Compact { dry_run } => {
            let path = file.store_path(cli.path)?;
            commands::compact::run(&path, dry_run)?;
        }
        Commands::Version => {
            println!("feedsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("feedsync core v{}", feedsync_core::VERSION);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sync_flags() {
        let cli = Cli::try_parse_from([
            "feedsync",
            "--path",
            "/tmp/store",
            "sync",
            "--base-url",
            "http://localhost",
            "--no-retry",
        ])
        .unwrap();
        assert_eq!(cli.path, Some(PathBuf::from("/tmp/store")));
        assert!(matches!(
            cli.command,
            Commands::Sync { no_retry: true, base_url: Some(_), .. }
        ));
    }

    #[test]
    fn follow_requires_topic() {
        assert!(Cli::try_parse_from(["feedsync", "follow"]).is_err());
    }
}
