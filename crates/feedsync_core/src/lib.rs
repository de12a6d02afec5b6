//! # feedsync core
//!
//! The local, offline-first store that every read in the application goes
//! through.
//!
//! This crate provides:
//! - [`ContentStore`]: topics, news resources, their cross references and the
//!   per-collection version cursors, mutated only in atomic units
//! - [`PreferenceStore`]: user preference state, mutated only through
//!   [`PreferenceStore::atomic_mutate`] with `bookmarked ⊆ viewed` checked in
//!   the same unit
//! - [`ChangeFeed`]: post-commit notifications for read-side subscribers
//! - [`Database`]: the single, explicitly owned handle tying both stores to a
//!   locked directory
//!
//! ## Durability
//!
//! Every committed unit is appended to a journal as one checksummed frame
//! before it becomes visible. Reopening replays the journal, so a crash in the
//! middle of a write leaves exactly the units that completed.
//!
//! ## Reads
//!
//! Readers take an `Arc` snapshot and never block the writer; a snapshot
//! always reflects whole units.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_feed;
mod config;
mod content;
mod database;
mod dir;
mod error;
mod journal;
mod preferences;
mod types;

pub use change_feed::{ChangeFeed, Sequenced, Subscription};
pub use config::StoreConfig;
pub use content::{CommitSummary, ContentBatch, ContentChange, ContentSnapshot, ContentStore};
pub use database::Database;
pub use dir::StoreDir;
pub use error::{CoreError, CoreResult};
pub use journal::{compute_crc32, Journal, JOURNAL_MAGIC, JOURNAL_VERSION};
pub use preferences::{
    DarkThemeConfig, PreferenceChange, PreferenceStore, ThemeBrand, UserPreferences,
};
pub use types::{Collection, EntityContent, NewsResource, Topic, VersionCursor};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
