//! # feedsync testkit
//!
//! Test utilities for feedsync.
//!
//! This crate provides:
//! - Test fixtures and database helpers
//! - Sample topics and news resources, in store and wire form
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use feedsync_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_database() {
//!     with_temp_db(|db| {
//!         assert!(db.content().snapshot().is_empty());
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod samples;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::samples::*;
}

pub use fixtures::*;
pub use generators::*;
pub use samples::*;
