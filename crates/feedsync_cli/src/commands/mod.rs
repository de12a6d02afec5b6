//! CLI command implementations.

pub mod compact;
pub mod inspect;
pub mod prefs;
pub mod sync;

use feedsync_core::{Database, StoreConfig};
use std::path::Path;
use std::sync::Arc;

/// Opens the store at `path`, creating it only when `create` is set.
pub fn open_store(path: &Path, create: bool) -> Result<Arc<Database>, Box<dyn std::error::Error>> {
    if !create && !path.exists() {
        return Err(format!("No store found at {:?}", path).into());
    }
    let config = StoreConfig::default().create_if_missing(create);
    Ok(Arc::new(Database::open(path, config)?))
}
