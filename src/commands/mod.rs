pub mod extremes;
pub mod ingest;
pub mod project;
pub mod status;

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::store::{DocumentStore, MemoryStore, SqliteStore};
use crate::util::ensure_directory;

pub const ALL_IMAGES_COLLECTION: &str = "all_images";
pub const CATEGORIES_COLLECTION: &str = "categories";
pub const ANNOTATIONS_COLLECTION: &str = "annotations";

/// Opens the configured store, or a throwaway in-memory one for dry runs.
pub fn open_store(config: &Config, dry_run: bool) -> Result<Box<dyn DocumentStore>> {
    if dry_run {
        info!("dry run: documents are counted but not persisted");
        return Ok(Box::new(MemoryStore::new(&config.store.collection)));
    }

    ensure_directory(&config.store.url)?;
    let db_path = config.store.db_path();
    let store = SqliteStore::open(&db_path, &config.store.collection)?;
    info!(path = %db_path.display(), "opened document store");

    Ok(Box::new(store))
}
