use anyhow::Result;
use tracing::{info, warn};

use crate::commands::open_store;
use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let db_path = config.store.db_path();
    info!(
        dataset = %config.dataset.name,
        db = %db_path.display(),
        "status requested"
    );

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let store = open_store(config, false)?;
    let counts = store.collections()?;
    if counts.is_empty() {
        warn!("database holds no collections yet");
    }
    for count in &counts {
        info!(
            collection = %count.collection,
            documents = count.documents,
            "collection status"
        );
    }

    Ok(())
}
