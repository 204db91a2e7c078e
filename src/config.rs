use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";
pub const DEFAULT_REFERENCE_MARKER: &str = "instances_train";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    /// Upstream dataset name, e.g. `coco-2017`.
    pub name: String,
    /// Local dataset directory. Falls back to `$HOME/fiftyone/<name>`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Substring identifying the annotation file that defines the category set.
    #[serde(default = "default_reference_marker")]
    pub reference_marker: String,
}

fn default_reference_marker() -> String {
    DEFAULT_REFERENCE_MARKER.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the database files.
    pub url: PathBuf,
    /// Database name; the file is `<url>/<db>.sqlite`.
    pub db: String,
    /// Collection used when an insert names none.
    pub collection: String,
}

impl StoreConfig {
    pub fn db_path(&self) -> PathBuf {
        self.url.join(format!("{}.sqlite", self.db))
    }
}

impl DatasetConfig {
    pub fn root(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => {
                let home = env::var_os("HOME")
                    .context("dataset.path is not set and HOME is undefined")?;
                Ok(PathBuf::from(home).join("fiftyone").join(&self.name))
            }
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let raw =
        fs::read(path).with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: Config = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;

    if config.dataset.name.trim().is_empty() {
        bail!("dataset.name must not be empty");
    }
    if config.store.db.trim().is_empty() {
        bail!("store.db must not be empty");
    }
    if config.store.collection.trim().is_empty() {
        bail!("store.collection must not be empty");
    }
    if config.dataset.reference_marker.is_empty() {
        bail!("dataset.reference_marker must not be empty");
    }

    Ok(config)
}
