//! Loading annotation files into the document store.
//!
//! Two extraction policies share discovery and category resolution:
//! `fill_all` copies every image, category and annotation into the fixed
//! bulk collections, and `fill_by_category` copies only the images that
//! carry a requested category into a per-category collection.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::model::{AnnotationFile, FileReport, FileStatus, Tallies};
use crate::store::{Document, DocumentStore, InsertOutcome};

mod by_category;
mod categories;
mod discovery;
mod fill_all;
mod run;

pub use by_category::fill_by_category;
pub use categories::{CategoryTarget, UnknownCategory, collection_name_for, resolve_categories};
pub use discovery::{discover_annotation_files, load_annotation_file};
pub use fill_all::fill_all;
pub use run::run;

#[cfg(test)]
pub use categories::{CategoryIndex, find_reference_file};
#[cfg(test)]
pub use run::{IngestRequest, ingest};

/// Inserts each document of `documents` into `collection`, tallying outcomes.
fn insert_each<'a>(
    store: &mut dyn DocumentStore,
    documents: impl IntoIterator<Item = &'a Document>,
    collection: &str,
    tallies: &mut Tallies,
) -> Result<()> {
    tallies.touch(collection);
    for document in documents {
        let outcome = store.insert(document, Some(collection))?;
        if outcome == InsertOutcome::Duplicate {
            debug!(collection, id = ?document.get("id"), "skipping duplicate document");
        }
        tallies.record(collection, outcome);
    }
    Ok(())
}

/// Loads `path`, turning a parse or read failure into a skipped-file report.
fn load_or_skip(path: &Path) -> std::result::Result<AnnotationFile, FileReport> {
    info!(path = %path.display(), "loading annotation file");
    load_annotation_file(path).map_err(|err| {
        warn!(path = %path.display(), error = %format!("{err:#}"), "skipping unreadable annotation file");
        FileReport {
            path: path.display().to_string(),
            status: FileStatus::SkippedUnreadable {
                reason: format!("{err:#}"),
            },
            collections: Tallies::default(),
        }
    })
}

fn skipped_missing_lists(path: &Path, missing: Vec<&'static str>) -> FileReport {
    debug!(path = %path.display(), missing = ?missing, "annotation file lacks expected lists");
    FileReport {
        path: path.display().to_string(),
        status: FileStatus::SkippedMissingLists {
            missing: missing.into_iter().map(str::to_string).collect(),
        },
        collections: Tallies::default(),
    }
}
