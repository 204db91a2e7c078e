use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use super::{insert_each, load_or_skip, skipped_missing_lists};
use crate::commands::{ALL_IMAGES_COLLECTION, ANNOTATIONS_COLLECTION, CATEGORIES_COLLECTION};
use crate::model::{FileReport, FileStatus, Tallies};
use crate::store::DocumentStore;

/// Copies every image, category and annotation of each file into the bulk
/// collections. Files lacking any of the three lists are skipped whole.
pub fn fill_all(store: &mut dyn DocumentStore, paths: &[PathBuf]) -> Result<Vec<FileReport>> {
    let mut reports = Vec::with_capacity(paths.len());

    for path in paths {
        let file = match load_or_skip(path) {
            Ok(file) => file,
            Err(report) => {
                reports.push(report);
                continue;
            }
        };

        let (Some(images), Some(categories), Some(annotations)) =
            (&file.images, &file.categories, &file.annotations)
        else {
            reports.push(skipped_missing_lists(path, file.missing_lists()));
            continue;
        };

        let mut tallies = Tallies::default();
        for (documents, collection) in [
            (images, ALL_IMAGES_COLLECTION),
            (categories, CATEGORIES_COLLECTION),
            (annotations, ANNOTATIONS_COLLECTION),
        ] {
            insert_each(store, documents, collection, &mut tallies)?;
            info!(
                path = %path.display(),
                collection,
                inserted = tallies.inserted(collection),
                "inserted documents"
            );
        }

        reports.push(FileReport {
            path: path.display().to_string(),
            status: FileStatus::Processed,
            collections: tallies,
        });
    }

    Ok(reports)
}
