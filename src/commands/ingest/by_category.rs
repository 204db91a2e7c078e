use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::Result;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::categories::category_entry;
use super::{CategoryTarget, insert_each, load_or_skip, skipped_missing_lists};
use crate::model::{FileReport, FileStatus, Tallies};
use crate::store::{Document, DocumentStore, encode_key};

/// Copies the images annotated with each target category into that
/// category's collection, file by file.
///
/// `destination` overrides the per-category collection name for every target.
pub fn fill_by_category(
    store: &mut dyn DocumentStore,
    paths: &[PathBuf],
    targets: &[CategoryTarget],
    destination: Option<&str>,
) -> Result<Vec<FileReport>> {
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

        let images_by_key = index_images(images)?;
        let mut tallies = Tallies::default();

        for target in targets {
            let collection = destination
                .map(str::to_string)
                .unwrap_or_else(|| target.default_collection());
            let image_ids = match local_category_id(categories, target) {
                Some(category_id) => image_ids_for_category(annotations, &category_id)?,
                None => {
                    debug!(
                        path = %path.display(),
                        category = %target.name,
                        reference_id = target.id,
                        "file assigns the reference id to another category; no images match"
                    );
                    Vec::new()
                }
            };

            let mut selected = Vec::with_capacity(image_ids.len());
            for image_id in &image_ids {
                match images_by_key.get(image_id) {
                    Some(image) => selected.push(*image),
                    None => debug!(
                        path = %path.display(),
                        image_id = %image_id,
                        "annotation references an image absent from this file"
                    ),
                }
            }

            let before = tallies.get(&collection).cloned().unwrap_or_default();
            insert_each(store, selected, &collection, &mut tallies)?;
            let after = tallies.get(&collection).cloned().unwrap_or_default();
            info!(
                path = %path.display(),
                category = %target.name,
                collection = %collection,
                matched = image_ids.len(),
                inserted = after.inserted - before.inserted,
                duplicates = after.duplicates - before.duplicates,
                "inserted category images"
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

/// The category's id as this file numbers it.
///
/// Falls back to the reference id only when this file does not give that id
/// to a different category; `None` means nothing in the file can match.
fn local_category_id(categories: &[Document], target: &CategoryTarget) -> Option<Value> {
    let entries: Vec<(i64, String)> = categories.iter().filter_map(category_entry).collect();

    if let Some((id, _)) = entries.iter().find(|(_, name)| *name == target.name) {
        return Some(json!(id));
    }
    if entries.iter().any(|(id, _)| *id == target.id) {
        return None;
    }
    Some(json!(target.id))
}

/// Encoded ids of images carrying `category_id`, deduplicated in first-seen order.
fn image_ids_for_category(annotations: &[Document], category_id: &Value) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for annotation in annotations {
        if annotation.get("category_id") != Some(category_id) {
            continue;
        }
        let Some(image_id) = annotation.get("image_id") else {
            continue;
        };
        let key = encode_key(image_id)?;
        if seen.insert(key.clone()) {
            ids.push(key);
        }
    }

    Ok(ids)
}

fn index_images(images: &[Document]) -> Result<HashMap<String, &Document>> {
    let mut by_key = HashMap::with_capacity(images.len());
    for image in images {
        if let Some(id) = image.get("id") {
            by_key.entry(encode_key(id)?).or_insert(image);
        }
    }
    Ok(by_key)
}
