//! Derives a per-category image collection from the bulk collections.
//!
//! This is the older category path: it needs `categories`, `annotations`
//! and `all_images` to be populated by a prior full ingest, and joins them
//! inside the store instead of re-reading annotation files.

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::cli::ProjectArgs;
use crate::commands::ingest::{UnknownCategory, collection_name_for};
use crate::commands::{
    ALL_IMAGES_COLLECTION, ANNOTATIONS_COLLECTION, CATEGORIES_COLLECTION, open_store,
};
use crate::config::Config;
use crate::model::ProjectionReport;
use crate::store::{DocumentStore, InsertOutcome, PRIMARY_KEY_FIELD};

pub fn run(config: &Config, args: ProjectArgs) -> Result<()> {
    let mut store = open_store(config, false)?;
    let report = project_category(store.as_mut(), &args.category, args.collection.as_deref())?;

    info!(
        category = %report.category,
        collection = %report.collection,
        annotations = report.annotations_matched,
        inserted = report.inserted,
        duplicates = report.duplicates,
        missing_images = report.missing_images,
        "projection completed"
    );

    Ok(())
}

pub fn project_category(
    store: &mut dyn DocumentStore,
    category: &str,
    destination: Option<&str>,
) -> Result<ProjectionReport> {
    let collection = destination
        .map(str::to_string)
        .unwrap_or_else(|| collection_name_for(category));

    let matches = store.find_by_field(CATEGORIES_COLLECTION, "name", &json!(category))?;
    let Some(stored_category) = matches.first() else {
        if store.count(CATEGORIES_COLLECTION)? == 0 {
            warn!("categories collection is empty; run a full ingest first");
        }
        return Err(UnknownCategory {
            requested: category.to_string(),
            available: store.count(CATEGORIES_COLLECTION)?,
        }
        .into());
    };
    let category_id = stored_category
        .get(PRIMARY_KEY_FIELD)
        .cloned()
        .with_context(|| format!("stored category '{category}' has no primary key"))?;

    let annotations =
        store.find_by_field(ANNOTATIONS_COLLECTION, "category_id", &category_id)?;
    info!(
        category,
        category_id = %category_id,
        annotations = annotations.len(),
        "projecting category images"
    );

    let mut report = ProjectionReport {
        category: category.to_string(),
        category_id,
        collection: collection.clone(),
        annotations_matched: annotations.len(),
        inserted: 0,
        duplicates: 0,
        missing_images: 0,
    };

    for annotation in &annotations {
        let image = match annotation.get("image_id") {
            Some(image_id) => store.find_by_key(ALL_IMAGES_COLLECTION, image_id)?,
            None => None,
        };
        let Some(image) = image else {
            debug!(annotation = ?annotation.get(PRIMARY_KEY_FIELD), "referenced image not stored");
            report.missing_images += 1;
            continue;
        };

        match store.insert(&image, Some(&collection))? {
            InsertOutcome::Inserted => report.inserted += 1,
            InsertOutcome::Duplicate => report.duplicates += 1,
        }
    }

    Ok(report)
}
