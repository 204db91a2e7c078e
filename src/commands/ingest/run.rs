use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use super::{discover_annotation_files, fill_all, fill_by_category, resolve_categories};
use crate::cli::IngestArgs;
use crate::commands::open_store;
use crate::config::Config;
use crate::model::{FileReport, FileStatus, IngestMode, IngestReport, Tallies};
use crate::store::DocumentStore;
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestRequest<'a> {
    /// Restrict ingestion to this category.
    pub category: Option<&'a str>,
    /// Run the category-filtered path over every resolved category.
    pub all_categories: bool,
    /// Destination collection for the category-filtered path.
    pub collection: Option<&'a str>,
}

impl IngestRequest<'_> {
    pub fn mode(&self) -> IngestMode {
        if self.category.is_some() || self.all_categories {
            IngestMode::ByCategory
        } else {
            IngestMode::FillAll
        }
    }
}

pub fn run(config: &Config, args: IngestArgs) -> Result<()> {
    let dataset_root = config.dataset.root()?;
    info!(
        dataset = %config.dataset.name,
        root = %dataset_root.display(),
        "starting ingest"
    );

    let paths = discover_annotation_files(&dataset_root)?;
    info!(files = paths.len(), "discovered annotation files");

    let mut store = open_store(config, args.dry_run)?;
    let request = IngestRequest {
        category: args.category.as_deref(),
        all_categories: args.all_categories,
        collection: args.collection.as_deref(),
    };

    let report = ingest(
        store.as_mut(),
        &paths,
        &request,
        &config.dataset.reference_marker,
    )?;

    for tally in report.totals.iter() {
        info!(
            collection = %tally.collection,
            inserted = tally.inserted,
            duplicates = tally.duplicates,
            "collection totals"
        );
    }

    if let Some(report_path) = &args.report {
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote ingest report");
    }

    info!(
        run_id = %report.run_id,
        mode = report.mode.as_str(),
        files_processed = report.files_processed,
        files_skipped = report.files_skipped,
        inserted = report.totals.total_inserted(),
        duplicates = report.totals.total_duplicates(),
        "ingest completed"
    );

    Ok(())
}

/// Runs one ingestion pass over `paths` and reports what was stored.
///
/// Category names are validated against the reference file before any
/// document is written, so an unknown category leaves the store untouched.
pub fn ingest(
    store: &mut dyn DocumentStore,
    paths: &[PathBuf],
    request: &IngestRequest<'_>,
    reference_marker: &str,
) -> Result<IngestReport> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));
    let mode = request.mode();

    let (categories, files) = match mode {
        IngestMode::FillAll => (Vec::new(), fill_all(store, paths)?),
        IngestMode::ByCategory => {
            let index = resolve_categories(paths, reference_marker)?;
            if index.is_empty() {
                warn!("reference file defines no categories; nothing to ingest");
            }
            let targets = index.select(request.category)?;

            let names = targets.iter().map(|target| target.name.clone()).collect();
            let files = fill_by_category(store, paths, &targets, request.collection)?;
            (names, files)
        }
    };

    Ok(build_report(run_id, mode, started_at, categories, paths.len(), files))
}

fn build_report(
    run_id: String,
    mode: IngestMode,
    started_at: String,
    categories: Vec<String>,
    files_discovered: usize,
    files: Vec<FileReport>,
) -> IngestReport {
    let mut totals = Tallies::default();
    let mut files_processed = 0;
    for file in &files {
        if file.status == FileStatus::Processed {
            files_processed += 1;
        }
        totals.absorb(&file.collections);
    }

    IngestReport {
        report_version: 1,
        run_id,
        mode,
        started_at,
        finished_at: now_utc_string(),
        categories,
        files_discovered,
        files_processed,
        files_skipped: files.len() - files_processed,
        files,
        totals,
    }
}
