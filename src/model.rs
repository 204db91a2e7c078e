use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{Document, InsertOutcome};

/// One parsed annotation file. A list is `None` when its key is absent.
#[derive(Debug, Default, Deserialize)]
pub struct AnnotationFile {
    #[serde(default)]
    pub images: Option<Vec<Document>>,
    #[serde(default)]
    pub categories: Option<Vec<Document>>,
    #[serde(default)]
    pub annotations: Option<Vec<Document>>,
}

impl AnnotationFile {
    /// Names of the lists this file lacks, in images/categories/annotations order.
    pub fn missing_lists(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.images.is_none() {
            missing.push("images");
        }
        if self.categories.is_none() {
            missing.push("categories");
        }
        if self.annotations.is_none() {
            missing.push("annotations");
        }
        missing
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    FillAll,
    ByCategory,
}

impl IngestMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FillAll => "fill_all",
            Self::ByCategory => "by_category",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CollectionTally {
    pub collection: String,
    pub inserted: usize,
    pub duplicates: usize,
}

/// Per-collection insert counters kept in first-touched order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Tallies(Vec<CollectionTally>);

impl Tallies {
    pub fn record(&mut self, collection: &str, outcome: InsertOutcome) {
        let tally = self.entry(collection);
        match outcome {
            InsertOutcome::Inserted => tally.inserted += 1,
            InsertOutcome::Duplicate => tally.duplicates += 1,
        }
    }

    pub fn absorb(&mut self, other: &Tallies) {
        for incoming in &other.0 {
            let tally = self.entry(&incoming.collection);
            tally.inserted += incoming.inserted;
            tally.duplicates += incoming.duplicates;
        }
    }

    /// Registers a collection with zero counts so it shows up in reports.
    pub fn touch(&mut self, collection: &str) {
        self.entry(collection);
    }

    pub fn get(&self, collection: &str) -> Option<&CollectionTally> {
        self.0.iter().find(|tally| tally.collection == collection)
    }

    pub fn inserted(&self, collection: &str) -> usize {
        self.get(collection).map(|tally| tally.inserted).unwrap_or(0)
    }

    pub fn total_inserted(&self) -> usize {
        self.0.iter().map(|tally| tally.inserted).sum()
    }

    pub fn total_duplicates(&self) -> usize {
        self.0.iter().map(|tally| tally.duplicates).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollectionTally> {
        self.0.iter()
    }

    fn entry(&mut self, collection: &str) -> &mut CollectionTally {
        let index = match self.0.iter().position(|tally| tally.collection == collection) {
            Some(index) => index,
            None => {
                self.0.push(CollectionTally {
                    collection: collection.to_string(),
                    ..CollectionTally::default()
                });
                self.0.len() - 1
            }
        };
        &mut self.0[index]
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Processed,
    SkippedMissingLists { missing: Vec<String> },
    SkippedUnreadable { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    #[serde(flatten)]
    pub status: FileStatus,
    pub collections: Tallies,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub report_version: u32,
    pub run_id: String,
    pub mode: IngestMode,
    pub started_at: String,
    pub finished_at: String,
    pub categories: Vec<String>,
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files: Vec<FileReport>,
    pub totals: Tallies,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectionReport {
    pub category: String,
    pub category_id: Value,
    pub collection: String,
    pub annotations_matched: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub missing_images: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Extremum {
    pub area: u64,
    pub document: Document,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtremesReport {
    pub collection: String,
    pub scanned: usize,
    pub skipped: usize,
    pub smallest: Option<Extremum>,
    pub largest: Option<Extremum>,
}
