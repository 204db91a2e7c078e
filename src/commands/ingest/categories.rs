use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::load_annotation_file;
use crate::store::Document;

/// A requested category name that the dataset does not define.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory {
    pub requested: String,
    pub available: usize,
}

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "category '{}' not found among {} known categories",
            self.requested, self.available
        )
    }
}

impl std::error::Error for UnknownCategory {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTarget {
    pub id: i64,
    pub name: String,
}

impl CategoryTarget {
    pub fn default_collection(&self) -> String {
        collection_name_for(&self.name)
    }
}

/// Authoritative `{id -> name}` mapping taken from the reference annotation file.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    by_id: BTreeMap<i64, String>,
}

impl CategoryIndex {
    pub fn from_documents(categories: &[Document]) -> Self {
        let mut by_id = BTreeMap::new();
        for category in categories {
            match category_entry(category) {
                Some((id, name)) => {
                    by_id.insert(id, name);
                }
                None => warn!(category = ?category, "ignoring category without integer id and name"),
            }
        }
        Self { by_id }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn id_for(&self, name: &str) -> Option<i64> {
        self.by_id
            .iter()
            .find(|(_, candidate)| candidate.as_str() == name)
            .map(|(id, _)| *id)
    }

    /// Every category when `requested` is `None`, otherwise exactly the named one.
    pub fn select(&self, requested: Option<&str>) -> Result<Vec<CategoryTarget>> {
        match requested {
            None => Ok(self
                .by_id
                .iter()
                .map(|(id, name)| CategoryTarget {
                    id: *id,
                    name: name.clone(),
                })
                .collect()),
            Some(name) => {
                let id = self.id_for(name).ok_or_else(|| UnknownCategory {
                    requested: name.to_string(),
                    available: self.len(),
                })?;
                Ok(vec![CategoryTarget {
                    id,
                    name: name.to_string(),
                }])
            }
        }
    }
}

/// `(id, name)` of a category document, when both are well formed.
pub(super) fn category_entry(category: &Document) -> Option<(i64, String)> {
    let id = category.get("id")?.as_i64()?;
    let name = category.get("name")?.as_str()?;
    Some((id, name.to_string()))
}

pub fn collection_name_for(category: &str) -> String {
    category.replace(' ', "_")
}

/// First discovered path whose text contains `marker`.
pub fn find_reference_file<'a>(paths: &'a [PathBuf], marker: &str) -> Option<&'a Path> {
    paths
        .iter()
        .find(|path| path.to_string_lossy().contains(marker))
        .map(PathBuf::as_path)
}

pub fn resolve_categories(paths: &[PathBuf], marker: &str) -> Result<CategoryIndex> {
    let reference = find_reference_file(paths, marker).with_context(|| {
        format!("no reference annotation file matching '{marker}' among {} discovered files", paths.len())
    })?;

    let file = load_annotation_file(reference)?;
    let categories = file.categories.with_context(|| {
        format!("reference file {} has no categories list", reference.display())
    })?;

    let index = CategoryIndex::from_documents(&categories);
    info!(
        path = %reference.display(),
        categories = index.len(),
        "resolved category set"
    );

    Ok(index)
}
