//! Smallest and largest image by pixel area in a stored collection.

use anyhow::Result;
use serde_json::to_string;
use tracing::{debug, info, warn};

use crate::cli::ExtremesArgs;
use crate::commands::open_store;
use crate::config::Config;
use crate::model::{ExtremesReport, Extremum};
use crate::store::{Document, DocumentStore, PRIMARY_KEY_FIELD};

/// Starting minimum; no representable area exceeds it.
pub const MIN_AREA_SENTINEL: u64 = u64::MAX;

pub fn run(config: &Config, args: ExtremesArgs) -> Result<()> {
    let store = open_store(config, false)?;
    let report = scan_extremes(store.as_ref(), &args.collection)?;

    if report.skipped > 0 {
        warn!(
            collection = %report.collection,
            skipped = report.skipped,
            "skipped documents without integral height and width"
        );
    }

    if let Some(largest) = &report.largest {
        info!(
            pixels = largest.area,
            document = %to_string(&largest.document)?,
            "biggest image"
        );
    }
    if let Some(smallest) = &report.smallest {
        info!(
            pixels = smallest.area,
            document = %to_string(&smallest.document)?,
            "smallest image"
        );
    }
    if report.largest.is_none() && report.smallest.is_none() {
        warn!(
            collection = %report.collection,
            scanned = report.scanned,
            "no image with a usable area found"
        );
    }

    Ok(())
}

/// Single pass over `collection` keeping the first document seen at each extreme.
pub fn scan_extremes(store: &dyn DocumentStore, collection: &str) -> Result<ExtremesReport> {
    let mut min_area = MIN_AREA_SENTINEL;
    let mut max_area = 0;
    let mut smallest = None;
    let mut largest = None;
    let mut skipped = 0;

    let scanned = store.for_each_document(collection, &mut |document| {
        let Some(area) = pixel_area(&document) else {
            debug!(id = ?document.get(PRIMARY_KEY_FIELD), "document lacks integral height/width");
            skipped += 1;
            return Ok(());
        };

        let is_smaller = area < min_area;
        let is_larger = area > max_area;
        if is_smaller {
            min_area = area;
        }
        if is_larger {
            max_area = area;
        }

        match (is_smaller, is_larger) {
            (true, true) => {
                smallest = Some(Extremum {
                    area,
                    document: document.clone(),
                });
                largest = Some(Extremum { area, document });
            }
            (true, false) => smallest = Some(Extremum { area, document }),
            (false, true) => largest = Some(Extremum { area, document }),
            (false, false) => {}
        }

        Ok(())
    })?;

    Ok(ExtremesReport {
        collection: collection.to_string(),
        scanned,
        skipped,
        smallest,
        largest,
    })
}

/// `height * width` when both are non-negative integers.
pub fn pixel_area(document: &Document) -> Option<u64> {
    let height = document.get("height")?.as_u64()?;
    let width = document.get("width")?.as_u64()?;
    height.checked_mul(width)
}
