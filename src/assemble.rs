// binfronts/src/assemble.rs

use crate::classify::ClassificationResult;
use crate::errors::AssembleError;
use crate::geometry::{AoiIndex, Window};
use log::debug;

/// One classified bin of a granule output.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontRecord {
    pub lat: f64,
    pub lon: f64,
    pub value: i32,
    pub date: String,
}

/// Turns classification codes back into located records.
///
/// Records come out in AOI order. Bins holding the sentinel are dropped, as
/// are bins outside `output_window` when one is given. A granule with no
/// valid bins yields an empty list.
pub fn assemble(
    aoi: &AoiIndex,
    classification: &ClassificationResult,
    output_window: Option<&Window>,
    date: &str,
) -> Result<Vec<FrontRecord>, AssembleError> {
    if classification.len() != aoi.len() {
        return Err(AssembleError::LengthMismatch {
            expected: aoi.len(),
            found: classification.len(),
        });
    }
    let codes = classification.codes();
    let sentinel = classification.sentinel();
    let mut records = Vec::new();
    for row in aoi.rows() {
        if let Some(window) = output_window {
            if !window.contains_lat(row.lat) {
                continue;
            }
        }
        for local in row.base..row.base + row.nbins {
            let value = codes[local];
            if value == sentinel {
                continue;
            }
            let lon = aoi.lons()[local];
            if let Some(window) = output_window {
                if !window.contains_lon(lon) {
                    continue;
                }
            }
            records.push(FrontRecord {
                lat: row.lat,
                lon,
                value,
                date: date.to_string(),
            });
        }
    }
    debug!(
        "Assembled {} records out of {} AOI bins for {}",
        records.len(),
        aoi.len(),
        date
    );
    Ok(records)
}
