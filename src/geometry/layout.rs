// binfronts/src/geometry/layout.rs

use crate::errors::GeometryError;
use log::{debug, trace};
use std::f64::consts::PI;

/// Latitude of the center of `row`, rows counted from the south pole.
pub fn row_latitude(row: usize, nrows: usize) -> f64 {
    (row as f64 + 0.5) * 180.0 / nrows as f64 - 90.0
}

/// Number of bins in `row` of an equal-area scheme with `nrows` rows.
///
/// This is the only place the bin count formula lives. Every other path
/// (global layout, AOI subsetting, bin lookup) goes through it so that row
/// boundaries cannot drift between them.
pub fn bins_in_row(row: usize, nrows: usize) -> usize {
    // mirror rows share one evaluation, so the hemispheres agree bit for bit
    let southern = row.min(nrows - 1 - row);
    let lat = row_latitude(southern, nrows);
    libm::floor(2.0 * nrows as f64 * libm::cos(lat * PI / 180.0) + 0.5) as usize
}

/// Longitude of the center of `column` in a row holding `nbins` bins.
pub fn column_longitude(column: usize, nbins: usize) -> f64 {
    360.0 * (column as f64 + 0.5) / nbins as f64 - 180.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowSpec {
    pub lat: f64,
    pub nbins: usize,
    pub base: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinLocation {
    pub row: usize,
    pub column: usize,
    pub lat: f64,
    pub lon: f64,
}

/// Row table of the global bin scheme: latitude, bin count and first global
/// bin index of every row.
#[derive(Debug, Clone)]
pub struct RowLayout {
    nrows: usize,
    rows: Vec<RowSpec>,
    total_bins: usize,
}

impl RowLayout {
    pub fn new(nrows: usize) -> Result<Self, GeometryError> {
        if nrows == 0 {
            return Err(GeometryError::EmptyWindow {
                nrows,
                window: "global".to_string(),
            });
        }
        let mut rows = Vec::with_capacity(nrows);
        let mut base = 0;
        for row in 0..nrows {
            let nbins = bins_in_row(row, nrows);
            rows.push(RowSpec {
                lat: row_latitude(row, nrows),
                nbins,
                base,
            });
            base += nbins;
        }
        debug!("Row layout for nrows={}: {} bins", nrows, base);
        Ok(Self {
            nrows,
            rows,
            total_bins: base,
        })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn total_bins(&self) -> usize {
        self.total_bins
    }

    pub fn rows(&self) -> &[RowSpec] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> Option<&RowSpec> {
        self.rows.get(row)
    }

    /// Row owning a global bin, found by binary search over the row bases.
    pub fn row_of(&self, bin: usize) -> Result<usize, GeometryError> {
        if bin >= self.total_bins {
            return Err(GeometryError::BinOutOfRange {
                bin,
                total_bins: self.total_bins,
            });
        }
        Ok(self.rows.partition_point(|spec| spec.base <= bin) - 1)
    }

    pub fn bin_location(&self, bin: usize) -> Result<BinLocation, GeometryError> {
        let row = self.row_of(bin)?;
        let spec = &self.rows[row];
        let column = bin - spec.base;
        trace!("bin {} -> row {}, column {}", bin, row, column);
        Ok(BinLocation {
            row,
            column,
            lat: spec.lat,
            lon: column_longitude(column, spec.nbins),
        })
    }
}

/// Row table of the global scheme, as `(lat_center, bin_count, base_offset)`.
pub fn row_layout(nrows: usize) -> Result<Vec<(f64, usize, usize)>, GeometryError> {
    Ok(RowLayout::new(nrows)?
        .rows()
        .iter()
        .map(|spec| (spec.lat, spec.nbins, spec.base))
        .collect())
}
