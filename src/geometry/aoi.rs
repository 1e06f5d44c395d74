// binfronts/src/geometry/aoi.rs

use super::layout::{column_longitude, RowLayout};
use super::window::Window;
use crate::errors::GeometryError;
use humantime::format_duration;
use log::{debug, info};
use std::time::Instant;

/// One global row as seen from inside an AOI index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AoiRow {
    pub row: usize,
    pub lat: f64,
    pub global_base: usize,
    pub global_nbins: usize,
    pub nbins: usize,
    pub base: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AoiEntry {
    pub local: usize,
    pub bin: usize,
    pub lat: f64,
    pub lon: f64,
    pub aoi_row: usize,
    pub row_nbins: usize,
    pub row_base: usize,
}

/// The bins of a window, renumbered `0..len()` in (lat, lon) order.
///
/// Rows occupy contiguous local ranges, south to north. Inside a row bins
/// are ordered by longitude; for a window crossing the antimeridian the
/// order follows the normalised longitude, so the eastern part of the
/// window comes first.
#[derive(Debug, Clone)]
pub struct AoiIndex {
    nrows: usize,
    total_bins: usize,
    window: Window,
    rows: Vec<AoiRow>,
    row_nbins: Vec<usize>,
    row_bases: Vec<usize>,
    bins: Vec<usize>,
    lons: Vec<f64>,
}

impl AoiIndex {
    pub fn build(nrows: usize, window: &Window) -> Result<Self, GeometryError> {
        let layout = RowLayout::new(nrows)?;
        Self::from_layout(&layout, window)
    }

    pub fn from_layout(layout: &RowLayout, window: &Window) -> Result<Self, GeometryError> {
        info!(
            "Building AOI index for nrows={} window={}",
            layout.nrows(),
            window
        );
        let start = Instant::now();

        let mut rows = Vec::new();
        let mut bins = Vec::new();
        let mut lons = Vec::new();
        let mut kept: Vec<(f64, usize)> = Vec::new();

        for (row, spec) in layout.rows().iter().enumerate() {
            if !window.contains_lat(spec.lat) {
                continue;
            }
            kept.clear();
            for column in 0..spec.nbins {
                let lon = window.normalize_lon(column_longitude(column, spec.nbins));
                if window.contains_normalized_lon(lon) {
                    kept.push((lon, column));
                }
            }
            if kept.is_empty() {
                continue;
            }
            // rows are visited south to north, so a stable per-row sort by
            // longitude gives the global (lat, lon) order
            kept.sort_by(|a, b| a.0.total_cmp(&b.0));

            let base = bins.len();
            for &(_, column) in kept.iter() {
                bins.push(spec.base + column);
                lons.push(column_longitude(column, spec.nbins));
            }
            rows.push(AoiRow {
                row,
                lat: spec.lat,
                global_base: spec.base,
                global_nbins: spec.nbins,
                nbins: kept.len(),
                base,
            });
        }

        if bins.is_empty() {
            return Err(GeometryError::EmptyWindow {
                nrows: layout.nrows(),
                window: window.to_string(),
            });
        }

        let row_nbins = rows.iter().map(|row| row.nbins).collect();
        let row_bases = rows.iter().map(|row| row.base).collect();
        debug!(
            "AOI index: {} bins in {} rows, built in {}",
            bins.len(),
            rows.len(),
            format_duration(start.elapsed())
        );
        Ok(Self {
            nrows: layout.nrows(),
            total_bins: layout.total_bins(),
            window: *window,
            rows,
            row_nbins,
            row_bases,
            bins,
            lons,
        })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn total_bins(&self) -> usize {
        self.total_bins
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn rows(&self) -> &[AoiRow] {
        &self.rows
    }

    pub fn row_nbins(&self) -> &[usize] {
        &self.row_nbins
    }

    pub fn row_bases(&self) -> &[usize] {
        &self.row_bases
    }

    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn aoi_row_of(&self, local: usize) -> Option<usize> {
        if local >= self.len() {
            return None;
        }
        Some(self.row_bases.partition_point(|&base| base <= local) - 1)
    }

    pub fn entry(&self, local: usize) -> Option<AoiEntry> {
        let aoi_row = self.aoi_row_of(local)?;
        let row = &self.rows[aoi_row];
        Some(AoiEntry {
            local,
            bin: self.bins[local],
            lat: row.lat,
            lon: self.lons[local],
            aoi_row,
            row_nbins: row.nbins,
            row_base: row.base,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = AoiEntry> + '_ {
        self.rows.iter().enumerate().flat_map(move |(aoi_row, row)| {
            (row.base..row.base + row.nbins).map(move |local| AoiEntry {
                local,
                bin: self.bins[local],
                lat: row.lat,
                lon: self.lons[local],
                aoi_row,
                row_nbins: row.nbins,
                row_base: row.base,
            })
        })
    }
}
