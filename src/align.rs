// binfronts/src/align.rs

use crate::errors::AlignError;
use crate::geometry::AoiIndex;
use crate::DEFAULT_SENTINEL;
use humantime::format_duration;
use log::{debug, info, warn};
use ndarray::{Array1, ArrayView1};
use ndarray_stats::QuantileExt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub bin: usize,
    pub weighted_sum: f64,
    pub weight: f64,
}

impl Observation {
    pub fn new(bin: usize, weighted_sum: f64, weight: f64) -> Self {
        Self {
            bin,
            weighted_sum,
            weight,
        }
    }

    /// Mean value of the bin, `None` when it is undefined.
    pub fn value(&self) -> Option<f64> {
        if self.weight == 0.0 {
            return None;
        }
        let value = self.weighted_sum / self.weight;
        value.is_finite().then_some(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quantization {
    /// Take the natural log of the values before scaling (chlorophyll).
    pub log_transform: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignOptions {
    pub sentinel: f64,
    pub quantization: Option<Quantization>,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL,
            quantization: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenseGrid {
    values: Array1<f64>,
    sentinel: f64,
}

impl DenseGrid {
    pub fn new(values: Array1<f64>, sentinel: f64) -> Self {
        Self { values, sentinel }
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn sentinel(&self) -> f64 {
        self.sentinel
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_missing(&self, local: usize) -> bool {
        self.values[local] == self.sentinel
    }

    pub fn count_missing(&self) -> usize {
        self.values.iter().filter(|&&v| v == self.sentinel).count()
    }

    pub fn into_values(self) -> Array1<f64> {
        self.values
    }
}

/// Lays a sparse observation list out along `aoi`.
///
/// Observations are stably sorted by bin and looked up by binary search for
/// every AOI bin; when a bin occurs more than once the first observation in
/// input order wins. AOI bins without a defined value receive the sentinel.
pub fn align(
    aoi: &AoiIndex,
    observations: &[Observation],
    options: &AlignOptions,
) -> Result<DenseGrid, AlignError> {
    let start = Instant::now();
    let total_bins = aoi.total_bins();
    if let Some(bad) = observations.iter().find(|obs| obs.bin >= total_bins) {
        return Err(AlignError::ObservationAlignmentFailure {
            bin: bad.bin,
            total_bins,
        });
    }

    let mut sorted: Vec<&Observation> = observations.iter().collect();
    sorted.sort_by_key(|obs| obs.bin);
    let sorted_bins: Vec<usize> = sorted.iter().map(|obs| obs.bin).collect();

    let mut matched = 0;
    let values: Array1<f64> = aoi
        .bins()
        .iter()
        .map(|&bin| {
            let pos = sorted_bins.partition_point(|&b| b < bin);
            match sorted_bins.get(pos) {
                Some(&found) if found == bin => {
                    let value = sorted[pos].value();
                    if value.is_some() {
                        matched += 1;
                    }
                    value.unwrap_or(options.sentinel)
                }
                _ => options.sentinel,
            }
        })
        .collect();
    debug!(
        "Aligned {} observations onto {} AOI bins ({} with data) in {}",
        observations.len(),
        aoi.len(),
        matched,
        format_duration(start.elapsed())
    );

    let mut grid = DenseGrid::new(values, options.sentinel);
    if let Some(quantization) = options.quantization {
        quantize(&mut grid, &quantization)?;
    }
    Ok(grid)
}

/// Rescales the non-sentinel values of `grid` onto the integers `[0, 255]`.
pub fn quantize(grid: &mut DenseGrid, quantization: &Quantization) -> Result<(), AlignError> {
    let sentinel = grid.sentinel;
    if quantization.log_transform {
        let mut dropped = 0;
        grid.values.mapv_inplace(|v| {
            if v == sentinel {
                return v;
            }
            let logged = v.ln();
            if logged.is_finite() {
                logged
            } else {
                dropped += 1;
                sentinel
            }
        });
        if dropped > 0 {
            warn!("{} non-positive values cannot be log transformed, set to no-data", dropped);
        }
    }

    let present: Array1<f64> = grid.values.iter().cloned().filter(|&v| v != sentinel).collect();
    if present.is_empty() {
        info!("No bins with data, skipping quantization");
        return Ok(());
    }
    let min_val = *present.min()?;
    let max_val = *present.max()?;
    if max_val == min_val {
        return Err(AlignError::DegenerateRange(min_val));
    }
    let spread = max_val - min_val;
    grid.values.mapv_inplace(|v| {
        if v == sentinel {
            v
        } else {
            (255.0 * (v - min_val) / spread).floor().clamp(0.0, 255.0)
        }
    });
    debug!("Quantized {} values from [{}, {}]", present.len(), min_val, max_val);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Window;

    fn small_aoi() -> AoiIndex {
        AoiIndex::build(18, &Window::new(-30.0, 30.0, -60.0, 60.0).unwrap()).unwrap()
    }

    #[test]
    fn test_one_observation_per_bin_has_no_gaps() {
        let aoi = small_aoi();
        // reversed order, weights != 1
        let observations: Vec<Observation> = aoi
            .bins()
            .iter()
            .rev()
            .map(|&bin| Observation::new(bin, bin as f64 * 3.0, 2.0))
            .collect();
        let grid = align(&aoi, &observations, &AlignOptions::default()).unwrap();
        assert_eq!(grid.len(), aoi.len());
        assert_eq!(grid.count_missing(), 0);
        for (local, &bin) in aoi.bins().iter().enumerate() {
            assert_eq!(grid.values()[local], bin as f64 * 1.5);
        }
    }

    #[test]
    fn test_missing_and_undefined_bins_get_sentinel() {
        let aoi = small_aoi();
        let bins = aoi.bins();
        let observations = vec![
            Observation::new(bins[3], 10.0, 2.0),
            Observation::new(bins[5], 10.0, 0.0),
            Observation::new(bins[7], f64::NAN, 1.0),
            // outside the window but inside the scheme
            Observation::new(0, 1.0, 1.0),
        ];
        let grid = align(&aoi, &observations, &AlignOptions::default()).unwrap();
        assert_eq!(grid.values()[3], 5.0);
        assert!(grid.is_missing(5));
        assert!(grid.is_missing(7));
        assert_eq!(grid.count_missing(), aoi.len() - 1);
        assert!(grid.values().iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_duplicate_bins_keep_first() {
        let aoi = small_aoi();
        let bin = aoi.bins()[2];
        let observations = vec![Observation::new(bin, 4.0, 1.0), Observation::new(bin, 8.0, 1.0)];
        let grid = align(&aoi, &observations, &AlignOptions::default()).unwrap();
        assert_eq!(grid.values()[2], 4.0);
    }

    #[test]
    fn test_out_of_range_bin_fails() {
        let aoi = small_aoi();
        let observations = vec![Observation::new(aoi.total_bins(), 1.0, 1.0)];
        match align(&aoi, &observations, &AlignOptions::default()) {
            Err(AlignError::ObservationAlignmentFailure { bin, total_bins }) => {
                assert_eq!(bin, aoi.total_bins());
                assert_eq!(total_bins, aoi.total_bins());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_quantization_scales_to_byte_range() {
        let aoi = small_aoi();
        let bins = aoi.bins();
        let observations = vec![
            Observation::new(bins[0], 10.0, 1.0),
            Observation::new(bins[1], 20.0, 1.0),
            Observation::new(bins[2], 15.0, 1.0),
        ];
        let options = AlignOptions {
            quantization: Some(Quantization::default()),
            ..AlignOptions::default()
        };
        let grid = align(&aoi, &observations, &options).unwrap();
        assert_eq!(grid.values()[0], 0.0);
        assert_eq!(grid.values()[1], 255.0);
        assert_eq!(grid.values()[2], 127.0);
        assert_eq!(grid.count_missing(), aoi.len() - 3);
    }

    #[test]
    fn test_log_quantization() {
        let aoi = small_aoi();
        let bins = aoi.bins();
        let e = std::f64::consts::E;
        let observations = vec![
            Observation::new(bins[0], 1.0, 1.0),
            Observation::new(bins[1], e * e, 1.0),
            Observation::new(bins[2], e, 1.0),
            Observation::new(bins[3], 0.0, 1.0),
        ];
        let options = AlignOptions {
            quantization: Some(Quantization { log_transform: true }),
            ..AlignOptions::default()
        };
        let grid = align(&aoi, &observations, &options).unwrap();
        assert_eq!(grid.values()[0], 0.0);
        assert_eq!(grid.values()[1], 255.0);
        assert_eq!(grid.values()[2], 127.0);
        // ln(0) is not a value
        assert!(grid.is_missing(3));
    }

    #[test]
    fn test_degenerate_range() {
        let aoi = small_aoi();
        let bins = aoi.bins();
        let observations = vec![Observation::new(bins[0], 2.0, 1.0), Observation::new(bins[9], 4.0, 2.0)];
        let options = AlignOptions {
            quantization: Some(Quantization::default()),
            ..AlignOptions::default()
        };
        assert!(matches!(
            align(&aoi, &observations, &options),
            Err(AlignError::DegenerateRange(v)) if v == 2.0
        ));
    }

    #[test]
    fn test_quantization_without_data_is_noop() {
        let aoi = small_aoi();
        let options = AlignOptions {
            quantization: Some(Quantization::default()),
            ..AlignOptions::default()
        };
        let grid = align(&aoi, &[], &options).unwrap();
        assert_eq!(grid.count_missing(), aoi.len());
    }
}
