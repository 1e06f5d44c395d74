// binfronts/src/classify/input.rs

use crate::align::DenseGrid;
use crate::errors::ClassifyError;
use crate::geometry::AoiIndex;
use ndarray::ArrayView1;

/// Dense grid handed to a classifier, with its row boundaries spelled out.
///
/// `row_nbins[i]` bins starting at local index `row_bases[i]` form row `i`,
/// rows ordered south to north. Construction checks that these describe the
/// grid exactly; a classifier never has to recompute them.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    values: ArrayView1<'a, f64>,
    row_nbins: &'a [usize],
    row_bases: &'a [usize],
    sentinel: f64,
}

impl<'a> ClassifierInput<'a> {
    pub fn new(
        values: ArrayView1<'a, f64>,
        row_nbins: &'a [usize],
        row_bases: &'a [usize],
        sentinel: f64,
    ) -> Result<Self, ClassifyError> {
        if row_nbins.len() != row_bases.len() {
            return Err(ClassifyError::RowBoundaryMismatch(format!(
                "{} row counts but {} row bases",
                row_nbins.len(),
                row_bases.len()
            )));
        }
        let mut expected_base = 0;
        for (row, (&nbins, &base)) in row_nbins.iter().zip(row_bases).enumerate() {
            if base != expected_base {
                return Err(ClassifyError::RowBoundaryMismatch(format!(
                    "row {} starts at {} but the previous rows end at {}",
                    row, base, expected_base
                )));
            }
            if nbins == 0 {
                return Err(ClassifyError::RowBoundaryMismatch(format!("row {} is empty", row)));
            }
            expected_base += nbins;
        }
        if expected_base != values.len() {
            return Err(ClassifyError::RowBoundaryMismatch(format!(
                "rows cover {} bins but the grid holds {}",
                expected_base,
                values.len()
            )));
        }
        Ok(Self {
            values,
            row_nbins,
            row_bases,
            sentinel,
        })
    }

    /// Input for `grid`, with the row boundaries declared by `aoi`.
    pub fn from_aoi(aoi: &'a AoiIndex, grid: &'a DenseGrid) -> Result<Self, ClassifyError> {
        Self::new(grid.values(), aoi.row_nbins(), aoi.row_bases(), grid.sentinel())
    }

    pub fn values(&self) -> ArrayView1<'a, f64> {
        self.values
    }

    pub fn row_nbins(&self) -> &'a [usize] {
        self.row_nbins
    }

    pub fn row_bases(&self) -> &'a [usize] {
        self.row_bases
    }

    pub fn nrows(&self) -> usize {
        self.row_nbins.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sentinel(&self) -> f64 {
        self.sentinel
    }

    /// Sentinel as a classification code.
    pub fn code_sentinel(&self) -> i32 {
        self.sentinel as i32
    }

    pub fn is_missing(&self, local: usize) -> bool {
        self.values[local] == self.sentinel
    }

    pub fn row(&self, row: usize) -> ArrayView1<'a, f64> {
        let base = self.row_bases[row];
        self.values.slice_move(ndarray::s![base..base + self.row_nbins[row]])
    }
}
