// binfronts/src/errors.rs

use crate::geometry::Window;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Invalid window: {0}")]
    InvalidWindow(String),
    #[error("Window {window} yields no bins for nrows={nrows}")]
    EmptyWindow { nrows: usize, window: String },
    #[error("Bin {bin} is outside of the binning scheme (total_bins={total_bins})")]
    BinOutOfRange { bin: usize, total_bins: usize },
}

#[derive(Error, Debug)]
pub enum AlignError {
    #[error("Observation bin {bin} is outside of [0, {total_bins})")]
    ObservationAlignmentFailure { bin: usize, total_bins: usize },
    #[error("Cannot quantize a granule where every value equals {0}")]
    DegenerateRange(f64),
    #[error(transparent)]
    MinMax(#[from] ndarray_stats::errors::MinMaxError),
}

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Row boundaries do not describe the dense grid: {0}")]
    RowBoundaryMismatch(String),
    #[error("Classifier returned {found} codes for a grid of {expected} bins")]
    OutputLengthMismatch { expected: usize, found: usize },
    #[error("Classifier did not propagate the no-data sentinel at local bin {0}")]
    SentinelNotPropagated(usize),
    #[error("Classifier subprocess failed: {0}")]
    Subprocess(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("Classification has {found} entries but the AOI index has {expected}")]
    LengthMismatch { expected: usize, found: usize },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Granule uses nrows={granule} but the AOI index was built for nrows={aoi}")]
    SchemeMismatch { granule: usize, aoi: usize },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Align(#[from] AlignError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Missing column '{0}'")]
    MissingColumn(String),
    #[error("Line {line}: cannot parse {field}='{value}'")]
    ParseError {
        line: u64,
        field: String,
        value: String,
    },
    #[error("Line {line}: {field} changes within a single granule")]
    Inconsistent { line: u64, field: String },
    #[error("Granule file {} contains no observations", .0.display())]
    Empty(PathBuf),
}

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Directory walk failed: {0}")]
    WalkError(#[from] walkdir::Error),
    #[error("Line {line}: cannot parse {field}='{value}'")]
    ParseError {
        line: u64,
        field: String,
        value: String,
    },
}

#[derive(Error, Debug)]
pub enum GranuleFailure {
    #[error(transparent)]
    Read(#[from] ReaderError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Write(#[from] WriterError),
}

/// A failed granule, with the context needed to reproduce it.
#[derive(Error, Debug)]
#[error(
    "Granule {} (date={date}, nrows={}, window={window}) failed: {source}",
    .path.display(),
    .nrows.map_or_else(|| "unknown".to_string(), |nrows| nrows.to_string())
)]
pub struct GranuleError {
    pub path: PathBuf,
    pub date: String,
    pub nrows: Option<usize>,
    pub window: Window,
    #[source]
    pub source: GranuleFailure,
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    WalkError(#[from] walkdir::Error),
    #[error(transparent)]
    Writer(#[from] WriterError),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Error, Debug)]
pub enum TemporalError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Writer(#[from] WriterError),
    #[error(transparent)]
    Reader(#[from] ReaderError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Align(#[from] AlignError),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Directory walk failed: {0}")]
    WalkError(#[from] walkdir::Error),
    #[error("Grid has {found} bins but the accumulator tracks {expected}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("{} uses nrows={granule}, expected nrows={expected}", .path.display())]
    SchemeMismatch {
        path: PathBuf,
        granule: usize,
        expected: usize,
    },
    #[error("No granules found in {}", .0.display())]
    NoInput(PathBuf),
    #[error("{} has no calendar day in its date '{date}'", .path.display())]
    Undated { path: PathBuf, date: String },
    #[error("{}:{line}: cannot parse {field} from '{value}'", .path.display())]
    ParseError {
        path: PathBuf,
        line: u64,
        field: String,
        value: String,
    },
}
