use pretty_env_logger;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn _setup_pretty_env_logger_default() {
    INIT.call_once(|| {
        pretty_env_logger::init();
    });
}

/// No-data marker used by the dense grid and the classification codes.
pub const DEFAULT_SENTINEL: f64 = -999.0;

/// Row count of the 4.6 km level-3 binning scheme.
pub const DEFAULT_NROWS: usize = 4320;

pub use align::{align, AlignOptions, DenseGrid, Observation, Quantization};
pub use assemble::{assemble, FrontRecord};
pub use batch::{BatchDriver, BatchReport};
pub use classify::{ClassificationResult, ClassifierInput, FrontClassifier, SubprocessClassifier};
pub use config::{DetectionConfig, DetectionConfigBuilder};
pub use geometry::{AoiIndex, GeometryCache, RowLayout, Window};
pub use pipeline::GranulePipeline;
pub use reader::{CsvGranuleReader, Granule, GranuleReader};

pub mod align;
pub mod assemble;
pub mod batch;
pub mod classify;
pub mod config;
pub mod errors;
pub mod geometry;
pub mod pipeline;
pub mod reader;
pub mod temporal;
pub mod writer;
