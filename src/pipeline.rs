// binfronts/src/pipeline.rs

use crate::align::align;
use crate::assemble::{assemble, FrontRecord};
use crate::classify::{classify_checked, ClassifierInput, FrontClassifier};
use crate::config::DetectionConfig;
use crate::errors::PipelineError;
use crate::geometry::AoiIndex;
use crate::reader::Granule;
use humantime::format_duration;
use log::{debug, info};
use std::time::Instant;

/// Align, classify and assemble one granule.
///
/// Holds no per-granule state, so one pipeline serves any number of granules
/// concurrently. Records are only produced once the whole chain succeeded.
pub struct GranulePipeline<'a> {
    config: &'a DetectionConfig,
    classifier: &'a dyn FrontClassifier,
}

impl<'a> GranulePipeline<'a> {
    pub fn new(config: &'a DetectionConfig, classifier: &'a dyn FrontClassifier) -> Self {
        Self { config, classifier }
    }

    pub fn config(&self) -> &DetectionConfig {
        self.config
    }

    pub fn run(&self, aoi: &AoiIndex, granule: &Granule) -> Result<Vec<FrontRecord>, PipelineError> {
        if granule.nrows != aoi.nrows() {
            return Err(PipelineError::SchemeMismatch {
                granule: granule.nrows,
                aoi: aoi.nrows(),
            });
        }
        let start = Instant::now();
        let grid = align(aoi, &granule.observations, &self.config.align_options())?;
        debug!(
            "{}: {} of {} AOI bins without data",
            granule.date,
            grid.count_missing(),
            grid.len()
        );
        let input = ClassifierInput::from_aoi(aoi, &grid)?;
        let classification = classify_checked(self.classifier, &input)?;
        let records = assemble(aoi, &classification, self.config.output_window(), &granule.date)?;
        info!(
            "{}: {} records in {}",
            granule.date,
            records.len(),
            format_duration(start.elapsed())
        );
        Ok(records)
    }
}
