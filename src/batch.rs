// binfronts/src/batch.rs

use crate::classify::FrontClassifier;
use crate::config::DetectionConfig;
use crate::errors::{BatchError, GranuleError, GranuleFailure, PipelineError};
use crate::geometry::GeometryCache;
use crate::pipeline::GranulePipeline;
use crate::reader::GranuleReader;
use crate::writer::{existing_outputs, CsvRecordWriter, OutputId};
use humantime::format_duration;
use log::{debug, error, info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use walkdir::WalkDir;

/// Outcome of a batch run. Failed granules never abort their siblings.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<GranuleError>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.written.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

enum Outcome {
    Written(PathBuf),
    Skipped(PathBuf),
    Failed(GranuleError),
}

/// Files below `input_dir` that `reader` accepts, sorted by path.
pub fn discover_granules(reader: &dyn GranuleReader, input_dir: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(input_dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && reader.accepts(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Runs the granule pipeline over every granule of an input directory.
pub struct BatchDriver<'a> {
    config: &'a DetectionConfig,
    classifier: &'a dyn FrontClassifier,
    reader: &'a dyn GranuleReader,
    cache: GeometryCache,
    threads: Option<usize>,
}

impl<'a> BatchDriver<'a> {
    pub fn new(
        config: &'a DetectionConfig,
        classifier: &'a dyn FrontClassifier,
        reader: &'a dyn GranuleReader,
    ) -> Self {
        Self {
            config,
            classifier,
            reader,
            cache: GeometryCache::new(),
            threads: None,
        }
    }

    /// Worker count; rayon picks one per core when unset.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn cache(&self) -> &GeometryCache {
        &self.cache
    }

    pub fn discover(&self, input_dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
        let paths = discover_granules(self.reader, input_dir)?;
        info!("Discovered {} granules in {}", paths.len(), input_dir.display());
        Ok(paths)
    }

    pub fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<BatchReport, BatchError> {
        let start = Instant::now();
        let paths = self.discover(input_dir)?;
        let claimed = Mutex::new(existing_outputs(output_dir)?);
        let writer = CsvRecordWriter::new(output_dir);
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.threads.unwrap_or(0))
            .build()?;
        info!(
            "Processing {} granules on {} threads",
            paths.len(),
            pool.current_num_threads()
        );

        let outcomes: Vec<Outcome> = pool.install(|| {
            paths
                .par_iter()
                .map(|path| self.process(path, &claimed, &writer))
                .collect()
        });

        let mut report = BatchReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Written(path) => report.written.push(path),
                Outcome::Skipped(path) => report.skipped.push(path),
                Outcome::Failed(err) => {
                    error!("{}", err);
                    report.failed.push(err);
                }
            }
        }
        info!(
            "Batch finished in {}: {} written, {} skipped, {} failed",
            format_duration(start.elapsed()),
            report.written.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn process(&self, path: &Path, claimed: &Mutex<HashSet<String>>, writer: &CsvRecordWriter) -> Outcome {
        let granule = match self.reader.read(path) {
            Ok(granule) => granule,
            Err(err) => return Outcome::Failed(self.failure(path, "unknown", None, err.into())),
        };
        let id = OutputId::new(&granule.date, self.config.sensor(), &self.config.window_tag());
        let file_name = id.file_name();
        {
            let mut claimed = claimed.lock().unwrap_or_else(PoisonError::into_inner);
            if !claimed.insert(file_name.clone()) {
                debug!("Skipping {}: {} already exists", path.display(), file_name);
                return Outcome::Skipped(path.to_path_buf());
            }
        }

        let result = (|| -> Result<PathBuf, GranuleFailure> {
            if granule.nrows != self.config.nrows() {
                warn!(
                    "{} uses nrows={} instead of the configured {}",
                    path.display(),
                    granule.nrows,
                    self.config.nrows()
                );
            }
            let aoi = self
                .cache
                .get_or_build(granule.nrows, self.config.window())
                .map_err(PipelineError::from)?;
            let records = GranulePipeline::new(self.config, self.classifier).run(&aoi, &granule)?;
            Ok(writer.write(&id, &records)?)
        })();

        match result {
            Ok(written) => Outcome::Written(written),
            Err(source) => {
                // release the name so a later run can retry
                claimed
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&file_name);
                Outcome::Failed(self.failure(path, &granule.date, Some(granule.nrows), source))
            }
        }
    }

    fn failure(&self, path: &Path, date: &str, nrows: Option<usize>, source: GranuleFailure) -> GranuleError {
        GranuleError {
            path: path.to_path_buf(),
            date: date.to_string(),
            nrows,
            window: *self.config.window(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ClassifierInput, NO_FRONT};
    use crate::config::DetectionConfigBuilder;
    use crate::errors::ClassifyError;
    use crate::geometry::{AoiIndex, Window};
    use crate::reader::CsvGranuleReader;
    use crate::writer::read_records;
    use ndarray::Array1;
    use std::fs;

    struct Flat;

    impl FrontClassifier for Flat {
        fn name(&self) -> &str {
            "flat"
        }

        fn classify(&self, input: &ClassifierInput<'_>) -> Result<Array1<i32>, ClassifyError> {
            Ok(input.values().mapv(|v| {
                if v == input.sentinel() {
                    input.code_sentinel()
                } else {
                    NO_FRONT
                }
            }))
        }
    }

    fn write_granule(dir: &Path, name: &str, date: &str, nrows: usize, bins: &[usize]) {
        let mut content = String::from("date,nrows,bin,weighted_sum,weight\n");
        for bin in bins {
            content.push_str(&format!("{},{},{},{},1.0\n", date, nrows, bin, *bin as f64 * 0.5));
        }
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_batch_run_isolates_failures_and_skips_existing() {
        crate::_setup_pretty_env_logger_default();
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let window = Window::new(-30.0, 30.0, -60.0, 60.0).unwrap();
        let config = DetectionConfigBuilder::default()
            .nrows(36)
            .window(window)
            .build()
            .unwrap();
        let aoi = AoiIndex::build(36, &window).unwrap();
        let bins: Vec<usize> = aoi.bins().iter().step_by(3).cloned().collect();

        write_granule(input.path(), "a.csv", "2020-06-01", 36, &bins);
        write_granule(input.path(), "b.csv", "2020-06-02", 72, &[1, 2, 3]);
        // bin beyond the scheme
        write_granule(input.path(), "c.csv", "2020-06-03", 36, &[aoi.total_bins() + 5]);
        fs::write(input.path().join("notes.txt"), "not a granule").unwrap();

        let reader = CsvGranuleReader::new();
        let driver = BatchDriver::new(&config, &Flat, &reader).threads(2);
        assert_eq!(driver.discover(input.path()).unwrap().len(), 3);

        let report = driver.run(input.path(), output.path()).unwrap();
        assert_eq!(report.written.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_success());
        let failure = &report.failed[0];
        assert_eq!(failure.date, "2020-06-03");
        assert_eq!(failure.nrows, Some(36));
        assert!(failure.path.ends_with("c.csv"));
        // one layout per scheme
        assert_eq!(driver.cache().len(), 2);

        let first = report
            .written
            .iter()
            .find(|p| p.to_string_lossy().contains("2020-06-01"))
            .unwrap();
        assert_eq!(read_records(first).unwrap().len(), bins.len());

        let again = driver.run(input.path(), output.path()).unwrap();
        assert_eq!(again.written.len(), 0);
        assert_eq!(again.skipped.len(), 2);
        assert_eq!(again.failed.len(), 1);
        assert_eq!(again.total(), 3);
    }

    #[test]
    fn test_unreadable_granule_is_reported() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("bad.csv"), "date,bin\n2020-01-01,1\n").unwrap();
        let config = DetectionConfigBuilder::default().nrows(36).build().unwrap();
        let reader = CsvGranuleReader::new();
        let report = BatchDriver::new(&config, &Flat, &reader)
            .run(input.path(), output.path())
            .unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0].source, GranuleFailure::Read(_)));
        assert_eq!(report.failed[0].date, "unknown");
        assert_eq!(report.failed[0].nrows, None);
        assert!(report.failed[0].to_string().contains("nrows=unknown"));
    }
}
