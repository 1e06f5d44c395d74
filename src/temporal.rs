// binfronts/src/temporal.rs

use crate::align::{align, AlignOptions, DenseGrid};
use crate::assemble::FrontRecord;
use crate::batch::discover_granules;
use crate::config::DetectionConfig;
use crate::errors::TemporalError;
use crate::geometry::AoiIndex;
use crate::reader::GranuleReader;
use crate::writer::{month_day, read_records, year_month, OutputId};
use humantime::format_duration;
use log::{debug, info};
use ndarray::{Array1, Zip};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Outputs a bin must appear in before its frequency is reported.
pub const DEFAULT_MIN_COUNT: u32 = 18;

/// Selects dated outputs by year and month. An empty list selects every
/// year or every month.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateFilter {
    pub years: Vec<u32>,
    pub months: Vec<u32>,
}

impl DateFilter {
    pub fn new(years: Vec<u32>, months: Vec<u32>) -> Self {
        Self { years, months }
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty() && self.months.is_empty()
    }

    pub fn accepts(&self, date: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        let selected = |list: &[u32], value: &str| {
            list.is_empty() || value.parse::<u32>().map_or(false, |value| list.contains(&value))
        };
        match year_month(date) {
            Some((year, month)) => selected(&self.years, year) && selected(&self.months, month),
            None => false,
        }
    }

    /// Year of an output dated `date`, when the output is selected.
    fn year_of<'a>(&self, date: Option<&'a str>) -> Option<&'a str> {
        let date = date?;
        if !self.accepts(date) {
            return None;
        }
        year_month(date).map(|(year, _)| year)
    }
}

fn csv_files(dir: &Path) -> Result<Vec<PathBuf>, TemporalError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.path().extension().map_or(false, |ext| ext == "csv") {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

fn cell_slot<C>(
    index: &mut HashMap<(u64, u64), usize>,
    cells: &mut Vec<C>,
    lat: f64,
    lon: f64,
    cell: impl FnOnce() -> C,
) -> usize {
    *index.entry((lat.to_bits(), lon.to_bits())).or_insert_with(|| {
        cells.push(cell());
        cells.len() - 1
    })
}

fn by_location<C, F: Fn(&C) -> (f64, f64)>(cells: &[C], location: F) -> Vec<C>
where
    C: Clone,
{
    let mut cells = cells.to_vec();
    cells.sort_by(|a, b| {
        let (a, b) = (location(a), location(b));
        a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1))
    });
    cells
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyCell {
    pub lat: f64,
    pub lon: f64,
    pub count: u32,
    pub fronts: i64,
}

impl FrequencyCell {
    pub fn frequency(&self) -> f64 {
        self.fronts as f64 / self.count as f64
    }
}

/// Per-location front frequency over a set of granule outputs.
#[derive(Debug, Clone)]
pub struct FrontFrequency {
    min_count: u32,
    outputs: usize,
    index: HashMap<(u64, u64), usize>,
    cells: Vec<FrequencyCell>,
}

impl FrontFrequency {
    pub fn new(min_count: u32) -> Self {
        Self {
            min_count,
            outputs: 0,
            index: HashMap::new(),
            cells: Vec::new(),
        }
    }

    pub fn min_count(&self) -> u32 {
        self.min_count
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn add_records(&mut self, records: &[FrontRecord]) {
        self.outputs += 1;
        for record in records {
            let slot = cell_slot(&mut self.index, &mut self.cells, record.lat, record.lon, || FrequencyCell {
                lat: record.lat,
                lon: record.lon,
                count: 0,
                fronts: 0,
            });
            let cell = &mut self.cells[slot];
            cell.count += 1;
            cell.fronts += record.value as i64;
        }
    }

    /// Adds every output below `dir` whose date passes `filter`.
    pub fn add_dir(&mut self, dir: &Path, filter: &DateFilter) -> Result<usize, TemporalError> {
        let start = Instant::now();
        let mut added = 0;
        for path in csv_files(dir)? {
            let records = read_records(&path)?;
            let date = records.first().map(|record| record.date.as_str());
            if !filter.is_empty() && !date.map_or(false, |date| filter.accepts(date)) {
                debug!("Skipping {} outside of {:?}", path.display(), filter);
                continue;
            }
            self.add_records(&records);
            added += 1;
        }
        info!(
            "Added {} outputs from {} in {}",
            added,
            dir.display(),
            format_duration(start.elapsed())
        );
        Ok(added)
    }

    /// Cells seen in at least `min_count` outputs, in (lat, lon) order.
    pub fn cells(&self) -> Vec<FrequencyCell> {
        let kept: Vec<FrequencyCell> = self
            .cells
            .iter()
            .filter(|cell| cell.count >= self.min_count)
            .cloned()
            .collect();
        by_location(&kept, |cell| (cell.lat, cell.lon))
    }

    /// Writes `Latitude,Longitude,Data,Count,Freq` rows; returns the row count.
    pub fn write(&self, path: &Path) -> Result<usize, TemporalError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let cells = self.cells();
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["Latitude", "Longitude", "Data", "Count", "Freq"])?;
        for cell in &cells {
            writer.write_record([
                cell.lat.to_string(),
                cell.lon.to_string(),
                cell.fronts.to_string(),
                cell.count.to_string(),
                cell.frequency().to_string(),
            ])?;
        }
        writer.flush()?;
        info!("Wrote {} frequency cells to {}", cells.len(), path.display());
        Ok(cells.len())
    }
}

impl Default for FrontFrequency {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_COUNT)
    }
}

/// One frequency table per year of the outputs below `input_dir`, written
/// to `<output_dir>/<year>.csv`. Only outputs passing `filter` are used.
pub fn frequency_per_year(
    input_dir: &Path,
    output_dir: &Path,
    min_count: u32,
    filter: &DateFilter,
) -> Result<Vec<PathBuf>, TemporalError> {
    let start = Instant::now();
    let mut years: BTreeMap<String, FrontFrequency> = BTreeMap::new();
    for path in csv_files(input_dir)? {
        let records = read_records(&path)?;
        match filter.year_of(records.first().map(|record| record.date.as_str())) {
            Some(year) => years
                .entry(year.to_string())
                .or_insert_with(|| FrontFrequency::new(min_count))
                .add_records(&records),
            None => debug!("Skipping {}", path.display()),
        }
    }
    let mut written = Vec::with_capacity(years.len());
    for (year, frequency) in &years {
        let path = output_dir.join(format!("{}.csv", year));
        frequency.write(&path)?;
        written.push(path);
    }
    info!(
        "Wrote {} yearly frequency tables in {}",
        written.len(),
        format_duration(start.elapsed())
    );
    Ok(written)
}

/// Departure of a bin value from the mean of its calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRecord {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
    pub date: String,
}

#[derive(Debug, Clone)]
pub struct AnomalyAccumulator {
    sums: Array1<f64>,
    counts: Array1<u32>,
    granules: usize,
}

impl AnomalyAccumulator {
    pub fn new(len: usize) -> Self {
        Self {
            sums: Array1::zeros(len),
            counts: Array1::zeros(len),
            granules: 0,
        }
    }

    pub fn granules(&self) -> usize {
        self.granules
    }

    fn check_len(&self, grid: &DenseGrid) -> Result<(), TemporalError> {
        if grid.len() != self.sums.len() {
            return Err(TemporalError::LengthMismatch {
                expected: self.sums.len(),
                found: grid.len(),
            });
        }
        Ok(())
    }

    pub fn add(&mut self, grid: &DenseGrid) -> Result<(), TemporalError> {
        self.check_len(grid)?;
        let sentinel = grid.sentinel();
        Zip::from(&mut self.sums)
            .and(&mut self.counts)
            .and(grid.values())
            .for_each(|sum, count, &value| {
                if value != sentinel {
                    *sum += value;
                    *count += 1;
                }
            });
        self.granules += 1;
        Ok(())
    }

    /// Per-bin mean, `None` where no granule had data.
    pub fn mean(&self) -> Array1<Option<f64>> {
        Zip::from(&self.sums)
            .and(&self.counts)
            .map_collect(|&sum, &count| (count > 0).then(|| sum / count as f64))
    }

    pub fn anomalies(
        &self,
        aoi: &AoiIndex,
        grid: &DenseGrid,
        date: &str,
    ) -> Result<Vec<AnomalyRecord>, TemporalError> {
        self.check_len(grid)?;
        let mean = self.mean();
        let values = grid.values();
        Ok(aoi
            .iter()
            .filter(|entry| !grid.is_missing(entry.local))
            .filter_map(|entry| {
                mean[entry.local].map(|mean| AnomalyRecord {
                    lat: entry.lat,
                    lon: entry.lon,
                    value: values[entry.local] - mean,
                    date: date.to_string(),
                })
            })
            .collect())
    }
}

pub fn write_anomalies(path: &Path, records: &[AnomalyRecord]) -> Result<(), TemporalError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Latitude", "Longitude", "Data", "Date"])?;
    for record in records {
        writer.write_record([
            record.lat.to_string(),
            record.lon.to_string(),
            record.value.to_string(),
            record.date.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a file written by [`write_anomalies`].
pub fn read_anomalies(path: &Path) -> Result<Vec<AnomalyRecord>, TemporalError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let parse = |index: usize, field: &str| -> Result<f64, TemporalError> {
            let value = row.get(index).unwrap_or("");
            value.parse().map_err(|_| TemporalError::ParseError {
                path: path.to_path_buf(),
                line: row.position().map_or(0, |p| p.line()),
                field: field.to_string(),
                value: value.to_string(),
            })
        };
        records.push(AnomalyRecord {
            lat: parse(0, "Latitude")?,
            lon: parse(1, "Longitude")?,
            value: parse(2, "Data")?,
            date: row.get(3).unwrap_or("").to_string(),
        });
    }
    Ok(records)
}

/// Writes one anomaly file per granule below `output_dir`.
///
/// The mean of a bin is taken over the granules sharing the calendar day
/// (month and day) of the granule, across all years. Granules are read once
/// to find their day, then twice per day, so no more than one grid is held
/// at a time.
pub fn run_anomaly(
    input_dir: &Path,
    output_dir: &Path,
    config: &DetectionConfig,
    reader: &dyn GranuleReader,
) -> Result<Vec<PathBuf>, TemporalError> {
    let start = Instant::now();
    let paths = discover_granules(reader, input_dir)?;
    if paths.is_empty() {
        return Err(TemporalError::NoInput(input_dir.to_path_buf()));
    }
    let aoi = AoiIndex::build(config.nrows(), config.window())?;
    // anomalies are taken on physical values
    let options = AlignOptions {
        quantization: None,
        ..config.align_options()
    };
    let load = |path: &Path| -> Result<(String, DenseGrid), TemporalError> {
        let granule = reader.read(path)?;
        if granule.nrows != aoi.nrows() {
            return Err(TemporalError::SchemeMismatch {
                path: path.to_path_buf(),
                granule: granule.nrows,
                expected: aoi.nrows(),
            });
        }
        let grid = align(&aoi, &granule.observations, &options)?;
        Ok((granule.date, grid))
    };

    let mut days: BTreeMap<String, Vec<&Path>> = BTreeMap::new();
    for path in &paths {
        let granule = reader.read(path)?;
        let (month, day) = month_day(&granule.date).ok_or_else(|| TemporalError::Undated {
            path: path.clone(),
            date: granule.date.clone(),
        })?;
        days.entry(format!("{}-{}", month, day))
            .or_default()
            .push(path.as_path());
    }
    info!("{} granules on {} calendar days", paths.len(), days.len());

    let sensor = format!("{}anom", config.sensor());
    let tag = config.window_tag();
    let mut written = Vec::with_capacity(paths.len());
    for (day, group) in &days {
        let mut accumulator = AnomalyAccumulator::new(aoi.len());
        for &path in group {
            let (_, grid) = load(path)?;
            accumulator.add(&grid)?;
        }
        debug!("{}: mean over {} granules", day, accumulator.granules());

        for &path in group {
            let (date, grid) = load(path)?;
            let records = accumulator.anomalies(&aoi, &grid, &date)?;
            let out = output_dir.join(OutputId::new(&date, &sensor, &tag).relative_path());
            write_anomalies(&out, &records)?;
            debug!("Wrote {} anomalies to {}", records.len(), out.display());
            written.push(out);
        }
    }
    info!(
        "Wrote {} anomaly files in {}",
        written.len(),
        format_duration(start.elapsed())
    );
    Ok(written)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanCell {
    pub lat: f64,
    pub lon: f64,
    pub sum: f64,
    pub count: u32,
}

impl MeanCell {
    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Per-location mean anomaly over a set of anomaly files.
#[derive(Debug, Clone, Default)]
pub struct AnomalyMean {
    files: usize,
    index: HashMap<(u64, u64), usize>,
    cells: Vec<MeanCell>,
}

impl AnomalyMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> usize {
        self.files
    }

    pub fn add_records(&mut self, records: &[AnomalyRecord]) {
        self.files += 1;
        for record in records {
            let slot = cell_slot(&mut self.index, &mut self.cells, record.lat, record.lon, || MeanCell {
                lat: record.lat,
                lon: record.lon,
                sum: 0.0,
                count: 0,
            });
            let cell = &mut self.cells[slot];
            cell.sum += record.value;
            cell.count += 1;
        }
    }

    /// Every location seen, in (lat, lon) order.
    pub fn cells(&self) -> Vec<MeanCell> {
        by_location(&self.cells, |cell| (cell.lat, cell.lon))
    }

    /// Writes `Latitude,Longitude,Data` rows; returns the row count.
    pub fn write(&self, path: &Path) -> Result<usize, TemporalError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let cells = self.cells();
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["Latitude", "Longitude", "Data"])?;
        for cell in &cells {
            writer.write_record([cell.lat.to_string(), cell.lon.to_string(), cell.mean().to_string()])?;
        }
        writer.flush()?;
        info!("Wrote {} mean anomalies to {}", cells.len(), path.display());
        Ok(cells.len())
    }
}

/// Mean anomaly per location and year over the anomaly files below
/// `input_dir`, written to `<output_dir>/<year>.csv`.
pub fn annual_anomalies(
    input_dir: &Path,
    output_dir: &Path,
    filter: &DateFilter,
) -> Result<Vec<PathBuf>, TemporalError> {
    let start = Instant::now();
    let mut years: BTreeMap<String, AnomalyMean> = BTreeMap::new();
    for path in csv_files(input_dir)? {
        let records = read_anomalies(&path)?;
        match filter.year_of(records.first().map(|record| record.date.as_str())) {
            Some(year) => years.entry(year.to_string()).or_default().add_records(&records),
            None => debug!("Skipping {}", path.display()),
        }
    }
    let mut written = Vec::with_capacity(years.len());
    for (year, mean) in &years {
        let path = output_dir.join(format!("{}.csv", year));
        mean.write(&path)?;
        debug!("{}: {} anomaly files", year, mean.files());
        written.push(path);
    }
    info!(
        "Wrote {} annual anomaly tables in {}",
        written.len(),
        format_duration(start.elapsed())
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::Observation;
    use crate::config::DetectionConfigBuilder;
    use crate::geometry::Window;
    use crate::reader::CsvGranuleReader;
    use crate::writer::{CsvRecordWriter, OutputId};

    fn record(lat: f64, lon: f64, value: i32, date: &str) -> FrontRecord {
        FrontRecord {
            lat,
            lon,
            value,
            date: date.to_string(),
        }
    }

    fn anomaly(lat: f64, lon: f64, value: f64, date: &str) -> AnomalyRecord {
        AnomalyRecord {
            lat,
            lon,
            value,
            date: date.to_string(),
        }
    }

    fn write_granule(dir: &Path, name: &str, date: &str, bin: usize, value: f64) {
        fs::write(
            dir.join(name),
            format!("date,nrows,bin,weighted_sum,weight\n{},18,{},{},1\n", date, bin, value),
        )
        .unwrap();
    }

    fn anomaly_config(window: Window) -> DetectionConfig {
        DetectionConfigBuilder::default()
            .nrows(18)
            .window(window)
            .build()
            .unwrap()
    }

    #[test]
    fn test_date_filter() {
        assert!(DateFilter::default().accepts("undated"));
        let filter = DateFilter::new(vec![2010], vec![6, 7]);
        assert!(filter.accepts("2010-06-01"));
        assert!(filter.accepts("20100715"));
        assert!(!filter.accepts("2011-06-01"));
        assert!(!filter.accepts("2010-12-01"));
        assert!(!filter.accepts("undated"));
        assert_eq!(filter.year_of(Some("2010-07-02")), Some("2010"));
        assert_eq!(filter.year_of(None), None);
    }

    #[test]
    fn test_frequency_counts_and_threshold() {
        let mut frequency = FrontFrequency::new(2);
        frequency.add_records(&[record(1.0, 2.0, 1, "d1"), record(1.0, 3.0, 0, "d1")]);
        frequency.add_records(&[record(1.0, 2.0, 0, "d2"), record(-1.0, 3.0, 1, "d2")]);
        frequency.add_records(&[record(1.0, 2.0, 1, "d3"), record(1.0, 3.0, 1, "d3")]);
        assert_eq!(frequency.outputs(), 3);

        let cells = frequency.cells();
        // (-1, 3) was seen once
        assert_eq!(cells.len(), 2);
        assert_eq!((cells[0].lat, cells[0].lon), (1.0, 2.0));
        assert_eq!(cells[0].count, 3);
        assert_eq!(cells[0].fronts, 2);
        assert!((cells[0].frequency() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!((cells[1].count, cells[1].fronts), (2, 1));
        assert_eq!(FrontFrequency::default().min_count(), 18);
    }

    #[test]
    fn test_frequency_from_directory_with_month_filter() {
        let outputs = tempfile::tempdir().unwrap();
        let writer = CsvRecordWriter::new(outputs.path());
        for date in ["2010-06-01", "2010-06-02", "2010-12-01"] {
            let records = vec![record(10.5, -20.25, 1, date), record(10.5, -19.75, 0, date)];
            writer.write(&OutputId::new(date, "sst", "tag"), &records).unwrap();
        }

        let mut frequency = FrontFrequency::new(1);
        let filter = DateFilter::new(Vec::new(), vec![6, 7]);
        assert_eq!(frequency.add_dir(outputs.path(), &filter).unwrap(), 2);
        let cells = frequency.cells();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].count, 2);
        assert_eq!(cells[0].frequency(), 1.0);
        assert_eq!(cells[1].frequency(), 0.0);

        let path = outputs.path().join("freq").join("2010.csv");
        assert_eq!(frequency.write(&path).unwrap(), 2);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Latitude,Longitude,Data,Count,Freq\n10.5,-20.25,2,2,1\n"));
    }

    #[test]
    fn test_frequency_is_kept_apart_per_year() {
        let outputs = tempfile::tempdir().unwrap();
        let writer = CsvRecordWriter::new(outputs.path());
        for (date, value) in [("2010-06-01", 1), ("2010-07-01", 1), ("2011-06-01", 0), ("2011-12-01", 1)] {
            writer
                .write(&OutputId::new(date, "sst", "tag"), &[record(10.5, -20.25, value, date)])
                .unwrap();
        }

        let mut only_2011 = FrontFrequency::new(1);
        assert_eq!(only_2011.add_dir(outputs.path(), &DateFilter::new(vec![2011], Vec::new())).unwrap(), 2);
        assert_eq!(only_2011.cells()[0].count, 2);
        assert_eq!(only_2011.cells()[0].fronts, 1);

        let tables = outputs.path().join("freq");
        let filter = DateFilter::new(Vec::new(), vec![6, 7, 8, 9, 10, 11]);
        let written = frequency_per_year(outputs.path(), &tables, 1, &filter).unwrap();
        assert_eq!(written, vec![tables.join("2010.csv"), tables.join("2011.csv")]);
        let content = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(content.lines().nth(1), Some("10.5,-20.25,2,2,1"));
        // December of 2011 is outside of the months
        let content = fs::read_to_string(&written[1]).unwrap();
        assert_eq!(content.lines().nth(1), Some("10.5,-20.25,0,1,0"));
    }

    #[test]
    fn test_anomaly_accumulator() {
        let aoi = AoiIndex::build(18, &Window::new(-20.0, 20.0, -30.0, 30.0).unwrap()).unwrap();
        let bins = aoi.bins();
        let options = AlignOptions::default();
        let first = align(
            &aoi,
            &[Observation::new(bins[0], 10.0, 1.0), Observation::new(bins[1], 4.0, 1.0)],
            &options,
        )
        .unwrap();
        let second = align(&aoi, &[Observation::new(bins[0], 14.0, 1.0)], &options).unwrap();

        let mut accumulator = AnomalyAccumulator::new(aoi.len());
        accumulator.add(&first).unwrap();
        accumulator.add(&second).unwrap();
        let mean = accumulator.mean();
        assert_eq!(mean[0], Some(12.0));
        assert_eq!(mean[1], Some(4.0));
        assert_eq!(mean[2], None);

        let anomalies = accumulator.anomalies(&aoi, &first, "d1").unwrap();
        assert_eq!(anomalies.len(), 2);
        assert_eq!(anomalies[0].value, -2.0);
        assert_eq!(anomalies[1].value, 0.0);
        assert_eq!(anomalies[0].lon, aoi.lons()[0]);

        let mut other = AnomalyAccumulator::new(aoi.len() + 1);
        assert!(matches!(
            other.add(&first),
            Err(TemporalError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_run_anomaly() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let window = Window::new(-20.0, 20.0, -30.0, 30.0).unwrap();
        let config = anomaly_config(window);
        let aoi = AoiIndex::build(18, &window).unwrap();
        let bin = aoi.bins()[0];
        write_granule(input.path(), "a.csv", "2003-09-18", bin, 20.0);
        write_granule(input.path(), "b.csv", "2004-09-18", bin, 22.0);
        let written = run_anomaly(input.path(), output.path(), &config, &CsvGranuleReader::new()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("2003-09/2003-09-18_sstanom_20S20N_30W30E.csv"));
        let content = fs::read_to_string(&written[1]).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(",1,2004-09-18"));

        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(
            run_anomaly(empty.path(), output.path(), &config, &CsvGranuleReader::new()),
            Err(TemporalError::NoInput(_))
        ));
    }

    #[test]
    fn test_anomaly_mean_is_per_calendar_day() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let window = Window::new(-20.0, 20.0, -30.0, 30.0).unwrap();
        let config = anomaly_config(window);
        let bin = AoiIndex::build(18, &window).unwrap().bins()[0];
        write_granule(input.path(), "a.csv", "2003-06-01", bin, 10.0);
        write_granule(input.path(), "b.csv", "2003-09-18", bin, 30.0);
        write_granule(input.path(), "c.csv", "2004-06-01", bin, 12.0);

        let reader = CsvGranuleReader::new();
        let written = run_anomaly(input.path(), output.path(), &config, &reader).unwrap();
        assert_eq!(written.len(), 3);
        let anomaly_of = |date: &str| -> f64 {
            let path = written
                .iter()
                .find(|path| path.to_string_lossy().contains(date))
                .unwrap();
            read_anomalies(path).unwrap()[0].value
        };
        // June 1st is compared with June 1st only
        assert_eq!(anomaly_of("2003-06-01"), -1.0);
        assert_eq!(anomaly_of("2004-06-01"), 1.0);
        assert_eq!(anomaly_of("2003-09-18"), 0.0);

        write_granule(input.path(), "d.csv", "2003-06", bin, 1.0);
        assert!(matches!(
            run_anomaly(input.path(), output.path(), &config, &reader),
            Err(TemporalError::Undated { .. })
        ));
    }

    #[test]
    fn test_annual_anomalies() {
        let anomalies = tempfile::tempdir().unwrap();
        let dir = anomalies.path();
        write_anomalies(
            &dir.join("2003-06/a.csv"),
            &[anomaly(10.5, -20.25, 1.0, "2003-06-01"), anomaly(10.5, -19.75, -2.0, "2003-06-01")],
        )
        .unwrap();
        write_anomalies(&dir.join("2003-07/b.csv"), &[anomaly(10.5, -20.25, 3.0, "2003-07-01")]).unwrap();
        write_anomalies(&dir.join("2003-12/c.csv"), &[anomaly(10.5, -20.25, 50.0, "2003-12-01")]).unwrap();
        write_anomalies(&dir.join("2004-06/d.csv"), &[anomaly(10.5, -20.25, -4.0, "2004-06-01")]).unwrap();
        assert_eq!(read_anomalies(&dir.join("2003-07/b.csv")).unwrap()[0].value, 3.0);

        let output = tempfile::tempdir().unwrap();
        let filter = DateFilter::new(vec![2003], vec![6, 7, 8, 9, 10, 11]);
        let written = annual_anomalies(dir, output.path(), &filter).unwrap();
        assert_eq!(written, vec![output.path().join("2003.csv")]);
        let content = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(content, "Latitude,Longitude,Data\n10.5,-20.25,2\n10.5,-19.75,-2\n");

        let mut mean = AnomalyMean::new();
        mean.add_records(&[anomaly(1.0, 2.0, 1.0, "d1")]);
        mean.add_records(&[anomaly(1.0, 2.0, 2.0, "d2")]);
        assert_eq!(mean.files(), 2);
        assert_eq!(mean.cells()[0].mean(), 1.5);
    }
}
