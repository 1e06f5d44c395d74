// binfronts/src/writer.rs

use crate::assemble::FrontRecord;
use crate::errors::WriterError;
use log::{debug, info};
use std::collections::HashSet;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const RECORD_HEADER: [&str; 4] = ["Latitude", "Longitude", "Data", "Date"];

/// Identity of a granule output, unique per (date, sensor, window).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputId {
    pub date: String,
    pub sensor: String,
    pub window_tag: String,
}

impl OutputId {
    pub fn new(date: &str, sensor: &str, window_tag: &str) -> Self {
        Self {
            date: date.to_string(),
            sensor: sensor.to_string(),
            window_tag: window_tag.to_string(),
        }
    }

    /// `<date>_<sensor>_<window-tag>.csv`, with the date reduced to
    /// characters that are safe in a file name.
    pub fn file_name(&self) -> String {
        let date: String = self
            .date
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("{}_{}_{}.csv", date, self.sensor, self.window_tag)
    }

    /// `YYYY-MM` of the date, `undated` when it has none.
    pub fn month_dir(&self) -> String {
        match year_month(&self.date) {
            Some((year, month)) => format!("{}-{}", year, month),
            None => "undated".to_string(),
        }
    }

    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.month_dir()).join(self.file_name())
    }
}

fn digits(date: &str, range: Range<usize>) -> bool {
    date.as_bytes()
        .get(range)
        .map_or(false, |b| b.iter().all(u8::is_ascii_digit))
}

fn dashed(date: &str) -> bool {
    digits(date, 0..4) && date.as_bytes().get(4) == Some(&b'-')
}

/// Year and month of a date written `YYYY-MM...` or `YYYYMM...`.
pub fn year_month(date: &str) -> Option<(&str, &str)> {
    if dashed(date) && digits(date, 5..7) {
        Some((&date[..4], &date[5..7]))
    } else if digits(date, 0..6) {
        Some((&date[..4], &date[4..6]))
    } else {
        None
    }
}

/// Month and day of a date written `YYYY-MM-DD...` or `YYYYMMDD...`.
pub fn month_day(date: &str) -> Option<(&str, &str)> {
    if dashed(date) && digits(date, 5..7) && date.as_bytes().get(7) == Some(&b'-') && digits(date, 8..10) {
        Some((&date[5..7], &date[8..10]))
    } else if digits(date, 0..8) {
        Some((&date[4..6], &date[6..8]))
    } else {
        None
    }
}

/// File names of every CSV output below `root`; a missing root is empty.
pub fn existing_outputs(root: &Path) -> Result<HashSet<String>, WriterError> {
    let mut names = HashSet::new();
    if !root.exists() {
        return Ok(names);
    }
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "csv") {
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                names.insert(name.to_string());
            }
        }
    }
    debug!("Found {} existing outputs below {}", names.len(), root.display());
    Ok(names)
}

/// Writes granule outputs below a root directory.
#[derive(Debug, Clone)]
pub struct CsvRecordWriter {
    root: PathBuf,
}

impl CsvRecordWriter {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &OutputId) -> PathBuf {
        self.root.join(id.relative_path())
    }

    /// Writes `records` under the path of `id` and returns that path.
    ///
    /// The file only appears under its final name once complete, so an
    /// interrupted run never leaves an output that would be skipped later.
    pub fn write(&self, id: &OutputId, records: &[FrontRecord]) -> Result<PathBuf, WriterError> {
        let path = self.path_for(id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let partial = path.with_extension("csv.partial");
        {
            let mut writer = csv::Writer::from_path(&partial)?;
            writer.write_record(RECORD_HEADER)?;
            for record in records {
                writer.write_record([
                    record.lat.to_string(),
                    record.lon.to_string(),
                    record.value.to_string(),
                    record.date.clone(),
                ])?;
            }
            writer.flush()?;
        }
        fs::rename(&partial, &path)?;
        info!("Wrote {} records to {}", records.len(), path.display());
        Ok(path)
    }
}

/// Reads a file written by [`CsvRecordWriter::write`].
pub fn read_records(path: &Path) -> Result<Vec<FrontRecord>, WriterError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map_or(0, |p| p.line());
        let field = |index: usize| row.get(index).unwrap_or("");
        let parse_error = |index: usize| WriterError::ParseError {
            line,
            field: RECORD_HEADER[index].to_string(),
            value: field(index).to_string(),
        };
        records.push(FrontRecord {
            lat: field(0).parse().map_err(|_| parse_error(0))?,
            lon: field(1).parse().map_err(|_| parse_error(1))?,
            value: field(2).parse().map_err(|_| parse_error(2))?,
            date: field(3).to_string(),
        });
    }
    Ok(records)
}
