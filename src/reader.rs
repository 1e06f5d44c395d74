// binfronts/src/reader.rs

use crate::align::Observation;
use crate::errors::ReaderError;
use humantime::format_duration;
use log::debug;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct Granule {
    pub date: String,
    pub nrows: usize,
    pub observations: Vec<Observation>,
    pub source: PathBuf,
}

/// Decodes granule files into sparse observation lists.
pub trait GranuleReader: Send + Sync {
    /// Whether `path` looks like a granule this reader understands.
    fn accepts(&self, path: &Path) -> bool;

    fn read(&self, path: &Path) -> Result<Granule, ReaderError>;
}

/// Granules stored as CSV with the header `date,nrows,bin,weighted_sum,weight`.
///
/// Column order is free. Every line must carry the same date and nrows.
#[derive(Debug, Clone, Default)]
pub struct CsvGranuleReader;

const COLUMNS: [&str; 5] = ["date", "nrows", "bin", "weighted_sum", "weight"];

impl CsvGranuleReader {
    pub fn new() -> Self {
        Self
    }
}

fn parse_field<T: FromStr>(record: &csv::StringRecord, column: usize, field: &str) -> Result<T, ReaderError> {
    let value = record.get(column).unwrap_or("").trim();
    value.parse::<T>().map_err(|_| ReaderError::ParseError {
        line: record.position().map_or(0, |p| p.line()),
        field: field.to_string(),
        value: value.to_string(),
    })
}

impl GranuleReader for CsvGranuleReader {
    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
    }

    fn read(&self, path: &Path) -> Result<Granule, ReaderError> {
        let start = Instant::now();
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let headers = reader.headers()?.clone();
        let mut columns = [0usize; 5];
        for (slot, name) in columns.iter_mut().zip(COLUMNS) {
            *slot = headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| ReaderError::MissingColumn(name.to_string()))?;
        }
        let [date_col, nrows_col, bin_col, sum_col, weight_col] = columns;

        let mut date: Option<String> = None;
        let mut nrows: Option<usize> = None;
        let mut observations = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());

            let record_date = record.get(date_col).unwrap_or("").trim();
            if date.get_or_insert_with(|| record_date.to_string()) != record_date {
                return Err(ReaderError::Inconsistent {
                    line,
                    field: "date".to_string(),
                });
            }
            let record_nrows: usize = parse_field(&record, nrows_col, "nrows")?;
            if *nrows.get_or_insert(record_nrows) != record_nrows {
                return Err(ReaderError::Inconsistent {
                    line,
                    field: "nrows".to_string(),
                });
            }
            observations.push(Observation::new(
                parse_field(&record, bin_col, "bin")?,
                parse_field(&record, sum_col, "weighted_sum")?,
                parse_field(&record, weight_col, "weight")?,
            ));
        }

        let (date, nrows) = match (date, nrows) {
            (Some(date), Some(nrows)) => (date, nrows),
            _ => return Err(ReaderError::Empty(path.to_path_buf())),
        };
        debug!(
            "Read {} observations for {} from {} in {}",
            observations.len(),
            date,
            path.display(),
            format_duration(start.elapsed())
        );
        Ok(Granule {
            date,
            nrows,
            observations,
            source: path.to_path_buf(),
        })
    }
}
