use anyhow::{anyhow, Context};
use binfronts::batch::BatchDriver;
use binfronts::geometry::{AoiIndex, RowLayout, Window};
use binfronts::reader::CsvGranuleReader;
use binfronts::temporal::{
    annual_anomalies, frequency_per_year, run_anomaly, DateFilter, FrontFrequency, DEFAULT_MIN_COUNT,
};
use binfronts::{DetectionConfig, DetectionConfigBuilder, SubprocessClassifier};
use clap::{Args, Parser, Subcommand};
use log::info;
use pretty_env_logger;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    author,
    about = "Front detection on equal-area sinusoidal level-3 bins",
    long_about = None,
    version = env!("BINFRONTS_VERSION")
)]
struct Cli {
    #[clap(subcommand)]
    mode: Modes,
}

#[derive(Subcommand, Debug)]
enum Modes {
    /// Classify every granule of a directory and write one CSV per granule
    Detect(DetectCliOpts),
    /// Print the bin layout of a scheme and the size of an AOI
    Layout(LayoutCliOpts),
    /// Front frequency per bin over a directory of detect outputs
    Frequency(FrequencyCliOpts),
    /// Per-granule departures from the per-bin mean of the same calendar day
    Anomaly(AnomalyCliOpts),
    /// Mean anomaly per location and year over a directory of anomaly files
    AnnualAnomaly(AnnualAnomalyCliOpts),
}

#[derive(Args, Debug)]
struct WindowOpts {
    #[clap(long, default_value = "-90", allow_hyphen_values = true)]
    min_lat: f64,
    #[clap(long, default_value = "90", allow_hyphen_values = true)]
    max_lat: f64,
    /// Larger than max_lon to cross the antimeridian
    #[clap(long, default_value = "-180", allow_hyphen_values = true)]
    min_lon: f64,
    #[clap(long, default_value = "180", allow_hyphen_values = true)]
    max_lon: f64,
}

impl WindowOpts {
    fn window(&self) -> anyhow::Result<Window> {
        Ok(Window::new(self.min_lat, self.max_lat, self.min_lon, self.max_lon)?)
    }
}

/// Narrower window applied to the records; all four bounds or none.
#[derive(Args, Debug)]
struct OutputWindowOpts {
    #[clap(long, allow_hyphen_values = true)]
    out_min_lat: Option<f64>,
    #[clap(long, allow_hyphen_values = true)]
    out_max_lat: Option<f64>,
    #[clap(long, allow_hyphen_values = true)]
    out_min_lon: Option<f64>,
    #[clap(long, allow_hyphen_values = true)]
    out_max_lon: Option<f64>,
}

impl OutputWindowOpts {
    fn window(&self) -> anyhow::Result<Option<Window>> {
        match (self.out_min_lat, self.out_max_lat, self.out_min_lon, self.out_max_lon) {
            (Some(min_lat), Some(max_lat), Some(min_lon), Some(max_lon)) => {
                Ok(Some(Window::new(min_lat, max_lat, min_lon, max_lon)?))
            }
            (None, None, None, None) => Ok(None),
            _ => Err(anyhow!("the output window needs all four --out-* bounds")),
        }
    }
}

#[derive(Args, Debug)]
struct DetectCliOpts {
    input_dir: PathBuf,
    output_dir: PathBuf,
    /// Front classifier command; receives the grid frame on stdin
    #[clap(long)]
    classifier: String,
    #[clap(long, default_value_t = binfronts::DEFAULT_NROWS)]
    nrows: usize,
    #[command(flatten)]
    window: WindowOpts,
    #[command(flatten)]
    output_window: OutputWindowOpts,
    /// Rescale values onto [0, 255] before classification
    #[clap(long, action)]
    quantize: bool,
    /// Natural log before quantization (chlorophyll)
    #[clap(long, action)]
    log_transform: bool,
    #[clap(long, default_value = "sst")]
    sensor: String,
    #[clap(long, default_value_t = binfronts::DEFAULT_SENTINEL, allow_hyphen_values = true)]
    sentinel: f64,
    /// Worker threads, one per core when omitted
    #[clap(long)]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct LayoutCliOpts {
    nrows: usize,
    #[command(flatten)]
    window: WindowOpts,
    /// Print every row
    #[clap(long, action)]
    rows: bool,
}

#[derive(Args, Debug)]
struct FrequencyCliOpts {
    input_dir: PathBuf,
    /// Output file, or output directory with --per-year
    output: PathBuf,
    #[clap(long, default_value_t = DEFAULT_MIN_COUNT)]
    min_count: u32,
    /// Only use outputs of these years, e.g. "2003,2004"
    #[clap(long, value_delimiter = ',')]
    years: Vec<u32>,
    /// Only use outputs of these months, e.g. "6,7,8"
    #[clap(long, value_delimiter = ',')]
    months: Vec<u32>,
    /// Write one <year>.csv per year into the output directory
    #[clap(long, action)]
    per_year: bool,
}

#[derive(Args, Debug)]
struct AnomalyCliOpts {
    input_dir: PathBuf,
    output_dir: PathBuf,
    #[clap(long, default_value_t = binfronts::DEFAULT_NROWS)]
    nrows: usize,
    #[command(flatten)]
    window: WindowOpts,
    #[clap(long, default_value = "sst")]
    sensor: String,
}

#[derive(Args, Debug)]
struct AnnualAnomalyCliOpts {
    input_dir: PathBuf,
    output_dir: PathBuf,
    #[clap(long, value_delimiter = ',')]
    years: Vec<u32>,
    #[clap(long, value_delimiter = ',', default_values_t = [6u32, 7, 8, 9, 10, 11])]
    months: Vec<u32>,
}

fn detection_config(opts: &DetectCliOpts) -> anyhow::Result<DetectionConfig> {
    let mut builder = DetectionConfigBuilder::default();
    builder
        .nrows(opts.nrows)
        .window(opts.window.window()?)
        .quantize(opts.quantize)
        .log_transform(opts.log_transform)
        .sentinel(opts.sentinel)
        .sensor(opts.sensor.as_str());
    if let Some(output_window) = opts.output_window.window()? {
        builder.output_window(output_window);
    }
    Ok(builder.build()?)
}

fn run_detect(opts: &DetectCliOpts) -> anyhow::Result<()> {
    let config = detection_config(opts).context("Invalid detection settings")?;
    let classifier = SubprocessClassifier::from_command_line(&opts.classifier)?;
    let reader = CsvGranuleReader::new();
    let mut driver = BatchDriver::new(&config, &classifier, &reader);
    if let Some(threads) = opts.threads {
        driver = driver.threads(threads);
    }
    let report = driver
        .run(&opts.input_dir, &opts.output_dir)
        .with_context(|| format!("Batch over {} failed", opts.input_dir.display()))?;
    println!(
        "{} written, {} skipped, {} failed",
        report.written.len(),
        report.skipped.len(),
        report.failed.len()
    );
    if !report.is_success() {
        return Err(anyhow!("{} of {} granules failed", report.failed.len(), report.total()));
    }
    Ok(())
}

fn run_layout(opts: &LayoutCliOpts) -> anyhow::Result<()> {
    let layout = RowLayout::new(opts.nrows)?;
    println!("nrows: {}", layout.nrows());
    println!("total bins: {}", layout.total_bins());
    if opts.rows {
        for (row, spec) in layout.rows().iter().enumerate() {
            println!("{:6} {:12.6} {:8} {:10}", row, spec.lat, spec.nbins, spec.base);
        }
    }
    let window = opts.window.window()?;
    let aoi = AoiIndex::from_layout(&layout, &window)?;
    println!("window {}: {} bins in {} rows", window, aoi.len(), aoi.rows().len());
    Ok(())
}

fn run_frequency(opts: &FrequencyCliOpts) -> anyhow::Result<()> {
    let filter = DateFilter::new(opts.years.clone(), opts.months.clone());
    let context = || format!("Cannot read outputs below {}", opts.input_dir.display());
    if opts.per_year {
        let written = frequency_per_year(&opts.input_dir, &opts.output, opts.min_count, &filter)
            .with_context(context)?;
        println!("{} frequency tables written", written.len());
        return Ok(());
    }
    let mut frequency = FrontFrequency::new(opts.min_count);
    let added = frequency.add_dir(&opts.input_dir, &filter).with_context(context)?;
    let cells = frequency.write(&opts.output)?;
    info!("{} outputs, {} cells", added, cells);
    Ok(())
}

fn run_anomaly_mode(opts: &AnomalyCliOpts) -> anyhow::Result<()> {
    let config = DetectionConfigBuilder::default()
        .nrows(opts.nrows)
        .window(opts.window.window()?)
        .sensor(opts.sensor.as_str())
        .build()
        .context("Invalid anomaly settings")?;
    let written = run_anomaly(&opts.input_dir, &opts.output_dir, &config, &CsvGranuleReader::new())?;
    println!("{} anomaly files written", written.len());
    Ok(())
}

fn run_annual_anomaly(opts: &AnnualAnomalyCliOpts) -> anyhow::Result<()> {
    let filter = DateFilter::new(opts.years.clone(), opts.months.clone());
    let written = annual_anomalies(&opts.input_dir, &opts.output_dir, &filter)
        .with_context(|| format!("Cannot read anomalies below {}", opts.input_dir.display()))?;
    println!("{} annual anomaly tables written", written.len());
    Ok(())
}

fn entrypoint() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    match &cli.mode {
        Modes::Detect(opts) => run_detect(opts),
        Modes::Layout(opts) => run_layout(opts),
        Modes::Frequency(opts) => run_frequency(opts),
        Modes::Anomaly(opts) => run_anomaly_mode(opts),
        Modes::AnnualAnomaly(opts) => run_annual_anomaly(opts),
    }
}

fn main() -> ExitCode {
    match entrypoint() {
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}
