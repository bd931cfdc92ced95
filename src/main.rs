extern crate scop;

use anyhow::anyhow;
use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use scop::batch::{run_batch, write_batch_csv, BatchOptions, DEFAULT_PROGRESS_INTERVAL};
use scop::input::UnitType;
use scop::measurements::MeasurementRecord;
use scop::output::FileOutput;
use scop::run_project;
use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct ScopArgs {
    #[command(subcommand)]
    command: Command,
    #[clap(long, default_value_t = false, help = "Whether to log out spans")]
    log_spans: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate seasonal performance for a single heat pump described in a JSON request
    Calculate {
        #[arg(help = "Path to calculation request in .json format")]
        input_file: String,
    },
    /// Evaluate a set of certificate measurement records and compare against reported values
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
struct BatchArgs {
    #[arg(help = "Path to measurement records in .json format")]
    records_file: String,
    #[arg(long, short, help = "Path to write the comparison in .csv format")]
    output: String,
    #[arg(long, value_enum, default_value_t = UnitTypeArg::Air)]
    unit_type: UnitTypeArg,
    #[arg(
        long,
        value_delimiter = ',',
        help = "Dimension tokens to include, e.g. 4_3_0_0. Defaults to all standard dimensions"
    )]
    dimensions: Vec<String>,
    #[arg(
        long,
        default_value_t = false,
        help = "Include dimensions whose last two digits are not 0_0"
    )]
    include_nonstandard: bool,
    #[arg(long, help = "Only include records of this model type")]
    model_type: Option<String>,
    #[arg(long, help = "Evaluate at most this many records")]
    limit: Option<usize>,
    #[arg(
        long,
        default_value_t = DEFAULT_PROGRESS_INTERVAL,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..),
        help = "Log progress every N records"
    )]
    progress_interval: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum UnitTypeArg {
    Air,
    #[value(name = "water_brine")]
    WaterBrine,
}

impl From<UnitTypeArg> for UnitType {
    fn from(value: UnitTypeArg) -> Self {
        match value {
            UnitTypeArg::Air => UnitType::Air,
            UnitTypeArg::WaterBrine => UnitType::WaterBrine,
        }
    }
}

impl From<&BatchArgs> for BatchOptions {
    fn from(args: &BatchArgs) -> Self {
        Self {
            unit_type: args.unit_type.into(),
            dimensions: args.dimensions.clone(),
            include_nonstandard: args.include_nonstandard,
            model_type: args.model_type.clone(),
            limit: args.limit,
            progress_interval: args.progress_interval,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = ScopArgs::parse();

    // set up basic tracing
    let tracing_subscriber = {
        let mut builder = tracing_subscriber::fmt::fmt().with_max_level(tracing::Level::INFO);

        if args.log_spans {
            builder = builder.with_span_events(FmtSpan::CLOSE);
        }

        builder.finish()
    };
    tracing::subscriber::set_global_default(tracing_subscriber)?;

    match args.command {
        Command::Calculate { input_file } => calculate(&input_file),
        Command::Batch(batch_args) => batch(&batch_args),
    }
}

fn calculate(input_file: &str) -> anyhow::Result<()> {
    let input_path = Path::new(input_file);
    let input_file_stem = input_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow!("Could not read a file name from {input_file}"))?;

    let output_path = input_path.with_file_name(format!("{input_file_stem}__results"));
    fs::create_dir_all(&output_path)?;
    let file_output = FileOutput::new(
        output_path.clone(),
        format!("{input_file_stem}__{{}}.{{}}"),
    );

    run_project(BufReader::new(File::open(input_path)?), &file_output)?;
    info!("results written to {}", output_path.display());

    Ok(())
}

fn batch(args: &BatchArgs) -> anyhow::Result<()> {
    let records: Vec<MeasurementRecord> =
        serde_json::from_reader(BufReader::new(File::open(&args.records_file)?))?;
    let results = run_batch(&records, &args.into());

    if results.rows.is_empty() {
        warn!("No records matched the selected filters; nothing written");
        return Ok(());
    }

    let output_path = PathBuf::from(&args.output);
    if let Some(parent) = output_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_batch_csv(
        &results.rows,
        BufWriter::new(File::create(&output_path)?),
    )?;

    info!(
        "Wrote {} rows to {} (successes={}, failures={})",
        results.rows.len(),
        output_path.display(),
        results.summary.successes,
        results.summary.failures
    );

    Ok(())
}
