//! CLI for fitcsv: turn FIT activity recordings into CSV tables.

mod commands;
mod output;
mod settings;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use settings::{Column, ConfigSource, Overlay};

#[derive(Parser)]
#[command(name = "fitcsv")]
#[command(about = "Decode FIT activity recordings into CSV")]
#[command(version = fitcsv_core::VERSION)]
struct Cli {
    /// Log per-record diagnostics (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode FIT files and write their samples as one CSV table
    Convert {
        /// FIT files, decoded in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        columns: ColumnArgs,

        /// strftime format for the Time column (UTC)
        #[arg(long)]
        time_format: Option<String>,

        /// Output file (default: standard output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing output file
        #[arg(short, long, overrides_with = "no_force")]
        force: bool,

        #[arg(long, overrides_with = "force", hide = true)]
        no_force: bool,

        /// Synthesize a row for every second the device skipped
        #[arg(long, overrides_with = "no_fill_missing")]
        fill_missing: bool,

        /// Only write recorded samples
        #[arg(long, overrides_with = "fill_missing")]
        no_fill_missing: bool,

        /// Fail a file on its first undecodable record instead of resyncing
        #[arg(long)]
        strict: bool,

        /// Read this config file instead of ~/.fitcsvrc
        #[arg(long)]
        config: Option<PathBuf>,

        /// Ignore all config files
        #[arg(long, conflicts_with = "config")]
        no_config: bool,
    },

    /// Dump headers, definitions, and decoded fields of FIT files
    Inspect {
        /// FIT files to dump
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Fail on the first undecodable record instead of resyncing
        #[arg(long)]
        strict: bool,

        /// Print header and statistics as JSON instead of the record dump
        #[arg(long)]
        json: bool,
    },
}

/// `--<column>` / `--no-<column>` toggles. The later flag wins.
#[derive(Args)]
struct ColumnArgs {
    #[arg(long, overrides_with = "no_time", hide = true)]
    time: bool,
    /// Omit the Time column
    #[arg(long, overrides_with = "time")]
    no_time: bool,

    #[arg(long, overrides_with = "no_heart_rate", hide = true)]
    heart_rate: bool,
    /// Omit the Heart-Rate column
    #[arg(long, overrides_with = "heart_rate")]
    no_heart_rate: bool,

    #[arg(long, overrides_with = "no_cadence", hide = true)]
    cadence: bool,
    /// Omit the Cadence column
    #[arg(long, overrides_with = "cadence")]
    no_cadence: bool,

    #[arg(long, overrides_with = "no_speed", hide = true)]
    speed: bool,
    /// Omit the Speed column
    #[arg(long, overrides_with = "speed")]
    no_speed: bool,

    #[arg(long, overrides_with = "no_distance", hide = true)]
    distance: bool,
    /// Omit the Distance column
    #[arg(long, overrides_with = "distance")]
    no_distance: bool,

    #[arg(long, overrides_with = "no_temperature", hide = true)]
    temperature: bool,
    /// Omit the Temperature column
    #[arg(long, overrides_with = "temperature")]
    no_temperature: bool,

    #[arg(long, overrides_with = "no_altitude", hide = true)]
    altitude: bool,
    /// Omit the Altitude column
    #[arg(long, overrides_with = "altitude")]
    no_altitude: bool,
}

impl ColumnArgs {
    fn toggles(&self) -> [(Column, bool, bool); 7] {
        [
            (Column::Time, self.time, self.no_time),
            (Column::HeartRate, self.heart_rate, self.no_heart_rate),
            (Column::Cadence, self.cadence, self.no_cadence),
            (Column::Speed, self.speed, self.no_speed),
            (Column::Distance, self.distance, self.no_distance),
            (Column::Temperature, self.temperature, self.no_temperature),
            (Column::Altitude, self.altitude, self.no_altitude),
        ]
    }
}

/// Turn a `--flag` / `--no-flag` pair into an overlay value.
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// The logger admits debug records so a config-file `verbose` can raise the
/// level later; until then the global max level does the filtering.
fn init_logging(verbose: bool) {
    let from_env = std::env::var_os("RUST_LOG").is_some();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .format_timestamp(None)
        .init();
    if !from_env && !verbose {
        log::set_max_level(log::LevelFilter::Warn);
    }
}

/// Raise logging to debug after startup (config-file `verbose`). Has no
/// effect when RUST_LOG chose the filter.
pub fn enable_verbose_logging() {
    if std::env::var_os("RUST_LOG").is_none() && log::max_level() < log::LevelFilter::Debug {
        log::set_max_level(log::LevelFilter::Debug);
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Convert {
            files,
            columns,
            time_format,
            output,
            force,
            no_force,
            fill_missing,
            no_fill_missing,
            strict,
            config,
            no_config,
        } => {
            let mut overlay = Overlay::default();
            for (column, on, off) in columns.toggles() {
                if let Some(enabled) = flag_pair(on, off) {
                    overlay.set_column(column, enabled);
                }
            }
            overlay.time_format = time_format;
            overlay.output = output;
            overlay.force = flag_pair(force, no_force);
            overlay.fill_missing = flag_pair(fill_missing, no_fill_missing);
            overlay.verbose = cli.verbose.then_some(true);
            overlay.strict = strict.then_some(true);

            let source = match (no_config, config) {
                (true, _) => ConfigSource::Disabled,
                (false, Some(path)) => ConfigSource::Explicit(path),
                (false, None) => ConfigSource::Standard,
            };

            commands::convert::run(&files, &source, &overlay)
        }
        Commands::Inspect {
            files,
            strict,
            json,
        } => commands::inspect::run(&files, strict, json),
    }
}
