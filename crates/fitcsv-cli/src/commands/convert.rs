//! `fitcsv convert`: decode FIT files and write their samples as CSV.

use std::io::Write;
use std::path::{Path, PathBuf};

use fitcsv_core::{Sample, decode_file, fill_missing};

use crate::output::{CsvWriter, OutputError, open_output, validate_time_format};
use crate::settings::{self, ConfigSource, Overlay, Settings};

/// Rows gathered from every input, in argument order.
#[derive(Debug, Default)]
pub struct Collected {
    pub rows: Vec<Sample>,
    /// Inputs that could not be decoded.
    pub failed: Vec<PathBuf>,
}

/// Decode each file in its own session. A file that fails is reported and
/// skipped; the others still contribute rows.
pub fn collect(files: &[PathBuf], settings: &Settings) -> Collected {
    let policy = super::resync_policy(settings.strict);
    let mut collected = Collected::default();

    for path in files {
        match decode_file(path, policy) {
            Ok(report) => {
                let decoded = report.samples.len();
                let rows = if settings.fill_missing {
                    fill_missing(&report.samples)
                } else {
                    report.samples
                };
                log::info!(
                    "{}: {decoded} samples, {} rows",
                    path.display(),
                    rows.len()
                );
                collected.rows.extend(rows);
            }
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                collected.failed.push(path.clone());
            }
        }
    }

    collected
}

/// Header plus one row per sample.
pub fn write_csv<W: Write>(
    out: W,
    target: &str,
    settings: &Settings,
    rows: &[Sample],
) -> Result<W, OutputError> {
    let mut csv = CsvWriter::new(out, target, settings.columns(), &settings.time_format)?;
    csv.write_header()?;
    for sample in rows {
        csv.write_sample(sample)?;
    }
    log::debug!("wrote {} rows to {target}", csv.rows());
    csv.finish()
}

fn target_name(path: Option<&Path>) -> String {
    path.map_or_else(|| "<stdout>".to_string(), |p| p.display().to_string())
}

/// Run the convert command.
pub fn run(files: &[PathBuf], source: &ConfigSource, cli: &Overlay) {
    let settings = match settings::resolve(source, cli) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    if settings.verbose {
        crate::enable_verbose_logging();
    }

    // Checked before any file is opened so a bad format never leaves an
    // empty output behind.
    if let Err(e) = validate_time_format(&settings.time_format) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let collected = collect(files, &settings);
    if collected.failed.len() == files.len() {
        eprintln!("Error: no input could be decoded");
        std::process::exit(1);
    }

    let output = settings.output.as_deref();
    let result = open_output(output, settings.force)
        .and_then(|out| write_csv(out, &target_name(output), &settings, &collected.rows));
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    if !collected.failed.is_empty() {
        eprintln!(
            "{} of {} input file(s) failed",
            collected.failed.len(),
            files.len()
        );
        std::process::exit(1);
    }
}
