//! CSV emission of decoded samples.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use fitcsv_core::Sample;

use crate::settings::Column;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("{} already exists (use --force to overwrite)", path.display())]
    OutputCollision { path: PathBuf },

    #[error("cannot write {target}: {source}")]
    OutputUnwritable {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid time format '{format}'")]
    TimeFormat { format: String },
}

/// Reject strftime strings chrono cannot render.
pub fn validate_time_format(format: &str) -> Result<(), OutputError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(OutputError::TimeFormat {
            format: format.to_string(),
        });
    }
    Ok(())
}

/// Open the output target. With `force` off an existing file is never
/// opened, so it cannot be truncated.
pub fn open_output(path: Option<&Path>, force: bool) -> Result<Box<dyn Write>, OutputError> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    };

    let opened = if force {
        File::create(path)
    } else {
        OpenOptions::new().write(true).create_new(true).open(path)
    };

    match opened {
        Ok(file) => Ok(Box::new(BufWriter::new(file))),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(OutputError::OutputCollision {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(OutputError::OutputUnwritable {
            target: path.display().to_string(),
            source,
        }),
    }
}

/// Thousandths of km/h as `km/h` with three decimals.
pub fn format_speed(speed: i64) -> String {
    let sign = if speed < 0 { "-" } else { "" };
    let abs = speed.unsigned_abs();
    format!("{sign}{}.{:03}", abs / 1000, abs % 1000)
}

/// Writes one header row then one row per sample.
pub struct CsvWriter<W: Write> {
    out: W,
    target: String,
    columns: Vec<Column>,
    time_format: String,
    rows: usize,
}

impl<W: Write> CsvWriter<W> {
    /// `target` names the destination in error messages.
    pub fn new(
        out: W,
        target: impl Into<String>,
        columns: Vec<Column>,
        time_format: &str,
    ) -> Result<Self, OutputError> {
        validate_time_format(time_format)?;
        Ok(Self {
            out,
            target: target.into(),
            columns,
            time_format: time_format.to_string(),
            rows: 0,
        })
    }

    pub fn write_header(&mut self) -> Result<(), OutputError> {
        let line = self
            .columns
            .iter()
            .map(|c| c.title())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(self.out, "{line}").map_err(|e| self.unwritable(e))
    }

    pub fn write_sample(&mut self, sample: &Sample) -> Result<(), OutputError> {
        let line = self
            .columns
            .iter()
            .map(|c| self.cell(*c, sample))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(self.out, "{line}").map_err(|e| self.unwritable(e))?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W, OutputError> {
        self.out.flush().map_err(|e| self.unwritable(e))?;
        Ok(self.out)
    }

    /// Data rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    fn cell(&self, column: Column, sample: &Sample) -> String {
        match column {
            Column::Time => sample
                .timestamp
                .map(|t| self.format_time(t))
                .unwrap_or_default(),
            Column::HeartRate => sample.heart_rate.to_string(),
            Column::Cadence => sample.cadence.to_string(),
            Column::Speed => format_speed(sample.speed),
            Column::Distance => sample.distance.to_string(),
            Column::Temperature => sample.temperature.to_string(),
            Column::Altitude => sample.altitude.to_string(),
        }
    }

    fn format_time(&self, timestamp: i64) -> String {
        match DateTime::<Utc>::from_timestamp(timestamp, 0) {
            Some(dt) => dt.format(&self.time_format).to_string(),
            None => {
                log::debug!("timestamp {timestamp} out of range, writing raw seconds");
                timestamp.to_string()
            }
        }
    }

    fn unwritable(&self, source: io::Error) -> OutputError {
        OutputError::OutputUnwritable {
            target: self.target.clone(),
            source,
        }
    }
}
