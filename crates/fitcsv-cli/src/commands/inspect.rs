//! `fitcsv inspect`: dump the record structure of FIT files.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use fitcsv_core::{
    DecodeSession, DecodeStats, Error, FileHeader, Record, ResyncPolicy, TypeRegistry,
    read_payload,
};
use serde::Serialize;

/// Machine-readable summary of one file.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub file: String,
    pub header: FileHeader,
    pub stats: DecodeStats,
}

/// Render one record as dump lines. `registry` is the state after the
/// record was applied.
pub fn describe_record(record: &Record, registry: &TypeRegistry) -> Vec<String> {
    match record {
        Record::Definition {
            offset,
            local_type,
            global,
            field_count,
            replaced,
        } => {
            let mut line = format!(
                "@{offset:08X} DEF   local {local_type:>2} -> message {global} ({field_count} fields)"
            );
            if *replaced {
                line.push_str(" [redefined]");
            }
            if let Some(def) = registry.lookup(*local_type) {
                for spec in &def.fields {
                    line.push(' ');
                    line.push_str(&spec.to_string());
                }
            }
            vec![line]
        }
        Record::Data {
            offset,
            local_type,
            global,
            fields,
        } => {
            let mut lines = vec![format!(
                "@{offset:08X} DATA  local {local_type:>2} message {global}"
            )];
            for field in fields {
                lines.push(format!("    {{{}}} {}", field.spec.number, field.value));
            }
            lines
        }
        Record::Skipped { offset, reason } => vec![format!("@{offset:08X} SKIP  {reason}")],
    }
}

fn header_line(header: &FileHeader) -> String {
    format!(
        "Header: {} bytes, protocol {}, profile {}, data size {}",
        header.header_size, header.protocol_version, header.profile_version, header.data_size
    )
}

fn stats_lines(stats: &DecodeStats) -> Vec<String> {
    let mut lines = vec![
        format!("  Bytes decoded:    {}", stats.bytes_decoded),
        format!(
            "  Definitions:      {} ({} redefined)",
            stats.definitions, stats.redefinitions
        ),
        format!(
            "  Data records:     {} ({} samples, {} other)",
            stats.data_records, stats.samples, stats.other_messages
        ),
        format!(
            "  Skipped records:  {} ({} unknown local type, {} compressed timestamp)",
            stats.skipped_records(),
            stats.unknown_local_types,
            stats.abnormal_headers
        ),
        format!(
            "  Fields:           {} unsupported, {} ignored",
            stats.unsupported_fields, stats.ignored_fields
        ),
    ];
    if stats.truncated {
        lines.push("  Truncated:        yes".to_string());
    }
    lines
}

/// Decode `path`, writing the dump to `out` unless `json` is set.
pub fn inspect_file<W: Write>(
    path: &Path,
    policy: ResyncPolicy,
    json: bool,
    out: &mut W,
) -> Result<InspectReport, Error> {
    let mut reader = BufReader::new(File::open(path)?);
    let header = FileHeader::read_from(&mut reader)?;
    let payload = read_payload(&mut reader, &header)?;

    if !json {
        writeln!(out, "{}", path.display())?;
        writeln!(out, "{}", header_line(&header))?;
    }

    let mut session = DecodeSession::new(policy);
    let mut write_err = None;
    let decoded = session.decode_payload_with(&payload, |record, registry| {
        if json || write_err.is_some() {
            return;
        }
        for line in describe_record(record, registry) {
            if let Err(e) = writeln!(out, "{line}") {
                write_err = Some(e);
                return;
            }
        }
    });
    if let Some(e) = write_err {
        return Err(e.into());
    }
    decoded?;

    let stats = *session.stats();
    if !json {
        writeln!(out, "Statistics:")?;
        for line in stats_lines(&stats) {
            writeln!(out, "{line}")?;
        }
    }

    Ok(InspectReport {
        file: path.display().to_string(),
        header,
        stats,
    })
}

/// Run the inspect command.
pub fn run(files: &[PathBuf], strict: bool, json: bool) {
    let policy = super::resync_policy(strict);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let mut reports = Vec::new();
    let mut failed = 0;
    for path in files {
        match inspect_file(path, policy, json, &mut out) {
            Ok(report) => reports.push(report),
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                failed += 1;
            }
        }
        if !json {
            let _ = writeln!(out);
        }
    }

    if json {
        match serde_json::to_string_pretty(&reports) {
            Ok(s) => {
                let _ = writeln!(out, "{s}");
            }
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
