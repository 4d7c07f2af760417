//! Basic decoding example.
//!
//! Decodes a FIT file, fills the gaps in its timeline, and prints one line
//! per second.
//!
//! Run: `cargo run --example basic -- ride.fit`

use fitcsv_core::{ResyncPolicy, decode_file, fill_missing};

fn main() {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: basic <file.fit>");
        std::process::exit(2);
    };

    let report = match decode_file(&path, ResyncPolicy::SkipByte) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    };

    println!(
        "Header: protocol {} profile {}, {} payload bytes",
        report.header.protocol_version, report.header.profile_version, report.header.data_size
    );
    println!(
        "Records: {} definitions, {} data, {} skipped",
        report.stats.definitions,
        report.stats.data_records,
        report.stats.skipped_records()
    );

    // One row per second, synthesized where the device skipped
    for sample in fill_missing(&report.samples) {
        let marker = if sample.interpolated { "*" } else { " " };
        println!(
            "{marker} t={} hr={} cad={} speed={}.{:03} dist={}",
            sample.timestamp.map_or_else(|| "-".to_string(), |t| t.to_string()),
            sample.heart_rate,
            sample.cadence,
            sample.speed / 1000,
            (sample.speed % 1000).abs(),
            sample.distance
        );
    }
}
