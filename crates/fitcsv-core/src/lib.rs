//! # fitcsv-core
//!
//! Decoder for FIT activity recordings.
//!
//! A FIT file is a 12-byte header followed by a payload of records. Data
//! records carry no layout of their own: they point at a 4-bit local type id
//! whose layout was installed by an earlier definition record. This crate
//! learns those layouts as it goes, decodes every data record against the
//! layout in force at its position, and assembles "record" messages
//! (global message 20) into [`Sample`]s.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fitcsv_core::{ResyncPolicy, decode_file, fill_missing};
//!
//! let report = decode_file("ride.fit", ResyncPolicy::SkipByte).unwrap();
//! let per_second = fill_missing(&report.samples);
//! for sample in &per_second {
//!     println!("{:?} {} bpm", sample.timestamp, sample.heart_rate);
//! }
//! ```
//!
//! ## Architecture
//!
//! Header → payload bounds → RecordDecoder (TypeRegistry + field codec) →
//! sample assembly → timeline → gap filling
//!
//! Each file is decoded by its own [`DecodeSession`]; there is no global
//! state.

pub mod codec;
pub mod decoder;
pub mod error;
pub mod header;
pub mod registry;
pub mod sample;
pub mod session;
pub mod timeline;

pub use codec::{DecodedValue, decode as decode_field};
pub use decoder::{DecodedField, Record, RecordDecoder, RecordKind, ResyncPolicy};
pub use error::Error;
pub use header::{FileHeader, MAGIC, MAX_PAYLOAD_LEN, check_payload_size, read_payload};
pub use registry::{FieldSpec, MESG_RECORD, MessageDefinition, TypeRegistry};
pub use sample::{FIT_EPOCH_OFFSET, Sample, assemble};
pub use session::{DecodeReport, DecodeSession, DecodeStats, decode_file, decode_reader};
pub use timeline::{MAX_FILL_GAP, MAX_FILLED_SAMPLES, fill_missing, interpolate};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
