//! Decode sessions: one file's registry, timeline, and statistics.
//!
//! A [`DecodeSession`] owns everything a single decode mutates. Nothing is
//! shared between sessions, so independent files can be decoded on separate
//! threads without coordination.
//!
//! ```no_run
//! use fitcsv_core::{ResyncPolicy, decode_file};
//!
//! let report = decode_file("ride.fit", ResyncPolicy::default()).unwrap();
//! println!("{} samples", report.samples.len());
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;

use crate::decoder::{Record, RecordDecoder, ResyncPolicy};
use crate::error::Error;
use crate::header::{FileHeader, read_payload};
use crate::registry::{MESG_RECORD, TypeRegistry};
use crate::sample::{Sample, assemble};

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Counters gathered while decoding one payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    /// Payload bytes the decoder advanced over.
    pub bytes_decoded: usize,
    pub definitions: usize,
    /// Definitions that replaced an earlier layout for the same local type.
    pub redefinitions: usize,
    pub data_records: usize,
    pub samples: usize,
    /// Data records of messages other than the sample message.
    pub other_messages: usize,
    pub unknown_local_types: usize,
    pub abnormal_headers: usize,
    /// Bytes stepped over by the resync policy.
    pub skipped_bytes: usize,
    /// Fields with a base type the codec does not interpret.
    pub unsupported_fields: usize,
    /// Sample-message fields that did not map onto a sample.
    pub ignored_fields: usize,
    /// Decoding stopped at a record running past the end of the payload.
    pub truncated: bool,
}

impl DecodeStats {
    /// Records the resync policy stepped over.
    pub fn skipped_records(&self) -> usize {
        self.unknown_local_types + self.abnormal_headers
    }
}

/// Everything a successful file decode produces.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeReport {
    pub header: FileHeader,
    pub samples: Vec<Sample>,
    pub stats: DecodeStats,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// State of one file decode.
#[derive(Debug, Default)]
pub struct DecodeSession {
    registry: TypeRegistry,
    timeline: Vec<Sample>,
    stats: DecodeStats,
    policy: ResyncPolicy,
}

impl DecodeSession {
    pub fn new(policy: ResyncPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Decode every record of `payload`, appending samples to the timeline.
    pub fn decode_payload(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.decode_payload_with(payload, |_, _| {})
    }

    /// Like [`decode_payload`](Self::decode_payload), handing each record and
    /// the registry as it stands after that record to `observe`.
    ///
    /// A record running past the end of the payload ends the decode. Under
    /// [`ResyncPolicy::SkipByte`] that is reported and the samples decoded so
    /// far are kept; under [`ResyncPolicy::Abort`] it is returned as an error.
    /// Samples already on the timeline are never removed.
    pub fn decode_payload_with<F>(&mut self, payload: &[u8], mut observe: F) -> Result<(), Error>
    where
        F: FnMut(&Record, &TypeRegistry),
    {
        let policy = self.policy;
        let mut decoder = RecordDecoder::new(payload, &mut self.registry, policy);

        let mut outcome = Ok(());
        while let Some(item) = decoder.next() {
            let record = match item {
                Ok(record) => record,
                Err(err @ Error::TruncatedRecord { .. }) if policy == ResyncPolicy::SkipByte => {
                    log::warn!(
                        "{err}; keeping {} samples decoded so far",
                        self.timeline.len()
                    );
                    self.stats.truncated = true;
                    break;
                }
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            };

            observe(&record, decoder.registry());

            match record {
                Record::Definition { replaced, .. } => {
                    self.stats.definitions += 1;
                    if replaced {
                        self.stats.redefinitions += 1;
                    }
                }
                Record::Data {
                    offset,
                    global,
                    fields,
                    ..
                } => {
                    self.stats.data_records += 1;
                    self.stats.unsupported_fields +=
                        fields.iter().filter(|f| !f.value.is_supported()).count();

                    if global == MESG_RECORD {
                        let assembly = assemble(&fields);
                        self.stats.ignored_fields += assembly.ignored;
                        self.stats.samples += 1;
                        self.timeline.push(assembly.sample);
                    } else {
                        self.stats.other_messages += 1;
                        for field in &fields {
                            log::trace!(
                                "offset {offset}: message {global} field {{{}}}{}",
                                field.spec.number,
                                field.value
                            );
                        }
                    }
                }
                Record::Skipped { reason, .. } => {
                    match reason {
                        Error::UnknownLocalType { .. } => self.stats.unknown_local_types += 1,
                        Error::AbnormalHeaderUnsupported { .. } => {
                            self.stats.abnormal_headers += 1
                        }
                        _ => {}
                    }
                    self.stats.skipped_bytes += policy.resync_advance().unwrap_or(0);
                }
            }
        }

        self.stats.bytes_decoded += decoder.position();

        let skipped = self.stats.skipped_records();
        if skipped > 0 {
            log::warn!(
                "skipped {skipped} undecodable record(s) ({} unknown local type, {} compressed timestamp)",
                self.stats.unknown_local_types,
                self.stats.abnormal_headers
            );
        }

        outcome
    }

    /// Samples assembled so far, in arrival order.
    pub fn samples(&self) -> &[Sample] {
        &self.timeline
    }

    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn policy(&self) -> ResyncPolicy {
        self.policy
    }

    /// Consume the session into its timeline and statistics.
    pub fn into_parts(self) -> (Vec<Sample>, DecodeStats) {
        (self.timeline, self.stats)
    }
}

// ---------------------------------------------------------------------------
// Whole-file helpers
// ---------------------------------------------------------------------------

/// Decode a complete FIT byte stream: header, payload, records.
pub fn decode_reader<R: Read>(reader: &mut R, policy: ResyncPolicy) -> Result<DecodeReport, Error> {
    let header = FileHeader::read_from(reader)?;
    let payload = read_payload(reader, &header)?;

    let mut session = DecodeSession::new(policy);
    session.decode_payload(&payload)?;

    let (samples, stats) = session.into_parts();
    log::debug!(
        "decoded {} bytes: {} definitions, {} data records, {} samples",
        stats.bytes_decoded,
        stats.definitions,
        stats.data_records,
        stats.samples
    );
    Ok(DecodeReport {
        header,
        samples,
        stats,
    })
}

/// Decode the FIT file at `path`.
pub fn decode_file(path: impl AsRef<Path>, policy: ResyncPolicy) -> Result<DecodeReport, Error> {
    let mut reader = BufReader::new(File::open(path)?);
    decode_reader(&mut reader, policy)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
