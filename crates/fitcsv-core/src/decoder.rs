//! Record decoder: walks a payload one record at a time.
//!
//! Every record starts with a one-byte header:
//!
//! ```text
//! bit 7    bit 6    bits 3..0
//! 1        -        compressed-timestamp header (not supported)
//! 0        1        definition record, local type id
//! 0        0        data record, local type id
//! ```
//!
//! A definition record body is `reserved(1) architecture(1) global(2, LE)
//! field_count(1)` followed by `field_count` triples of `(number, size,
//! base_type)`. A data record body is the concatenation of its fields, in the
//! order and sizes of the layout currently registered for its local type id.
//!
//! Records that cannot be decoded (undefined local type, compressed-timestamp
//! header) are handled by the [`ResyncPolicy`]. The default policy advances a
//! single byte past the start of the bad record and carries on. That is lossy:
//! a skipped data record's field bytes are then re-read as record headers.
//! [`ResyncPolicy::Abort`] stops at the first such record instead.

use std::fmt;
use std::str::FromStr;

use crate::codec::{self, DecodedValue};
use crate::error::Error;
use crate::registry::{FieldSpec, MessageDefinition, TypeRegistry};

/// Fixed part of a definition record: header, reserved, architecture,
/// global number (2), field count.
const DEFINITION_FIXED_LEN: usize = 6;

/// Bytes per field triple in a definition record.
const FIELD_SPEC_LEN: usize = 3;

/// Classification of a record header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Bit 7 set.
    CompressedTimestamp,
    /// Bit 7 clear, bit 6 set.
    Definition { local_type: u8 },
    /// Bits 7 and 6 clear.
    Data { local_type: u8 },
}

impl RecordKind {
    pub fn classify(header: u8) -> Self {
        let local_type = header & 0x0F;
        if header & 0x80 != 0 {
            Self::CompressedTimestamp
        } else if header & 0x40 != 0 {
            Self::Definition { local_type }
        } else {
            Self::Data { local_type }
        }
    }
}

/// What to do when a record cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResyncPolicy {
    /// Report the record, advance one byte, keep decoding.
    #[default]
    SkipByte,
    /// Fail the decode at the first undecodable record.
    Abort,
}

impl ResyncPolicy {
    /// Bytes to advance past an undecodable record, or `None` to stop.
    pub fn resync_advance(self) -> Option<usize> {
        match self {
            Self::SkipByte => Some(1),
            Self::Abort => None,
        }
    }
}

impl fmt::Display for ResyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SkipByte => write!(f, "skip_byte"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for ResyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip_byte" | "skip" => Ok(Self::SkipByte),
            "abort" | "strict" => Ok(Self::Abort),
            other => Err(format!("unknown resync policy '{other}'")),
        }
    }
}

/// A data record field together with its declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedField {
    pub spec: FieldSpec,
    pub value: DecodedValue,
}

/// One record as seen by the decoder.
#[derive(Debug)]
pub enum Record {
    /// A layout was installed for `local_type`.
    Definition {
        offset: usize,
        local_type: u8,
        global: u16,
        field_count: usize,
        /// Whether an earlier layout for this local type was replaced.
        replaced: bool,
    },
    /// A data record decoded against the registered layout.
    Data {
        offset: usize,
        local_type: u8,
        global: u16,
        fields: Vec<DecodedField>,
    },
    /// A record the resync policy stepped over.
    Skipped { offset: usize, reason: Error },
}

impl Record {
    /// Payload offset of the record header byte.
    pub fn offset(&self) -> usize {
        match self {
            Self::Definition { offset, .. }
            | Self::Data { offset, .. }
            | Self::Skipped { offset, .. } => *offset,
        }
    }
}

/// Iterator over the records of one payload.
///
/// Definition records update the borrowed [`TypeRegistry`] as they are
/// decoded, so data records always see the layout in force at their position
/// in the stream. The iterator ends at the end of the payload or after the
/// first fatal error.
pub struct RecordDecoder<'a> {
    payload: &'a [u8],
    cursor: usize,
    registry: &'a mut TypeRegistry,
    policy: ResyncPolicy,
    finished: bool,
    warned_big_endian: bool,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(payload: &'a [u8], registry: &'a mut TypeRegistry, policy: ResyncPolicy) -> Self {
        Self {
            payload,
            cursor: 0,
            registry,
            policy,
            finished: false,
            warned_big_endian: false,
        }
    }

    /// Offset of the next record to decode.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn registry(&self) -> &TypeRegistry {
        &*self.registry
    }

    pub fn policy(&self) -> ResyncPolicy {
        self.policy
    }

    /// Decode the record at `offset`, returning it and its length in bytes.
    fn decode_record(&mut self, offset: usize) -> Result<(Record, usize), Error> {
        let header = self.payload[offset];
        match RecordKind::classify(header) {
            RecordKind::CompressedTimestamp => {
                Err(Error::AbnormalHeaderUnsupported { offset, header })
            }
            RecordKind::Definition { local_type } => self.decode_definition(offset, local_type),
            RecordKind::Data { local_type } => self.decode_data(offset, local_type),
        }
    }

    fn decode_definition(&mut self, offset: usize, local_type: u8) -> Result<(Record, usize), Error> {
        let fixed = self.record_bytes(offset, DEFINITION_FIXED_LEN)?;
        let architecture = fixed[2];
        let global = u16::from_le_bytes([fixed[3], fixed[4]]);
        let field_count = fixed[5] as usize;

        let len = DEFINITION_FIXED_LEN + FIELD_SPEC_LEN * field_count;
        let bytes = self.record_bytes(offset, len)?;
        let fields: Vec<FieldSpec> = bytes[DEFINITION_FIXED_LEN..]
            .chunks_exact(FIELD_SPEC_LEN)
            .map(|t| FieldSpec::new(t[0], t[1], t[2]))
            .collect();

        if architecture != 0 && !self.warned_big_endian {
            log::warn!(
                "definition at offset {offset} declares big-endian architecture; \
                 multi-byte fields are still decoded little-endian"
            );
            self.warned_big_endian = true;
        }

        log::debug!(
            "offset {offset}: definition local={local_type} global={global} fields={}",
            fields
                .iter()
                .map(FieldSpec::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        );

        let replaced = self
            .registry
            .define(MessageDefinition {
                global,
                local_type,
                architecture,
                fields,
            })
            .is_some();

        let record = Record::Definition {
            offset,
            local_type,
            global,
            field_count,
            replaced,
        };
        Ok((record, len))
    }

    fn decode_data(&mut self, offset: usize, local_type: u8) -> Result<(Record, usize), Error> {
        let payload = self.payload;
        let definition = self
            .registry
            .lookup(local_type)
            .ok_or(Error::UnknownLocalType { offset, local_type })?;

        let len = 1 + definition.data_size();
        if payload.len() - offset < len {
            return Err(Error::TruncatedRecord {
                offset,
                needed: len,
                available: payload.len() - offset,
            });
        }

        let mut at = offset + 1;
        let fields = definition
            .fields
            .iter()
            .map(|spec| {
                let size = spec.size as usize;
                let value = codec::decode(spec.base_type, size, &payload[at..at + size]);
                at += size;
                DecodedField { spec: *spec, value }
            })
            .collect();

        let record = Record::Data {
            offset,
            local_type,
            global: definition.global,
            fields,
        };
        Ok((record, len))
    }

    /// The `needed` bytes starting at the record header, if the payload has them.
    fn record_bytes(&self, offset: usize, needed: usize) -> Result<&'a [u8], Error> {
        let payload = self.payload;
        let available = payload.len() - offset;
        if available < needed {
            return Err(Error::TruncatedRecord {
                offset,
                needed,
                available,
            });
        }
        Ok(&payload[offset..offset + needed])
    }
}

impl Iterator for RecordDecoder<'_> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.cursor >= self.payload.len() {
            return None;
        }

        let offset = self.cursor;
        match self.decode_record(offset) {
            Ok((record, len)) => {
                self.cursor += len;
                Some(Ok(record))
            }
            Err(reason) if reason.is_record_level() => match self.policy.resync_advance() {
                Some(advance) => {
                    log::debug!("offset {offset}: {reason}; skipping {advance} byte(s)");
                    self.cursor += advance;
                    Some(Ok(Record::Skipped { offset, reason }))
                }
                None => {
                    self.finished = true;
                    Some(Err(reason))
                }
            },
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::base_type;

    fn definition(local: u8, global: u16, fields: &[(u8, u8, u8)]) -> Vec<u8> {
        let mut out = vec![0x40 | local, 0, 0];
        out.extend_from_slice(&global.to_le_bytes());
        out.push(fields.len() as u8);
        for &(n, s, t) in fields {
            out.extend_from_slice(&[n, s, t]);
        }
        out
    }

    fn data(local: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![local];
        out.extend_from_slice(body);
        out
    }

    fn decode_all(payload: &[u8], policy: ResyncPolicy) -> (Vec<Result<Record, Error>>, usize) {
        let mut registry = TypeRegistry::new();
        let mut decoder = RecordDecoder::new(payload, &mut registry, policy);
        let records: Vec<_> = decoder.by_ref().collect();
        (records, decoder.position())
    }

    #[test]
    fn test_classify_header_bits() {
        assert_eq!(RecordKind::classify(0x85), RecordKind::CompressedTimestamp);
        assert_eq!(
            RecordKind::classify(0x43),
            RecordKind::Definition { local_type: 3 }
        );
        assert_eq!(RecordKind::classify(0x0F), RecordKind::Data { local_type: 15 });
        // Bits 4-5 do not change the classification.
        assert_eq!(RecordKind::classify(0x21), RecordKind::Data { local_type: 1 });
    }

    #[test]
    fn test_definition_then_data() {
        let mut payload = definition(0, 20, &[(253, 4, base_type::UINT32), (3, 1, base_type::UINT8)]);
        payload.extend(data(0, &[100, 0, 0, 0, 150]));

        let (records, position) = decode_all(&payload, ResyncPolicy::SkipByte);
        assert_eq!(records.len(), 2);
        assert_eq!(position, payload.len());

        match &records[0] {
            Ok(Record::Definition {
                offset,
                local_type,
                global,
                field_count,
                replaced,
            }) => {
                assert_eq!((*offset, *local_type, *global, *field_count), (0, 0, 20, 2));
                assert!(!replaced);
            }
            other => panic!("expected definition, got {other:?}"),
        }

        match &records[1] {
            Ok(Record::Data {
                offset,
                global,
                fields,
                ..
            }) => {
                assert_eq!(*offset, 12);
                assert_eq!(*global, 20);
                assert_eq!(fields[0].value, DecodedValue::UInt32(100));
                assert_eq!(fields[1].value, DecodedValue::UInt8(150));
            }
            other => panic!("expected data, got {other:?}"),
        }
    }

    #[test]
    fn test_global_number_is_little_endian() {
        let payload = definition(2, 0x0102, &[]);
        let (records, _) = decode_all(&payload, ResyncPolicy::SkipByte);
        assert!(matches!(
            records[0],
            Ok(Record::Definition { global: 0x0102, .. })
        ));
    }

    #[test]
    fn test_redefinition_changes_layout() {
        let mut payload = definition(0, 20, &[(3, 1, base_type::UINT8)]);
        payload.extend(data(0, &[77]));
        payload.extend(definition(0, 21, &[(1, 2, base_type::UINT16)]));
        payload.extend(data(0, &[0x10, 0x27]));

        let (records, position) = decode_all(&payload, ResyncPolicy::SkipByte);
        assert_eq!(position, payload.len());
        assert!(matches!(
            records[2],
            Ok(Record::Definition { replaced: true, .. })
        ));
        match &records[3] {
            Ok(Record::Data { global, fields, .. }) => {
                assert_eq!(*global, 21);
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].value, DecodedValue::UInt16(10_000));
            }
            other => panic!("expected data, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_local_type_skips_one_byte() {
        // Data record for undefined local 5, then a definition for local 0.
        let mut payload = vec![0x05];
        payload.extend(definition(0, 20, &[]));

        let (records, position) = decode_all(&payload, ResyncPolicy::SkipByte);
        assert_eq!(position, payload.len());
        assert!(matches!(
            records[0],
            Ok(Record::Skipped {
                offset: 0,
                reason: Error::UnknownLocalType { local_type: 5, .. }
            })
        ));
        assert!(matches!(
            records[1],
            Ok(Record::Definition { offset: 1, .. })
        ));
    }

    #[test]
    fn test_compressed_timestamp_header_is_reported() {
        let mut payload = vec![0x80];
        payload.extend(definition(1, 0, &[]));

        let (records, _) = decode_all(&payload, ResyncPolicy::SkipByte);
        assert!(matches!(
            records[0],
            Ok(Record::Skipped {
                reason: Error::AbnormalHeaderUnsupported { header: 0x80, .. },
                ..
            })
        ));
        assert!(matches!(records[1], Ok(Record::Definition { .. })));
    }

    #[test]
    fn test_abort_policy_stops_at_first_bad_record() {
        let mut payload = vec![0x05];
        payload.extend(definition(0, 20, &[]));

        let (records, position) = decode_all(&payload, ResyncPolicy::Abort);
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], Err(Error::UnknownLocalType { .. })));
        assert_eq!(position, 0);
    }

    #[test]
    fn test_truncated_definition_ends_decode() {
        let mut payload = definition(0, 20, &[(3, 1, 2), (4, 1, 2)]);
        payload.truncate(payload.len() - 2);

        let (records, _) = decode_all(&payload, ResyncPolicy::SkipByte);
        assert_eq!(records.len(), 1);
        assert!(matches!(
            records[0],
            Err(Error::TruncatedRecord {
                offset: 0,
                needed: 12,
                available: 10
            })
        ));
    }

    #[test]
    fn test_truncated_data_record_ends_decode() {
        let mut payload = definition(0, 20, &[(253, 4, base_type::UINT32)]);
        payload.extend(data(0, &[1, 2]));

        let (records, _) = decode_all(&payload, ResyncPolicy::SkipByte);
        assert_eq!(records.len(), 2);
        assert!(matches!(records[1], Err(Error::TruncatedRecord { .. })));
    }

    #[test]
    fn test_unsupported_base_type_keeps_framing() {
        let mut payload = definition(0, 20, &[(7, 4, 0x88), (3, 1, base_type::UINT8)]);
        payload.extend(data(0, &[1, 2, 3, 4, 99]));

        let (records, position) = decode_all(&payload, ResyncPolicy::SkipByte);
        assert_eq!(position, payload.len());
        match &records[1] {
            Ok(Record::Data { fields, .. }) => {
                assert!(!fields[0].value.is_supported());
                assert_eq!(fields[1].value, DecodedValue::UInt8(99));
            }
            other => panic!("expected data, got {other:?}"),
        }
    }

    #[test]
    fn test_policy_parse_and_display() {
        assert_eq!("abort".parse::<ResyncPolicy>().unwrap(), ResyncPolicy::Abort);
        assert_eq!("skip".parse::<ResyncPolicy>().unwrap(), ResyncPolicy::SkipByte);
        assert!("later".parse::<ResyncPolicy>().is_err());
        assert_eq!(ResyncPolicy::default().to_string(), "skip_byte");
    }
}
