//! Integration tests for fitcsv-core.
//!
//! These tests build synthetic FIT files byte by byte and run them through
//! the full pipeline: header → payload → records → samples → gap filling.

use fitcsv_core::{
    DecodeSession, Error, FIT_EPOCH_OFFSET, MAGIC, MAX_PAYLOAD_LEN, ResyncPolicy, decode_file,
    decode_reader, fill_missing,
};

// ---------------------------------------------------------------------------
// Fixture builder
// ---------------------------------------------------------------------------

const UINT8: u8 = 0x02;
const UINT16: u8 = 0x84;
const UINT32: u8 = 0x86;
const UINT32Z: u8 = 0x8C;
const SINT8: u8 = 0x01;
const ENUM: u8 = 0x00;
const STRING: u8 = 0x07;

#[derive(Default)]
struct FitBuilder {
    payload: Vec<u8>,
}

impl FitBuilder {
    fn define(mut self, local: u8, global: u16, fields: &[(u8, u8, u8)]) -> Self {
        self.payload.extend_from_slice(&[0x40 | local, 0, 0]);
        self.payload.extend_from_slice(&global.to_le_bytes());
        self.payload.push(fields.len() as u8);
        for &(n, s, t) in fields {
            self.payload.extend_from_slice(&[n, s, t]);
        }
        self
    }

    fn data(mut self, local: u8, body: &[u8]) -> Self {
        self.payload.push(local);
        self.payload.extend_from_slice(body);
        self
    }

    fn raw(mut self, bytes: &[u8]) -> Self {
        self.payload.extend_from_slice(bytes);
        self
    }

    /// Header with a 2-byte extension region (as a header CRC would occupy).
    fn build(self) -> Vec<u8> {
        let mut out = vec![14, 0x10];
        out.extend_from_slice(&2093u16.to_le_bytes());
        out.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&[0xAB, 0xCD]);
        out.extend_from_slice(&self.payload);
        // Trailing file CRC, never read.
        out.extend_from_slice(&[0x00, 0x00]);
        out
    }
}

/// Record-message body for layout 0 below.
fn ride_point(t: u32, hr: u8, speed_mm_s: u16, distance_cm: u32) -> Vec<u8> {
    let mut body = t.to_le_bytes().to_vec();
    body.push(hr);
    body.extend_from_slice(&speed_mm_s.to_le_bytes());
    body.extend_from_slice(&distance_cm.to_le_bytes());
    body
}

const RIDE_LAYOUT: &[(u8, u8, u8)] = &[
    (253, 4, UINT32),
    (3, 1, UINT8),
    (6, 2, UINT16),
    (5, 4, UINT32),
];

fn sample_ride() -> Vec<u8> {
    FitBuilder::default()
        // file_id: type, manufacturer-ish enum, serial, product name
        .define(0, 0, &[(0, 1, ENUM), (3, 4, UINT32Z), (8, 8, STRING)])
        .data(0, &[4, 1, 2, 3, 4, b'E', b'd', b'g', b'e', 0, 0, 0, 0])
        // local 0 is reused for record messages
        .define(0, 20, RIDE_LAYOUT)
        .data(0, &ride_point(1_000, 120, 5_000, 0))
        .data(0, &ride_point(1_001, 122, 5_000, 500))
        .data(0, &ride_point(1_005, 130, 6_000, 2_600))
        // a second record layout on another local id, with temperature
        .define(1, 20, &[(253, 4, UINT32), (13, 1, SINT8), (4, 1, UINT8)])
        .data(1, &[0xEE, 0x03, 0, 0, 0xFE, 85])
        .build()
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[test]
fn decodes_synthetic_ride() {
    let bytes = sample_ride();
    let report = decode_reader(&mut bytes.as_slice(), ResyncPolicy::SkipByte).unwrap();

    assert_eq!(report.header.header_size, 14);
    assert_eq!(report.stats.bytes_decoded, report.header.data_size as usize);
    assert_eq!(report.stats.definitions, 3);
    assert_eq!(report.stats.redefinitions, 1);
    assert_eq!(report.stats.other_messages, 1);
    assert_eq!(report.samples.len(), 4);

    let first = report.samples[0];
    assert_eq!(first.timestamp, Some(FIT_EPOCH_OFFSET + 1_000));
    assert_eq!(first.heart_rate, 120);
    assert_eq!(first.speed, 18_000);
    assert_eq!(first.distance, 0);

    let third = report.samples[2];
    assert_eq!(third.timestamp, Some(FIT_EPOCH_OFFSET + 1_005));
    assert_eq!(third.speed, 21_600);
    assert_eq!(third.distance, 26);

    let last = report.samples[3];
    assert_eq!(last.timestamp, Some(FIT_EPOCH_OFFSET + 1_006));
    assert_eq!(last.temperature, -2);
    assert_eq!(last.cadence, 85);
    assert_eq!(last.heart_rate, 0);
}

#[test]
fn gap_filling_produces_one_row_per_second() {
    let bytes = sample_ride();
    let report = decode_reader(&mut bytes.as_slice(), ResyncPolicy::SkipByte).unwrap();

    let filled = fill_missing(&report.samples);
    // 1000, 1001, [1002..1004 synthesized], 1005, 1006
    assert_eq!(filled.len(), 7);
    assert_eq!(filled.iter().filter(|s| s.interpolated).count(), 3);

    let mid = filled[3];
    assert_eq!(mid.timestamp, Some(FIT_EPOCH_OFFSET + 1_003));
    // 122 → 130 over 4 seconds, 2 seconds in
    assert_eq!(mid.heart_rate, 126);
    // The decoded samples are untouched.
    assert_eq!(filled[1], report.samples[1]);
}

#[test]
fn record_without_timestamp_is_not_filled_around() {
    let bytes = FitBuilder::default()
        .define(0, 20, RIDE_LAYOUT)
        .data(0, &ride_point(1_000, 120, 5_000, 0))
        .define(1, 20, &[(3, 1, UINT8)])
        .data(1, &[125])
        .data(0, &ride_point(1_010, 130, 5_000, 5_000))
        .build();

    let report = decode_reader(&mut bytes.as_slice(), ResyncPolicy::SkipByte).unwrap();
    assert_eq!(report.samples.len(), 3);
    assert_eq!(report.samples[1].timestamp, None);
    assert_eq!(report.samples[1].heart_rate, 125);

    let filled = fill_missing(&report.samples);
    assert_eq!(filled, report.samples);
}

#[test]
fn corrupt_timestamp_gap_is_not_filled() {
    let bytes = FitBuilder::default()
        .define(0, 20, RIDE_LAYOUT)
        .data(0, &ride_point(0, 120, 5_000, 0))
        .data(0, &ride_point(u32::MAX, 130, 6_000, 100))
        .data(0, &ride_point(u32::MAX - 3, 130, 6_000, 100))
        .build();

    let report = decode_reader(&mut bytes.as_slice(), ResyncPolicy::SkipByte).unwrap();
    let filled = fill_missing(&report.samples);
    assert_eq!(filled, report.samples);
}

#[test]
fn decode_from_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("ride.fit");
    std::fs::write(&path, sample_ride()).unwrap();

    let report = decode_file(&path, ResyncPolicy::default()).unwrap();
    assert_eq!(report.samples.len(), 4);

    let json = serde_json::to_string(&report.stats).unwrap();
    assert!(json.contains("\"samples\":4"), "got: {json}");
}

#[test]
fn sessions_are_independent() {
    let a = FitBuilder::default()
        .define(0, 20, &[(3, 1, UINT8)])
        .data(0, &[99])
        .build();
    // No definition: must not see the layout learned by the other session.
    let b = FitBuilder::default().data(0, &[5]).build();

    let ra = decode_reader(&mut a.as_slice(), ResyncPolicy::SkipByte).unwrap();
    let rb = decode_reader(&mut b.as_slice(), ResyncPolicy::SkipByte).unwrap();
    assert_eq!(ra.samples.len(), 1);
    assert!(rb.samples.is_empty());
    assert_eq!(rb.stats.unknown_local_types, 2);
}

#[test]
fn sessions_decode_in_parallel() {
    let bytes = sample_ride();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let bytes = bytes.clone();
            std::thread::spawn(move || {
                let mut session = DecodeSession::new(ResyncPolicy::SkipByte);
                session.decode_payload(&bytes[14..bytes.len() - 2]).unwrap();
                session.samples().len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 4);
    }
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

#[test]
fn unknown_record_resyncs_by_single_byte() {
    let bytes = FitBuilder::default()
        .raw(&[0x07])
        .define(0, 20, &[(3, 1, UINT8)])
        .data(0, &[140])
        .build();

    let report = decode_reader(&mut bytes.as_slice(), ResyncPolicy::SkipByte).unwrap();
    assert_eq!(report.stats.unknown_local_types, 1);
    assert_eq!(report.stats.skipped_bytes, 1);
    assert_eq!(report.samples.len(), 1);
    assert_eq!(report.samples[0].heart_rate, 140);
}

#[test]
fn strict_policy_rejects_compressed_timestamp() {
    let bytes = FitBuilder::default()
        .define(0, 20, &[(3, 1, UINT8)])
        .raw(&[0xA0, 0x01])
        .build();

    let err = decode_reader(&mut bytes.as_slice(), ResyncPolicy::Abort).unwrap_err();
    assert!(matches!(
        err,
        Error::AbnormalHeaderUnsupported { header: 0xA0, .. }
    ));
}

// ---------------------------------------------------------------------------
// Header and bounds
// ---------------------------------------------------------------------------

fn header_only(data_size: u32) -> Vec<u8> {
    let mut out = vec![12, 0x10, 0, 0];
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend_from_slice(&MAGIC);
    out
}

#[test]
fn empty_payload_rejected() {
    let err = decode_reader(&mut header_only(0).as_slice(), ResyncPolicy::default()).unwrap_err();
    assert!(matches!(err, Error::PayloadEmpty));
}

#[test]
fn oversized_payload_rejected() {
    let bytes = header_only(MAX_PAYLOAD_LEN as u32);
    let err = decode_reader(&mut bytes.as_slice(), ResyncPolicy::default()).unwrap_err();
    assert!(matches!(err, Error::PayloadTooLarge { .. }));
}

#[test]
fn short_payload_rejected() {
    let mut bytes = header_only(100);
    bytes.extend_from_slice(&[0x40, 0, 0, 20, 0, 0]);
    let err = decode_reader(&mut bytes.as_slice(), ResyncPolicy::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::Truncated {
            expected: 100,
            actual: 6
        }
    ));
}

#[test]
fn wrong_magic_rejected() {
    let mut bytes = sample_ride();
    bytes[8..12].copy_from_slice(b"FIT.");
    let err = decode_reader(&mut bytes.as_slice(), ResyncPolicy::default()).unwrap_err();
    assert!(matches!(err, Error::BadMagic { .. }));
}
