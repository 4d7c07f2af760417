//! Activity samples assembled from "record" messages (global message 20).
//!
//! Unit conversions happen here, once, as a sample is assembled:
//!
//! - timestamp: FIT epoch seconds + [`FIT_EPOCH_OFFSET`] → Unix seconds
//! - distance: centimeters / 100 → meters
//! - speed: mm/s × 3600 / 1000 → thousandths of km/h
//!
//! All arithmetic is integer and truncates toward zero.

use serde::Serialize;

use crate::decoder::DecodedField;

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z).
pub const FIT_EPOCH_OFFSET: i64 = 631_065_600;

/// Field definition numbers of the record message that map onto [`Sample`].
pub mod field {
    pub const ALTITUDE: u8 = 2;
    pub const HEART_RATE: u8 = 3;
    pub const CADENCE: u8 = 4;
    pub const DISTANCE: u8 = 5;
    pub const SPEED: u8 = 6;
    pub const TEMPERATURE: u8 = 13;
    pub const TIMESTAMP: u8 = 253;
}

/// One point of the activity time series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Sample {
    /// Unix seconds; `None` when the record message carried no timestamp
    /// field.
    pub timestamp: Option<i64>,
    /// Beats per minute.
    pub heart_rate: i64,
    /// Revolutions or steps per minute.
    pub cadence: i64,
    /// Thousandths of km/h.
    pub speed: i64,
    /// Meters.
    pub distance: i64,
    /// Raw altitude as recorded.
    pub altitude: i64,
    /// Degrees Celsius.
    pub temperature: i64,
    /// Synthesized by gap filling rather than decoded.
    pub interpolated: bool,
}

pub fn timestamp_from_raw(raw: i64) -> i64 {
    raw + FIT_EPOCH_OFFSET
}

pub fn distance_from_raw(raw: i64) -> i64 {
    raw / 100
}

pub fn speed_from_raw(raw: i64) -> i64 {
    raw * 3600 / 1000
}

/// Result of assembling one record message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assembly {
    pub sample: Sample,
    /// Fields that did not map onto the sample (unknown number or a
    /// non-integer value).
    pub ignored: usize,
}

/// Map a record message's decoded fields onto a [`Sample`].
///
/// Fields are applied in declaration order; a field number repeated within
/// one layout leaves the last value in place.
pub fn assemble(fields: &[DecodedField]) -> Assembly {
    let mut sample = Sample::default();
    let mut ignored = 0;

    for decoded in fields {
        let number = decoded.spec.number;
        let Some(value) = decoded.value.as_i64() else {
            log::debug!("record field {number}: ignoring non-integer value {}", decoded.value);
            ignored += 1;
            continue;
        };

        match number {
            field::ALTITUDE => sample.altitude = value,
            field::HEART_RATE => sample.heart_rate = value,
            field::CADENCE => sample.cadence = value,
            field::DISTANCE => sample.distance = distance_from_raw(value),
            field::SPEED => sample.speed = speed_from_raw(value),
            field::TEMPERATURE => sample.temperature = value,
            field::TIMESTAMP => sample.timestamp = Some(timestamp_from_raw(value)),
            _ => {
                log::debug!(
                    "record field {number} (size {}, type {}) not mapped",
                    decoded.spec.size,
                    decoded.spec.base_type
                );
                ignored += 1;
            }
        }
    }

    Assembly { sample, ignored }
}
