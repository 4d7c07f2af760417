//! Gap filling for the sample timeline.
//!
//! Devices in "smart recording" mode skip seconds. [`fill_missing`] inserts a
//! synthetic sample for every whole second missing between two recorded
//! samples, linearly interpolating each metric.
//!
//! Filling is bounded: a gap longer than [`MAX_FILL_GAP`] seconds is left
//! as is, and no call synthesizes more than [`MAX_FILLED_SAMPLES`] samples.
//! A corrupt timestamp therefore cannot turn into billions of rows.

use crate::sample::Sample;

/// Longest gap, in seconds, that is filled.
pub const MAX_FILL_GAP: i64 = 3_600;

/// Most synthetic samples one [`fill_missing`] call produces.
pub const MAX_FILLED_SAMPLES: usize = 1_000_000;

/// Interpolate `i/count` of the way from `first` to `second`.
///
/// Scaled by 100 before dividing and back after, with truncation toward zero
/// at both steps. Computed in 128 bits so wide values and long gaps cannot
/// overflow.
pub fn interpolate(first: i64, second: i64, i: i64, count: i64) -> i64 {
    if count == 0 {
        return first;
    }
    let (first, second) = (i128::from(first), i128::from(second));
    let value = first + ((second - first) * 100 * i128::from(i) / i128::from(count)) / 100;
    value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Copy of `samples` with every missing second between neighbours filled in.
///
/// Pairs whose timestamps are 1 second apart or less (or out of order) are
/// left alone, as are pairs where either sample has no timestamp.
pub fn fill_missing(samples: &[Sample]) -> Vec<Sample> {
    fill_missing_bounded(samples, MAX_FILL_GAP, MAX_FILLED_SAMPLES)
}

fn fill_missing_bounded(samples: &[Sample], max_gap: i64, max_filled: usize) -> Vec<Sample> {
    let mut out = Vec::with_capacity(samples.len());
    let mut budget = max_filled;
    let mut unfilled = 0usize;

    for pair in samples.windows(2) {
        let (first, second) = (&pair[0], &pair[1]);
        out.push(*first);

        let (Some(start), Some(end)) = (first.timestamp, second.timestamp) else {
            continue;
        };
        let count = end.saturating_sub(start);
        if count <= 1 {
            continue;
        }

        let missing = (count - 1) as usize;
        if count > max_gap || missing > budget {
            log::debug!("leaving {missing}-second gap after t={start} unfilled");
            unfilled += 1;
            continue;
        }
        budget -= missing;

        for i in 1..count {
            out.push(Sample {
                timestamp: Some(start + i),
                heart_rate: interpolate(first.heart_rate, second.heart_rate, i, count),
                cadence: interpolate(first.cadence, second.cadence, i, count),
                speed: interpolate(first.speed, second.speed, i, count),
                distance: interpolate(first.distance, second.distance, i, count),
                altitude: interpolate(first.altitude, second.altitude, i, count),
                temperature: interpolate(first.temperature, second.temperature, i, count),
                interpolated: true,
            });
        }
    }

    if let Some(last) = samples.last() {
        out.push(*last);
    }

    if unfilled > 0 {
        log::warn!(
            "left {unfilled} gap(s) unfilled: longer than {max_gap} s or past the \
             {max_filled}-sample fill limit"
        );
    }
    out
}
