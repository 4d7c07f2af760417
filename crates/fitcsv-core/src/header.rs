//! File header and payload bounds.
//!
//! A FIT file starts with a fixed 12-byte header:
//!
//! ```text
//! offset  size  field
//! 0       1     header size (12, or 14 with a header CRC)
//! 1       1     protocol version
//! 2       2     profile version (little-endian)
//! 4       4     payload size (little-endian)
//! 8       4     magic ".FIT"
//! ```
//!
//! Any header bytes beyond the first 12 are an extension region and are
//! skipped unread. The payload that follows is read into memory in one piece
//! after its declared size passes [`check_payload_size`].

use std::io::{self, Read};

use serde::Serialize;

use crate::error::Error;

/// Size of the fixed header structure.
pub const HEADER_LEN: usize = 12;

/// Magic bytes identifying a FIT file (ASCII ".FIT"), in stream order.
pub const MAGIC: [u8; 4] = [0x2E, 0x46, 0x49, 0x54];

/// Exclusive upper bound on the declared payload length (10 MiB).
///
/// Guards the payload allocation against corrupt length fields. Not a limit
/// of the format itself.
pub const MAX_PAYLOAD_LEN: usize = 10 * 1024 * 1024;

/// Validated file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    /// Declared header length in bytes, including any extension region.
    pub header_size: u8,
    /// Protocol version byte.
    pub protocol_version: u8,
    /// Profile version.
    pub profile_version: u16,
    /// Declared payload length in bytes.
    pub data_size: u32,
}

impl FileHeader {
    /// Parse and validate the fixed 12-byte structure.
    ///
    /// Only the first [`HEADER_LEN`] bytes are examined.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::TruncatedHeader {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }

        let found = [bytes[8], bytes[9], bytes[10], bytes[11]];
        if found != MAGIC {
            return Err(Error::BadMagic { found });
        }

        Ok(Self {
            header_size: bytes[0],
            protocol_version: bytes[1],
            profile_version: u16::from_le_bytes([bytes[2], bytes[3]]),
            data_size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    /// Read the header from a byte source, leaving the reader positioned at
    /// the first payload byte.
    ///
    /// A bad magic is reported before anything past the fixed structure is
    /// consumed.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut buf = Vec::with_capacity(HEADER_LEN);
        reader.by_ref().take(HEADER_LEN as u64).read_to_end(&mut buf)?;
        let header = Self::parse(&buf)?;

        let extension = header.extension_len();
        if extension > 0 {
            let skipped = io::copy(&mut reader.by_ref().take(extension as u64), &mut io::sink())?;
            if (skipped as usize) < extension {
                return Err(Error::TruncatedHeader {
                    expected: header.header_size as usize,
                    actual: HEADER_LEN + skipped as usize,
                });
            }
        } else if (header.header_size as usize) < HEADER_LEN {
            log::warn!(
                "header declares {} bytes, shorter than the {HEADER_LEN}-byte structure; continuing",
                header.header_size
            );
        }

        Ok(header)
    }

    /// Number of header bytes beyond the fixed structure.
    pub fn extension_len(&self) -> usize {
        (self.header_size as usize).saturating_sub(HEADER_LEN)
    }

    /// Declared payload length.
    pub fn payload_len(&self) -> usize {
        self.data_size as usize
    }
}

/// Reject payload lengths that are empty or at/above [`MAX_PAYLOAD_LEN`].
pub fn check_payload_size(size: usize) -> Result<(), Error> {
    if size == 0 {
        return Err(Error::PayloadEmpty);
    }
    if size >= MAX_PAYLOAD_LEN {
        return Err(Error::PayloadTooLarge {
            size,
            max: MAX_PAYLOAD_LEN,
        });
    }
    Ok(())
}

/// Read exactly the payload the header declares.
///
/// The size is bounds-checked before the buffer is allocated.
pub fn read_payload<R: Read>(reader: &mut R, header: &FileHeader) -> Result<Vec<u8>, Error> {
    let expected = header.payload_len();
    check_payload_size(expected)?;

    let mut payload = Vec::with_capacity(expected);
    let actual = reader
        .by_ref()
        .take(expected as u64)
        .read_to_end(&mut payload)?;
    if actual < expected {
        return Err(Error::Truncated { expected, actual });
    }
    Ok(payload)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
