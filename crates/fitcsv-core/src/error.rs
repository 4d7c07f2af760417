//! Error taxonomy for FIT decoding.
//!
//! Header and payload-bounds variants are fatal for the file being decoded.
//! Record-level variants (`UnknownLocalType`, `AbnormalHeaderUnsupported`)
//! are recoverable; whether they stop the decode is decided by the
//! [`ResyncPolicy`](crate::decoder::ResyncPolicy) in effect.

/// Unified error type for all decoding operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fewer bytes were available than the header structure (or its declared
    /// extension region) requires.
    #[error("truncated file header: needed {expected} bytes, got {actual}")]
    TruncatedHeader {
        /// Bytes the header declares or requires.
        expected: usize,
        /// Bytes actually read.
        actual: usize,
    },

    /// The header's magic field is not `.FIT`.
    #[error("bad magic {found:02X?}: not a FIT file")]
    BadMagic {
        /// The four bytes found in the magic position.
        found: [u8; 4],
    },

    /// The header declares an empty payload.
    #[error("header declares an empty payload")]
    PayloadEmpty,

    /// The declared payload length is at or above the allocation ceiling.
    #[error("payload too large: {size} bytes exceeds {max} byte limit")]
    PayloadTooLarge {
        /// Declared payload length.
        size: usize,
        /// Exclusive ceiling.
        max: usize,
    },

    /// The byte source ended before the declared payload length.
    #[error("truncated payload: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Declared payload length.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// A data record references a local type id with no definition yet.
    #[error("data record at offset {offset} references undefined local type {local_type}")]
    UnknownLocalType {
        /// Payload offset of the record header byte.
        offset: usize,
        /// The 4-bit local type id.
        local_type: u8,
    },

    /// A compressed-timestamp record header, which this decoder cannot frame.
    #[error("compressed timestamp header 0x{header:02X} at offset {offset} is not supported")]
    AbnormalHeaderUnsupported {
        /// Payload offset of the record header byte.
        offset: usize,
        /// The raw header byte.
        header: u8,
    },

    /// A record's declared extent runs past the end of the payload.
    #[error("record at offset {offset} needs {needed} bytes but only {available} remain")]
    TruncatedRecord {
        /// Payload offset of the record header byte.
        offset: usize,
        /// Bytes the record requires from its header byte onward.
        needed: usize,
        /// Bytes remaining in the payload from the header byte onward.
        available: usize,
    },

    /// An I/O error while reading the byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the condition concerns a single record rather than the file.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            Self::UnknownLocalType { .. } | Self::AbnormalHeaderUnsupported { .. }
        )
    }
}
