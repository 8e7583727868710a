//! Election Sub-Protocol
//!
//! Wire formats exchanged through the group membership engine: the
//! identity each node submits when joining, and the assignment the round
//! leader broadcasts during sync.
//!
//! Every blob is an envelope: a fixed big-endian header followed by a
//! bincode body.
//!
//! ```text
//! +---------+----------+----------+-----------------+
//! | version |  length  | checksum |      body       |
//! |   u16   |   u32    |   u32    |  length bytes   |
//! +---------+----------+----------+-----------------+
//! ```

pub mod identity;
pub mod assignment;

pub use identity::{Identity, MAX_HOST_LEN};
pub use assignment::{Outcome, OutcomeStatus};

use bincode::Options;
use byteorder::{BigEndian, ByteOrder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DecodeError, Result};

/// Group protocol family; unrelated services sharing a group id are rejected
pub const PROTOCOL_TYPE: &str = "elect";

/// Sub-protocol name advertised on join
pub const SUBPROTOCOL_V0: &str = "v0";

/// Envelope format version written by this build
pub const FORMAT_VERSION: u16 = 1;

/// Largest body accepted when decoding
pub const MAX_BODY_SIZE: u32 = 64 * 1024;

/// Envelope header preceding every encoded body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    /// Format version of the body
    pub version: u16,
    /// Body length in bytes
    pub length: u32,
    /// CRC32 of the body
    pub checksum: u32,
}

impl EnvelopeHeader {
    /// Header size in bytes
    pub const SIZE: usize = 10;

    /// Create a header describing `body`
    pub fn new(body: &[u8]) -> Self {
        Self {
            version: FORMAT_VERSION,
            length: body.len() as u32,
            checksum: crc32fast::hash(body),
        }
    }

    /// Serialize header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        BigEndian::write_u16(&mut bytes[0..2], self.version);
        BigEndian::write_u32(&mut bytes[2..6], self.length);
        BigEndian::write_u32(&mut bytes[6..10], self.checksum);
        bytes
    }

    /// Deserialize header from the front of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, DecodeError> {
        if bytes.len() < Self::SIZE {
            return Err(DecodeError::Truncated {
                needed: Self::SIZE,
                available: bytes.len(),
            });
        }

        Ok(Self {
            version: BigEndian::read_u16(&bytes[0..2]),
            length: BigEndian::read_u32(&bytes[2..6]),
            checksum: BigEndian::read_u32(&bytes[6..10]),
        })
    }
}

fn body_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .with_limit(MAX_BODY_SIZE as u64)
        .reject_trailing_bytes()
}

/// Encode `value` into a versioned envelope
pub(crate) fn seal<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let body = body_options().serialize(value)?;
    let header = EnvelopeHeader::new(&body);

    let mut bytes = Vec::with_capacity(EnvelopeHeader::SIZE + body.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Decode a versioned envelope produced by [`seal`]
pub(crate) fn open<T: DeserializeOwned>(bytes: &[u8]) -> std::result::Result<T, DecodeError> {
    let header = EnvelopeHeader::from_bytes(bytes)?;

    if header.version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion(header.version));
    }

    if header.length > MAX_BODY_SIZE {
        return Err(DecodeError::Malformed(format!(
            "declared body length {} exceeds limit {}",
            header.length, MAX_BODY_SIZE
        )));
    }

    let body = &bytes[EnvelopeHeader::SIZE..];
    let length = header.length as usize;
    if body.len() < length {
        return Err(DecodeError::Truncated {
            needed: EnvelopeHeader::SIZE + length,
            available: bytes.len(),
        });
    }
    if body.len() > length {
        return Err(DecodeError::Malformed(format!(
            "{} trailing bytes after body",
            body.len() - length
        )));
    }

    if crc32fast::hash(body) != header.checksum {
        return Err(DecodeError::ChecksumMismatch);
    }

    body_options()
        .deserialize(body)
        .map_err(|e| DecodeError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_header() {
        let body = b"election body";
        let header = EnvelopeHeader::new(body);
        let restored = EnvelopeHeader::from_bytes(&header.to_bytes()).unwrap();

        assert_eq!(header, restored);
        assert_eq!(restored.version, FORMAT_VERSION);
        assert_eq!(restored.length, body.len() as u32);
    }

    #[test]
    fn test_header_is_big_endian() {
        let header = EnvelopeHeader {
            version: 1,
            length: 2,
            checksum: 3,
        };
        assert_eq!(header.to_bytes(), [0, 1, 0, 0, 0, 2, 0, 0, 0, 3]);
    }

    #[test]
    fn test_open_rejects_short_header() {
        let err = open::<String>(&[0, 1, 0]).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { needed: 10, available: 3 });
    }

    #[test]
    fn test_open_rejects_unknown_version() {
        let mut bytes = seal(&"payload".to_string()).unwrap();
        bytes[1] = 7;
        assert_eq!(
            open::<String>(&bytes).unwrap_err(),
            DecodeError::UnsupportedVersion(7)
        );
    }

    #[test]
    fn test_open_rejects_bad_lengths() {
        let bytes = seal(&"payload".to_string()).unwrap();

        // Body cut short
        let short = &bytes[..bytes.len() - 2];
        assert!(matches!(
            open::<String>(short),
            Err(DecodeError::Truncated { .. })
        ));

        // Extra bytes past the declared length
        let mut long = bytes.clone();
        long.push(0);
        assert!(matches!(open::<String>(&long), Err(DecodeError::Malformed(_))));

        // Declared length beyond the limit
        let mut huge = bytes.clone();
        BigEndian::write_u32(&mut huge[2..6], MAX_BODY_SIZE + 1);
        assert!(matches!(open::<String>(&huge), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_open_detects_corruption() {
        let mut bytes = seal(&"payload".to_string()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert_eq!(open::<String>(&bytes).unwrap_err(), DecodeError::ChecksumMismatch);
    }

    #[test]
    fn test_open_rejects_inner_length_overrun() {
        // A string whose inner length prefix claims more bytes than the body holds
        let mut body = Vec::new();
        body.extend_from_slice(&100u64.to_be_bytes());
        body.extend_from_slice(b"abc");
        let header = EnvelopeHeader::new(&body);
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&body);

        assert!(matches!(open::<String>(&bytes), Err(DecodeError::Malformed(_))));
    }
}
