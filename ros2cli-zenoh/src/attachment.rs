//! Request metadata carried next to service queries and samples.
//!
//! A client stamps each query with its sequence number, the send time and its
//! GID; the server echoes the sequence number so replies can be matched. The
//! 33-byte layout, little endian:
//!
//! ```text
//! 0..8    sequence number (i64)
//! 8..16   send time, ns since the UNIX epoch (i64)
//! 16      GID length, always 16
//! 17..33  GID
//! ```

use crate::error::{Error, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Encoded size.
pub const ATTACHMENT_SIZE: usize = 33;

/// GID size.
pub const GID_SIZE: usize = 16;

/// Metadata of one query, reply or sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Per-sender counter
    pub sequence_number: i64,
    /// Send time in nanoseconds
    pub timestamp_ns: i64,
    /// Sender GID
    pub gid: [u8; GID_SIZE],
}

impl Attachment {
    /// Metadata of a query sent now.
    pub fn new(sequence_number: i64, gid: [u8; GID_SIZE]) -> Self {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            sequence_number,
            timestamp_ns: i64::try_from(now.as_nanos()).unwrap_or(i64::MAX),
            gid,
        }
    }

    /// Wire form.
    pub fn to_bytes(&self) -> [u8; ATTACHMENT_SIZE] {
        let mut bytes = [0u8; ATTACHMENT_SIZE];
        bytes[0..8].copy_from_slice(&self.sequence_number.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.timestamp_ns.to_le_bytes());
        bytes[16] = GID_SIZE as u8;
        bytes[17..33].copy_from_slice(&self.gid);
        bytes
    }

    /// Decode the metadata of a reply or sample.
    ///
    /// # Errors
    ///
    /// `InvalidAttachment` when the buffer is short or the GID length byte
    /// is not 16.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let Some(bytes) = bytes.get(..ATTACHMENT_SIZE) else {
            return Err(Error::InvalidAttachment(format!(
                "expected {ATTACHMENT_SIZE} bytes, got {}",
                bytes.len()
            )));
        };
        if usize::from(bytes[16]) != GID_SIZE {
            return Err(Error::InvalidAttachment(format!(
                "GID length {} instead of {GID_SIZE}",
                bytes[16]
            )));
        }
        let word = |range: std::ops::Range<usize>| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[range]);
            i64::from_le_bytes(buf)
        };
        let mut gid = [0u8; GID_SIZE];
        gid.copy_from_slice(&bytes[17..]);
        Ok(Self {
            sequence_number: word(0..8),
            timestamp_ns: word(8..16),
            gid,
        })
    }
}

/// A fresh random client GID.
pub fn generate_gid() -> [u8; GID_SIZE] {
    *uuid::Uuid::new_v4().as_bytes()
}
