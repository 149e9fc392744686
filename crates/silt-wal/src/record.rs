//! Log records and their on-disk encoding.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use silt_common::{Result, SiltError};

/// Log sequence number: the byte offset of a record in the log file.
///
/// LSNs increase monotonically as records are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Lsn(pub u64);

impl Lsn {
    /// Sentinel for "no LSN".
    pub const INVALID: Lsn = Lsn(u64::MAX);

    /// Returns true unless this is the sentinel.
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Returns the next LSN after advancing by the given number of bytes.
    pub fn advance(&self, bytes: u64) -> Self {
        Self(self.0 + bytes)
    }
}

impl std::fmt::Display for Lsn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lsn:{}", self.0)
    }
}

/// Kind of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogRecordType {
    /// Transaction begin.
    Begin = 1,
    /// Transaction commit.
    Commit = 2,
    /// Transaction abort/rollback.
    Abort = 3,
    /// Page update operation.
    Update = 10,
}

impl TryFrom<u8> for LogRecordType {
    type Error = SiltError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(LogRecordType::Begin),
            2 => Ok(LogRecordType::Commit),
            3 => Ok(LogRecordType::Abort),
            10 => Ok(LogRecordType::Update),
            _ => Err(SiltError::WalCorrupted {
                offset: 0,
                reason: format!("invalid record type: {}", value),
            }),
        }
    }
}

/// One record in the log.
///
/// Record format on disk:
/// - header (16 bytes):
///   - lsn: 8 bytes
///   - txn_id: 4 bytes
///   - record_type: 1 byte
///   - reserved: 1 byte
///   - payload_len: 2 bytes
/// - payload: variable length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Position of this record in the log.
    pub lsn: Lsn,
    /// Id of the owning transaction.
    pub txn_id: u32,
    /// What this record describes.
    pub record_type: LogRecordType,
    /// Opaque payload bytes.
    pub payload: Bytes,
}

impl LogRecord {
    /// Size of the record header in bytes.
    pub const HEADER_SIZE: usize = 16;
    /// Maximum payload size; the length field is 2 bytes.
    pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

    /// Creates a new log record. The LSN is assigned at append time.
    pub fn new(txn_id: u32, record_type: LogRecordType, payload: Bytes) -> Self {
        Self {
            lsn: Lsn::INVALID,
            txn_id,
            record_type,
            payload,
        }
    }

    /// Returns the total encoded size of this record in bytes.
    pub fn size_on_disk(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len()
    }

    /// Encodes the record to its on-disk representation.
    pub fn encode(&self) -> Result<Bytes> {
        if self.payload.len() > Self::MAX_PAYLOAD_SIZE {
            return Err(SiltError::WalWriteFailed(format!(
                "payload too large: {} bytes",
                self.payload.len()
            )));
        }

        let mut buf = BytesMut::with_capacity(self.size_on_disk());
        buf.put_u64_le(self.lsn.0);
        buf.put_u32_le(self.txn_id);
        buf.put_u8(self.record_type as u8);
        buf.put_u8(0); // reserved
        buf.put_u16_le(self.payload.len() as u16);
        buf.put_slice(&self.payload);

        Ok(buf.freeze())
    }

    /// Decodes a record from its on-disk representation.
    pub fn decode(mut buf: Bytes) -> Result<Self> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(SiltError::WalCorrupted {
                offset: 0,
                reason: format!("record truncated: {} bytes", buf.len()),
            });
        }

        let lsn = Lsn(buf.get_u64_le());
        let txn_id = buf.get_u32_le();
        let record_type = LogRecordType::try_from(buf.get_u8())?;
        let _reserved = buf.get_u8();
        let payload_len = buf.get_u16_le() as usize;

        if buf.len() < payload_len {
            return Err(SiltError::WalCorrupted {
                offset: lsn.0,
                reason: format!(
                    "payload truncated: expected {}, got {}",
                    payload_len,
                    buf.len()
                ),
            });
        }

        let payload = buf.split_to(payload_len);

        Ok(Self {
            lsn,
            txn_id,
            record_type,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lsn_validity() {
        assert!(Lsn(0).is_valid());
        assert!(!Lsn::INVALID.is_valid());
    }

    #[test]
    fn test_lsn_advance() {
        let lsn = Lsn(16);
        assert_eq!(lsn.advance(24), Lsn(40));
    }

    #[test]
    fn test_lsn_display() {
        assert_eq!(Lsn(128).to_string(), "lsn:128");
    }

    #[test]
    fn test_record_type_roundtrip() {
        for record_type in [
            LogRecordType::Begin,
            LogRecordType::Commit,
            LogRecordType::Abort,
            LogRecordType::Update,
        ] {
            let recovered = LogRecordType::try_from(record_type as u8).unwrap();
            assert_eq!(record_type, recovered);
        }
    }

    #[test]
    fn test_record_type_invalid() {
        assert!(LogRecordType::try_from(99).is_err());
    }

    #[test]
    fn test_record_encode_decode() {
        let mut record = LogRecord::new(
            7,
            LogRecordType::Update,
            Bytes::from_static(b"page update bytes"),
        );
        record.lsn = Lsn(64);

        let encoded = record.encode().unwrap();
        assert_eq!(encoded.len(), record.size_on_disk());

        let decoded = LogRecord::decode(encoded).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_record_empty_payload() {
        let mut record = LogRecord::new(1, LogRecordType::Commit, Bytes::new());
        record.lsn = Lsn(0);

        assert_eq!(record.size_on_disk(), LogRecord::HEADER_SIZE);

        let decoded = LogRecord::decode(record.encode().unwrap()).unwrap();
        assert_eq!(decoded.payload.len(), 0);
        assert_eq!(decoded.record_type, LogRecordType::Commit);
    }

    #[test]
    fn test_record_decode_truncated() {
        let result = LogRecord::decode(Bytes::from_static(b"short"));
        assert!(matches!(result, Err(SiltError::WalCorrupted { .. })));
    }

    #[test]
    fn test_record_payload_too_large() {
        let record = LogRecord::new(
            1,
            LogRecordType::Update,
            Bytes::from(vec![0u8; LogRecord::MAX_PAYLOAD_SIZE + 1]),
        );
        assert!(matches!(
            record.encode(),
            Err(SiltError::WalWriteFailed(_))
        ));
    }
}
