//! Append-only write-ahead log with checksums
//!
//! One record per committed transaction. A record that fails its CRC32C
//! check is corruption and aborts startup; an incomplete frame at the end
//! of the file is the torn write of a transaction that never committed and
//! simply ends replay.
//!
//! # Binary format (per record)
//! ```text
//! [body_len: u32]
//! [sequence: u64]
//! [timestamp: i64]
//! [payload_len: u32][payload: bytes]
//! [checksum: u32]  // CRC32C over sequence+timestamp+payload
//! ```

use crate::error::StoreError;
use crc32c::crc32c;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

// ── Framing ─────────────────────────────────────────────────────────

/// Fixed part of the body: sequence + timestamp + payload_len + checksum
const BODY_OVERHEAD: u32 = 8 + 8 + 4 + 4;

/// Upper bound on a single record body; anything larger is corruption,
/// not a transaction this system could have written.
const MAX_BODY_LEN: u32 = 16 * 1024 * 1024;

/// Controls whether commits fsync before returning.
///
/// `Never` exists for tests that churn through many commits; production
/// always runs `Always` — the commit IS the durability point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    Always,
    Never,
}

/// A single log record holding one committed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct WalRecord {
    /// Monotonic, gapless record sequence (starts at 1)
    pub sequence: u64,
    /// Commit time, Unix nanoseconds
    pub timestamp: i64,
    /// Bincode-serialized transaction payload
    pub payload: Vec<u8>,
    /// CRC32C over (sequence ++ timestamp ++ payload)
    pub checksum: u32,
}

impl WalRecord {
    /// Create a record, computing the checksum automatically.
    pub fn new(sequence: u64, timestamp: i64, payload: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(sequence, timestamp, &payload);
        Self {
            sequence,
            timestamp,
            payload,
            checksum,
        }
    }

    pub fn compute_checksum(sequence: u64, timestamp: i64, payload: &[u8]) -> u32 {
        let mut buf = Vec::with_capacity(16 + payload.len());
        buf.extend_from_slice(&sequence.to_le_bytes());
        buf.extend_from_slice(&timestamp.to_le_bytes());
        buf.extend_from_slice(payload);
        crc32c(&buf)
    }

    pub fn verify_checksum(&self) -> bool {
        self.checksum == Self::compute_checksum(self.sequence, self.timestamp, &self.payload)
    }

    /// Serialize to the binary wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload_len = self.payload.len() as u32;
        let body_len = BODY_OVERHEAD + payload_len;

        let mut buf = Vec::with_capacity(4 + body_len as usize);
        buf.extend_from_slice(&body_len.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&payload_len.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        buf
    }
}

/// Result of decoding one frame from a byte slice.
enum Frame {
    /// A full record plus the number of bytes it occupied.
    Complete(WalRecord, usize),
    /// The slice ends mid-frame (torn tail).
    Incomplete,
}

/// Decode the frame starting at `data[0]`. `offset` is only used for
/// error reporting.
fn decode_frame(data: &[u8], offset: u64) -> Result<Frame, StoreError> {
    if data.len() < 4 {
        return Ok(Frame::Incomplete);
    }

    let body_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    if body_len < BODY_OVERHEAD || body_len > MAX_BODY_LEN {
        return Err(StoreError::Corrupt {
            offset,
            detail: format!("implausible body length {}", body_len),
        });
    }

    let total = 4 + body_len as usize;
    if data.len() < total {
        return Ok(Frame::Incomplete);
    }

    let body = &data[4..total];
    let sequence = u64::from_le_bytes(body[0..8].try_into().expect("fixed slice"));
    let timestamp = i64::from_le_bytes(body[8..16].try_into().expect("fixed slice"));
    let payload_len = u32::from_le_bytes(body[16..20].try_into().expect("fixed slice"));

    if payload_len != body_len - BODY_OVERHEAD {
        return Err(StoreError::Corrupt {
            offset,
            detail: format!(
                "payload length {} disagrees with body length {}",
                payload_len, body_len
            ),
        });
    }

    let payload_end = 20 + payload_len as usize;
    let payload = body[20..payload_end].to_vec();
    let checksum = u32::from_le_bytes(
        body[payload_end..payload_end + 4]
            .try_into()
            .expect("fixed slice"),
    );

    let record = WalRecord {
        sequence,
        timestamp,
        payload,
        checksum,
    };

    if !record.verify_checksum() {
        return Err(StoreError::Corrupt {
            offset,
            detail: format!("checksum mismatch for record seq={}", record.sequence),
        });
    }

    Ok(Frame::Complete(record, total))
}

// ── Reading ─────────────────────────────────────────────────────────

/// Read every committed record from the log at `path`.
///
/// Records must be gapless and monotonic starting at 1. A torn tail is
/// silently dropped; any other malformation is fatal.
pub fn read_log(path: &Path) -> Result<Vec<WalRecord>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;

    let mut records = Vec::new();
    let mut pos = 0usize;
    while pos < data.len() {
        match decode_frame(&data[pos..], pos as u64)? {
            Frame::Complete(record, consumed) => {
                let expected = records.last().map(|r: &WalRecord| r.sequence + 1).unwrap_or(1);
                if record.sequence != expected {
                    return Err(StoreError::Sequence {
                        expected,
                        got: record.sequence,
                    });
                }
                records.push(record);
                pos += consumed;
            }
            Frame::Incomplete => break,
        }
    }
    Ok(records)
}

// ── Writing ─────────────────────────────────────────────────────────

/// Append-only log writer.
pub struct WalWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    next_sequence: u64,
    sync: SyncPolicy,
}

impl WalWriter {
    /// Open the log for appending, creating it if needed.
    ///
    /// `next_sequence` is one past the last committed record (1 for a
    /// fresh log); the caller derives it from [`read_log`].
    pub fn open(
        path: impl Into<PathBuf>,
        next_sequence: u64,
        sync: SyncPolicy,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            next_sequence,
            sync,
        })
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and make it durable per the sync policy.
    pub fn append(&mut self, record: &WalRecord) -> Result<(), StoreError> {
        if record.sequence != self.next_sequence {
            return Err(StoreError::Sequence {
                expected: self.next_sequence,
                got: record.sequence,
            });
        }

        self.writer.write_all(&record.to_bytes())?;
        self.writer.flush()?;
        if self.sync == SyncPolicy::Always {
            self.writer.get_ref().sync_all()?;
        }
        self.next_sequence += 1;
        Ok(())
    }
}
