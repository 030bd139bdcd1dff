//! Store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("write-ahead log corrupt at byte {offset}: {detail}")]
    Corrupt { offset: u64, detail: String },

    #[error("log sequence error: expected {expected}, got {got}")]
    Sequence { expected: u64, got: u64 },

    #[error("update references missing order row {id}")]
    MissingRow { id: u64 },

    #[error("commit failed (injected fault)")]
    CommitFailed,
}
