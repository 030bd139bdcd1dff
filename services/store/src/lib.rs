//! Durable order and trade store
//!
//! Provides the durable record of orders and trades behind the matching
//! engine: in-memory tables rebuilt at open from an append-only,
//! checksummed write-ahead log, with transactions that stage mutations and
//! commit them as a single atomic, fsynced log record.

pub mod error;
pub mod store;
pub mod wal;

pub use error::StoreError;
pub use store::{Store, Transaction};
pub use wal::SyncPolicy;
