//! Order matching engine
//!
//! Continuous double-auction matching for a single symbol with price-time
//! priority, atomic placement against the durable store, and
//! recovery of the in-memory book from persisted state.
//!
//! **Key invariants:**
//! - Price-time priority strictly enforced; ties broken by enqueue order
//! - Trades always execute at the resting (maker) order's price
//! - Market orders never rest in the book
//! - After every committed placement, book and store agree on every
//!   resting order's remaining quantity

pub mod book;
pub mod engine;
pub mod matcher;

pub use book::{BookEntry, OrderBook};
pub use engine::{
    BookSnapshot, CancelError, Engine, PlaceError, PlaceRequest, Placement, RecoverError,
    RecoveryReport,
};
