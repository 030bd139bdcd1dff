//! Placement coordination and recovery
//!
//! The engine serializes every placement under one exclusive lock: insert
//! the taker row, match against the book, persist trades and counterparty
//! updates, rest the residual, commit. The durable commit is the source of
//! truth — if it fails, the rollback journal restores the in-memory book
//! so it never diverges from the store.

use crate::book::{BookEntry, OrderBook};
use crate::matcher::{match_taker, MatchError, RollbackJournal};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use store::{Store, StoreError};
use thiserror::Error;
use types::errors::ValidationError;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderKind, OrderStatus, Side};
use types::time::unix_nanos_now;
use types::trade::Trade;

/// A validated placement request, symbol already defaulted.
#[derive(Debug, Clone)]
pub struct PlaceRequest {
    pub symbol: String,
    pub kind: OrderKind,
    pub side: Side,
    pub price: Option<Price>,
    pub quantity: Quantity,
}

/// Result of a committed placement.
#[derive(Debug, Clone)]
pub struct Placement {
    pub order_id: OrderId,
    pub remaining_quantity: Quantity,
    pub status: OrderStatus,
    pub trades: Vec<Trade>,
}

/// Both sides of the book, in internal heap order.
#[derive(Debug, Clone, Serialize)]
pub struct BookSnapshot {
    pub buy_orders: Vec<BookEntry>,
    pub sell_orders: Vec<BookEntry>,
}

/// What recovery rebuilt, for startup logging.
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    pub orders_restored: usize,
    pub bids: usize,
    pub asks: usize,
    /// Live-status market rows left behind by partial fills; never rested.
    pub market_rows_skipped: usize,
}

#[derive(Error, Debug)]
pub enum PlaceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("market order could not be filled: no orders resting on the opposite side")]
    MarketUnfillable,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum CancelError {
    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("order {id} is already {status}")]
    AlreadyTerminal { id: OrderId, status: OrderStatus },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum RecoverError {
    #[error("order row {id} is live but unusable: {detail}")]
    CorruptRow { id: OrderId, detail: String },
}

struct EngineCore {
    book: OrderBook,
}

/// The matching engine for one symbol's book, shared across request
/// handlers as an explicit value.
pub struct Engine {
    store: Arc<Store>,
    core: Mutex<EngineCore>,
}

impl Engine {
    /// Create an engine with an empty book over `store`. Call
    /// [`Engine::recover`] before serving requests.
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            core: Mutex::new(EngineCore {
                book: OrderBook::new(),
            }),
        }
    }

    /// Rebuild the book from the store: every live limit row, id
    /// ascending, direct-inserted with a fresh enqueue sequence. Replay
    /// never re-matches — a row that rested at commit time proves no cross
    /// existed then, and inventing trades here would corrupt history.
    pub fn recover(&self) -> Result<RecoveryReport, RecoverError> {
        let mut core = self.lock_core();
        let mut report = RecoveryReport::default();

        for order in self.store.live_orders_asc() {
            if order.kind == OrderKind::Market {
                // Partial market fills keep a live durable status for
                // audit but market orders never rest.
                report.market_rows_skipped += 1;
                continue;
            }
            let price = order.price.ok_or(RecoverError::CorruptRow {
                id: order.id,
                detail: "limit order row has no price".into(),
            })?;
            match order.side {
                Side::Buy => report.bids += 1,
                Side::Sell => report.asks += 1,
            }
            report.orders_restored += 1;
            core.book.insert(price, order);
        }
        Ok(report)
    }

    /// Place an order: validate, insert the taker row, match under the
    /// lock, persist every effect in one transaction, rest the residual,
    /// commit. On any failure after matching began the rollback journal
    /// restores the book and the transaction is dropped un-committed.
    pub fn place(&self, req: PlaceRequest) -> Result<Placement, PlaceError> {
        validate(&req)?;

        let mut tx = self.store.begin();
        let mut taker = tx.insert_order(req.symbol, req.kind, req.side, req.price, req.quantity);

        let mut core = self.lock_core();
        let mut journal = RollbackJournal::new();

        let outcome = match match_taker(&mut core.book, &mut taker, &mut journal) {
            Ok(outcome) => outcome,
            Err(MatchError::MarketUnfillable) => {
                // Nothing was mutated; dropping the transaction rolls the
                // taker row back.
                return Err(PlaceError::MarketUnfillable);
            }
        };

        let traded_at = unix_nanos_now();
        let mut trades = Vec::with_capacity(outcome.fills.len());
        for fill in &outcome.fills {
            let (buy_order_id, sell_order_id) = match taker.side {
                Side::Buy => (taker.id, fill.maker_order_id),
                Side::Sell => (fill.maker_order_id, taker.id),
            };
            let trade = tx.insert_trade(
                buy_order_id,
                sell_order_id,
                taker.id,
                fill.maker_order_id,
                fill.price,
                fill.quantity,
                traded_at,
                fill.maker_initial_qty,
                fill.maker_remaining_qty,
            );
            trades.push(trade);

            let maker_status = if fill.maker_remaining_qty.is_zero() {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
            tx.update_order(fill.maker_order_id, fill.maker_remaining_qty, maker_status);
        }

        tx.update_order(taker.id, taker.remaining_quantity, taker.status);

        if outcome.should_rest {
            if let Some(price) = taker.price {
                journal.record_rested(taker.id, taker.side);
                core.book.insert(price, taker.clone());
            }
        }

        if let Err(err) = tx.commit() {
            journal.undo(&mut core.book);
            return Err(PlaceError::Storage(err));
        }

        Ok(Placement {
            order_id: taker.id,
            remaining_quantity: taker.remaining_quantity,
            status: taker.status,
            trades,
        })
    }

    /// Cancel a live order: evict it from the book if resting and persist
    /// the canceled status. Terminal orders are reported, not touched.
    pub fn cancel(&self, id: OrderId) -> Result<Order, CancelError> {
        let mut core = self.lock_core();

        let stored = self.store.order(id).ok_or(CancelError::NotFound(id))?;
        if stored.status.is_terminal() {
            return Err(CancelError::AlreadyTerminal {
                id,
                status: stored.status,
            });
        }

        let mut tx = self.store.begin();
        tx.update_order(id, stored.remaining_quantity, OrderStatus::Canceled);

        // Live market rows (partial fills) were never in the book
        let evicted = core.book.remove_by_id(stored.side, id);

        if let Err(err) = tx.commit() {
            if let Some((order, seq)) = evicted {
                if let Some(price) = order.price {
                    core.book.insert_with_seq(price, order, seq);
                }
            }
            return Err(CancelError::Storage(err));
        }

        let mut canceled = stored;
        canceled.cancel();
        Ok(canceled)
    }

    /// Current resting entries on both sides, heap order.
    pub fn book_snapshot(&self) -> BookSnapshot {
        let core = self.lock_core();
        BookSnapshot {
            buy_orders: core.book.snapshot(Side::Buy),
            sell_orders: core.book.snapshot(Side::Sell),
        }
    }

    /// Fetch a single order row.
    pub fn order(&self, id: OrderId) -> Option<Order> {
        self.store.order(id)
    }

    /// All order rows, newest first.
    pub fn orders(&self) -> Vec<Order> {
        self.store.orders_desc()
    }

    /// All trade rows in execution order.
    pub fn trades(&self) -> Vec<Trade> {
        self.store.trades_asc()
    }

    fn lock_core(&self) -> MutexGuard<'_, EngineCore> {
        self.core.lock().expect("engine lock poisoned")
    }
}

fn validate(req: &PlaceRequest) -> Result<(), ValidationError> {
    if req.quantity.is_zero() {
        return Err(ValidationError::NonPositiveQuantity);
    }
    match req.kind {
        OrderKind::Limit if req.price.is_none() => Err(ValidationError::MissingLimitPrice),
        OrderKind::Market if req.price.is_some() => Err(ValidationError::PriceOnMarketOrder),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::SyncPolicy;
    use tempfile::TempDir;

    fn engine(tmp: &TempDir) -> Engine {
        let store = Arc::new(Store::open(tmp.path(), SyncPolicy::Never).unwrap());
        Engine::new(store)
    }

    fn limit(side: Side, price: u64, qty: u64) -> PlaceRequest {
        PlaceRequest {
            symbol: "XYZ".into(),
            kind: OrderKind::Limit,
            side,
            price: Some(Price::from_u64(price)),
            quantity: Quantity::from_u64(qty),
        }
    }

    fn market(side: Side, qty: u64) -> PlaceRequest {
        PlaceRequest {
            symbol: "XYZ".into(),
            kind: OrderKind::Market,
            side,
            price: None,
            quantity: Quantity::from_u64(qty),
        }
    }

    #[test]
    fn test_validation_rejects_zero_quantity() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);

        let mut req = limit(Side::Buy, 100, 1);
        req.quantity = Quantity::zero();

        match engine.place(req) {
            Err(PlaceError::Validation(ValidationError::NonPositiveQuantity)) => {}
            other => panic!("expected validation error, got {:?}", other.map(|p| p.order_id)),
        }
        // No durable effect
        assert_eq!(engine.orders().len(), 0);
    }

    #[test]
    fn test_validation_rejects_priceless_limit() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);

        let mut req = limit(Side::Buy, 100, 1);
        req.price = None;

        assert!(matches!(
            engine.place(req),
            Err(PlaceError::Validation(ValidationError::MissingLimitPrice))
        ));
    }

    #[test]
    fn test_validation_rejects_priced_market() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);

        let mut req = market(Side::Buy, 1);
        req.price = Some(Price::from_u64(100));

        assert!(matches!(
            engine.place(req),
            Err(PlaceError::Validation(ValidationError::PriceOnMarketOrder))
        ));
    }

    #[test]
    fn test_market_unfillable_rolls_back_taker_row() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);

        match engine.place(market(Side::Buy, 1)) {
            Err(PlaceError::MarketUnfillable) => {}
            other => panic!("expected unfillable, got {:?}", other.map(|p| p.order_id)),
        }
        assert_eq!(engine.orders().len(), 0);
        assert_eq!(engine.trades().len(), 0);

        // The burned id is skipped by the next placement
        let placement = engine.place(limit(Side::Sell, 100, 1)).unwrap();
        assert_eq!(placement.order_id, OrderId::new(2));
    }

    #[test]
    fn test_cancel_resting_order() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);

        let placement = engine.place(limit(Side::Buy, 100, 10)).unwrap();
        let canceled = engine.cancel(placement.order_id).unwrap();

        assert_eq!(canceled.status, OrderStatus::Canceled);
        assert!(engine.book_snapshot().buy_orders.is_empty());
        assert_eq!(
            engine.order(placement.order_id).unwrap().status,
            OrderStatus::Canceled
        );
    }

    #[test]
    fn test_cancel_unknown_order() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);

        assert!(matches!(
            engine.cancel(OrderId::new(42)),
            Err(CancelError::NotFound(_))
        ));
    }

    #[test]
    fn test_cancel_filled_order_conflicts() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);

        engine.place(limit(Side::Sell, 100, 5)).unwrap();
        let placement = engine.place(limit(Side::Buy, 100, 5)).unwrap();
        assert_eq!(placement.status, OrderStatus::Filled);

        match engine.cancel(placement.order_id) {
            Err(CancelError::AlreadyTerminal { status, .. }) => {
                assert_eq!(status, OrderStatus::Filled);
            }
            other => panic!("expected terminal conflict, got {:?}", other.map(|o| o.id)),
        }
    }

    #[test]
    fn test_canceled_order_is_not_recovered() {
        let tmp = TempDir::new().unwrap();
        {
            let engine = engine(&tmp);
            engine.place(limit(Side::Buy, 100, 10)).unwrap();
            let placement = engine.place(limit(Side::Buy, 101, 5)).unwrap();
            engine.cancel(placement.order_id).unwrap();
        }

        let engine = engine(&tmp);
        let report = engine.recover().unwrap();
        assert_eq!(report.orders_restored, 1);
        assert_eq!(report.bids, 1);
        assert_eq!(report.asks, 0);
    }
}
