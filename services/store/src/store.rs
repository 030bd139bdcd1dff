//! Order and trade tables with atomic transactions
//!
//! The tables live in memory and are rebuilt from the write-ahead log at
//! open; the log is the single source of durability. A transaction stages
//! its mutations and commits them as one log record, so a placement's
//! order insert, maker updates, and trades become durable together or not
//! at all. Ids are assigned at staging time and burn on rollback, like SQL
//! auto-increment.

use crate::error::StoreError;
use crate::wal::{read_log, SyncPolicy, WalRecord, WalWriter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use types::ids::{OrderId, TradeId};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderKind, OrderStatus, Side};
use types::time::unix_nanos_now;
use types::trade::Trade;

const WAL_FILE: &str = "wal.bin";

// ── Transaction Ops ─────────────────────────────────────────────────

/// One staged table mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum TxOp {
    InsertOrder(Order),
    UpdateOrder {
        id: OrderId,
        remaining_quantity: Quantity,
        status: OrderStatus,
    },
    InsertTrade(Trade),
}

/// The unit persisted per commit: every op of one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TxPayload {
    ops: Vec<TxOp>,
}

// ── Store ───────────────────────────────────────────────────────────

struct StoreInner {
    orders: BTreeMap<OrderId, Order>,
    trades: BTreeMap<TradeId, Trade>,
    next_order_id: u64,
    next_trade_id: u64,
    wal: WalWriter,
    fail_next_commit: bool,
}

impl StoreInner {
    fn apply(&mut self, op: TxOp) -> Result<(), StoreError> {
        match op {
            TxOp::InsertOrder(order) => {
                self.next_order_id = self.next_order_id.max(order.id.as_u64() + 1);
                self.orders.insert(order.id, order);
            }
            TxOp::UpdateOrder {
                id,
                remaining_quantity,
                status,
            } => {
                let row = self
                    .orders
                    .get_mut(&id)
                    .ok_or(StoreError::MissingRow { id: id.as_u64() })?;
                row.remaining_quantity = remaining_quantity;
                row.status = status;
            }
            TxOp::InsertTrade(trade) => {
                self.next_trade_id = self.next_trade_id.max(trade.id.as_u64() + 1);
                self.trades.insert(trade.id, trade);
            }
        }
        Ok(())
    }
}

/// Durable store for one engine instance.
///
/// Thread-safe behind an internal mutex; each placement runs exactly one
/// transaction against it.
pub struct Store {
    inner: Mutex<StoreInner>,
}

impl Store {
    /// Open the store under `dir`, replaying the write-ahead log into the
    /// tables. Corruption anywhere but a torn tail is fatal.
    pub fn open(dir: impl AsRef<Path>, sync: SyncPolicy) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(WAL_FILE);

        let records = read_log(&path)?;
        let next_sequence = records.last().map(|r| r.sequence + 1).unwrap_or(1);

        let mut inner = StoreInner {
            orders: BTreeMap::new(),
            trades: BTreeMap::new(),
            next_order_id: 1,
            next_trade_id: 1,
            wal: WalWriter::open(path, next_sequence, sync)?,
            fail_next_commit: false,
        };

        for record in records {
            let payload: TxPayload = bincode::deserialize(&record.payload).map_err(|e| {
                StoreError::Corrupt {
                    offset: 0,
                    detail: format!("undecodable payload in record seq={}: {}", record.sequence, e),
                }
            })?;
            for op in payload.ops {
                inner.apply(op)?;
            }
        }

        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Begin a transaction. Dropping it without commit discards every
    /// staged op (assigned ids stay burned).
    pub fn begin(&self) -> Transaction<'_> {
        Transaction {
            store: self,
            ops: Vec::new(),
        }
    }

    /// Arm a one-shot commit failure. The next `commit` returns
    /// `StoreError::CommitFailed` without writing anything; used by
    /// crash-consistency tests to drive the rollback path.
    pub fn fail_next_commit(&self) {
        self.lock().fail_next_commit = true;
    }

    /// Fetch a single order row.
    pub fn order(&self, id: OrderId) -> Option<Order> {
        self.lock().orders.get(&id).cloned()
    }

    /// All order rows, newest first.
    pub fn orders_desc(&self) -> Vec<Order> {
        self.lock().orders.values().rev().cloned().collect()
    }

    /// All trade rows in execution order.
    pub fn trades_asc(&self) -> Vec<Trade> {
        self.lock().trades.values().cloned().collect()
    }

    /// Orders that may still rest in the book (status open or
    /// partially_filled), id ascending. This is the recovery scan: id
    /// order reproduces the relative time priority of resting orders.
    pub fn live_orders_asc(&self) -> Vec<Order> {
        self.lock()
            .orders
            .values()
            .filter(|o| o.is_live())
            .cloned()
            .collect()
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    pub fn trade_count(&self) -> usize {
        self.lock().trades.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("store lock poisoned")
    }
}

// ── Transaction ─────────────────────────────────────────────────────

/// A transaction staging mutations against the store.
pub struct Transaction<'a> {
    store: &'a Store,
    ops: Vec<TxOp>,
}

impl Transaction<'_> {
    /// Stage an order insert. The id is assigned immediately and the new
    /// open row (remaining = initial) is returned.
    pub fn insert_order(
        &mut self,
        symbol: impl Into<String>,
        kind: OrderKind,
        side: Side,
        price: Option<Price>,
        quantity: Quantity,
    ) -> Order {
        let id = {
            let mut inner = self.store.lock();
            let id = inner.next_order_id;
            inner.next_order_id += 1;
            OrderId::new(id)
        };
        let order = Order::new(id, symbol, kind, side, price, quantity);
        self.ops.push(TxOp::InsertOrder(order.clone()));
        order
    }

    /// Stage an update of an order row's mutable columns.
    pub fn update_order(&mut self, id: OrderId, remaining_quantity: Quantity, status: OrderStatus) {
        self.ops.push(TxOp::UpdateOrder {
            id,
            remaining_quantity,
            status,
        });
    }

    /// Stage a trade insert. The id is assigned immediately and the full
    /// row is returned.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_trade(
        &mut self,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        taker_order_id: OrderId,
        maker_order_id: OrderId,
        price: Price,
        quantity: Quantity,
        traded_at: i64,
        maker_initial_qty: Quantity,
        maker_remaining_qty: Quantity,
    ) -> Trade {
        let id = {
            let mut inner = self.store.lock();
            let id = inner.next_trade_id;
            inner.next_trade_id += 1;
            TradeId::new(id)
        };
        let trade = Trade::new(
            id,
            buy_order_id,
            sell_order_id,
            taker_order_id,
            maker_order_id,
            price,
            quantity,
            traded_at,
            maker_initial_qty,
            maker_remaining_qty,
        );
        self.ops.push(TxOp::InsertTrade(trade.clone()));
        trade
    }

    /// Make every staged op durable as one log record, then apply it to
    /// the tables. On error nothing is applied and the caller must treat
    /// the transaction as rolled back.
    pub fn commit(self) -> Result<(), StoreError> {
        let mut inner = self.store.lock();

        if inner.fail_next_commit {
            inner.fail_next_commit = false;
            return Err(StoreError::CommitFailed);
        }
        if self.ops.is_empty() {
            return Ok(());
        }

        let payload = TxPayload { ops: self.ops };
        let bytes =
            bincode::serialize(&payload).map_err(|e| StoreError::Encode(e.to_string()))?;
        let record = WalRecord::new(inner.wal.next_sequence(), unix_nanos_now(), bytes);
        inner.wal.append(&record)?;

        for op in payload.ops {
            inner.apply(op)?;
        }
        Ok(())
    }
}
