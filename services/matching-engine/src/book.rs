//! Price-time priority order book
//!
//! Two priority queues over one generic heap: bids outrank on higher
//! price, asks on lower price, and equal prices fall back to FIFO via a
//! monotonic enqueue sequence assigned at insertion. Wall-clock timestamps
//! are never used for ordering; at sub-millisecond arrival rates they
//! cannot break ties.
//!
//! The book owns every resting order in an id-indexed table; the heaps
//! hold `(key, id)` entries referencing it. Maker updates and cancels go
//! through the table.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::marker::PhantomData;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

/// Heap key: price plus enqueue sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryKey {
    pub price: Price,
    pub seq: u64,
}

/// Comparator for one side of the book.
///
/// `Greater` means higher matching priority. The sequence component makes
/// the order total: no two entries ever share a seq.
pub trait SidePriority {
    fn compare(a: &EntryKey, b: &EntryKey) -> Ordering;
}

/// Bids: highest price first, then FIFO.
#[derive(Debug, Clone, Copy)]
pub struct BidPriority;

impl SidePriority for BidPriority {
    fn compare(a: &EntryKey, b: &EntryKey) -> Ordering {
        a.price.cmp(&b.price).then_with(|| b.seq.cmp(&a.seq))
    }
}

/// Asks: lowest price first, then FIFO.
#[derive(Debug, Clone, Copy)]
pub struct AskPriority;

impl SidePriority for AskPriority {
    fn compare(a: &EntryKey, b: &EntryKey) -> Ordering {
        b.price.cmp(&a.price).then_with(|| b.seq.cmp(&a.seq))
    }
}

#[derive(Debug, Clone)]
struct HeapEntry<P> {
    key: EntryKey,
    id: OrderId,
    _side: PhantomData<P>,
}

impl<P> HeapEntry<P> {
    fn new(key: EntryKey, id: OrderId) -> Self {
        Self {
            key,
            id,
            _side: PhantomData,
        }
    }
}

impl<P: SidePriority> PartialEq for HeapEntry<P> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<P: SidePriority> Eq for HeapEntry<P> {}

impl<P: SidePriority> PartialOrd for HeapEntry<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P: SidePriority> Ord for HeapEntry<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        P::compare(&self.key, &other.key)
    }
}

/// One side's queue. `BinaryHeap` is a max-heap, so the comparator's
/// `Greater` surfaces at the top.
#[derive(Debug, Clone)]
struct SideQueue<P: SidePriority> {
    heap: BinaryHeap<HeapEntry<P>>,
}

impl<P: SidePriority> SideQueue<P> {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    fn push(&mut self, key: EntryKey, id: OrderId) {
        self.heap.push(HeapEntry::new(key, id));
    }

    fn peek(&self) -> Option<(EntryKey, OrderId)> {
        self.heap.peek().map(|e| (e.key, e.id))
    }

    fn pop(&mut self) -> Option<(EntryKey, OrderId)> {
        self.heap.pop().map(|e| (e.key, e.id))
    }

    /// O(n): linear scan plus heap rebuild. Cancellation only.
    fn remove(&mut self, id: OrderId) -> Option<EntryKey> {
        let mut entries = std::mem::take(&mut self.heap).into_vec();
        let removed = entries
            .iter()
            .position(|e| e.id == id)
            .map(|pos| entries.swap_remove(pos).key);
        self.heap = BinaryHeap::from(entries);
        removed
    }

    /// Entries in internal heap order, not priority order.
    fn entries(&self) -> Vec<(EntryKey, OrderId)> {
        self.heap.iter().map(|e| (e.key, e.id)).collect()
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// The highest-priority entry on a side, with its order's live quantity.
#[derive(Debug, Clone, Copy)]
pub struct BestEntry {
    pub id: OrderId,
    pub price: Price,
    pub seq: u64,
    pub remaining: Quantity,
}

/// A resting order as exposed by [`OrderBook::snapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct BookEntry {
    pub id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
}

/// In-memory book for one symbol: a bid queue, an ask queue, and the
/// table owning every resting order. Only limit orders with a price ever
/// enter. All mutation happens under the engine's exclusive lock.
#[derive(Debug, Clone)]
pub struct OrderBook {
    bids: SideQueue<BidPriority>,
    asks: SideQueue<AskPriority>,
    orders: HashMap<OrderId, Order>,
    next_seq: u64,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: SideQueue::new(),
            asks: SideQueue::new(),
            orders: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Insert a resting order with a fresh enqueue sequence; returns the
    /// sequence assigned.
    pub fn insert(&mut self, price: Price, order: Order) -> u64 {
        let seq = self.next_seq;
        self.insert_with_seq(price, order, seq);
        seq
    }

    /// Insert with an explicit sequence, preserving a prior priority
    /// position. Used when rolling back an eviction.
    pub fn insert_with_seq(&mut self, price: Price, order: Order, seq: u64) {
        let key = EntryKey { price, seq };
        match order.side {
            Side::Buy => self.bids.push(key, order.id),
            Side::Sell => self.asks.push(key, order.id),
        }
        self.orders.insert(order.id, order);
        self.next_seq = self.next_seq.max(seq + 1);
    }

    /// Highest-priority entry on `side` without removing it. O(1).
    pub fn peek_best(&self, side: Side) -> Option<BestEntry> {
        let (key, id) = match side {
            Side::Buy => self.bids.peek()?,
            Side::Sell => self.asks.peek()?,
        };
        let order = self.orders.get(&id)?;
        Some(BestEntry {
            id,
            price: key.price,
            seq: key.seq,
            remaining: order.remaining_quantity,
        })
    }

    /// Remove and return the highest-priority order on `side`, with the
    /// sequence it held. O(log n).
    pub fn pop_best(&mut self, side: Side) -> Option<(Order, u64)> {
        let (key, id) = match side {
            Side::Buy => self.bids.pop()?,
            Side::Sell => self.asks.pop()?,
        };
        let order = self.orders.remove(&id)?;
        Some((order, key.seq))
    }

    /// Decrement the top order's remaining quantity in place. Identity and
    /// queue position are preserved; only the table row mutates. Returns
    /// the new remaining quantity.
    pub fn decrement_top(&mut self, side: Side, quantity: Quantity) -> Option<Quantity> {
        let (_, id) = match side {
            Side::Buy => self.bids.peek()?,
            Side::Sell => self.asks.peek()?,
        };
        let order = self.orders.get_mut(&id)?;
        order.fill(quantity);
        Some(order.remaining_quantity)
    }

    /// Remove an order by id (cancellation). O(n). Returns the order and
    /// the sequence it held.
    pub fn remove_by_id(&mut self, side: Side, id: OrderId) -> Option<(Order, u64)> {
        let key = match side {
            Side::Buy => self.bids.remove(id)?,
            Side::Sell => self.asks.remove(id)?,
        };
        let order = self.orders.remove(&id)?;
        Some((order, key.seq))
    }

    /// Overwrite the table row for an order already queued. Rollback only:
    /// the caller restores a snapshot taken before matching mutated it.
    pub fn replace(&mut self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.orders.contains_key(&id)
    }

    /// Resting entries on `side` in internal heap order. Listing only;
    /// callers that need priority order must use `peek_best`/`pop_best`.
    pub fn snapshot(&self, side: Side) -> Vec<BookEntry> {
        let entries = match side {
            Side::Buy => self.bids.entries(),
            Side::Sell => self.asks.entries(),
        };
        entries
            .into_iter()
            .filter_map(|(key, id)| {
                self.orders.get(&id).map(|order| BookEntry {
                    id,
                    price: key.price,
                    quantity: order.remaining_quantity,
                })
            })
            .collect()
    }

    pub fn len(&self, side: Side) -> usize {
        match side {
            Side::Buy => self.bids.len(),
            Side::Sell => self.asks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::order::OrderKind;

    fn resting(id: u64, side: Side, price: u64, qty: u64) -> (Price, Order) {
        let price = Price::from_u64(price);
        let order = Order::new(
            OrderId::new(id),
            "XYZ",
            OrderKind::Limit,
            side,
            Some(price),
            Quantity::from_u64(qty),
        );
        (price, order)
    }

    fn insert(book: &mut OrderBook, id: u64, side: Side, price: u64, qty: u64) -> u64 {
        let (price, order) = resting(id, side, price, qty);
        book.insert(price, order)
    }

    #[test]
    fn test_best_bid_is_highest_price() {
        let mut book = OrderBook::new();
        insert(&mut book, 1, Side::Buy, 100, 1);
        insert(&mut book, 2, Side::Buy, 102, 1);
        insert(&mut book, 3, Side::Buy, 101, 1);

        let best = book.peek_best(Side::Buy).unwrap();
        assert_eq!(best.id, OrderId::new(2));
        assert_eq!(best.price, Price::from_u64(102));
    }

    #[test]
    fn test_best_ask_is_lowest_price() {
        let mut book = OrderBook::new();
        insert(&mut book, 1, Side::Sell, 102, 1);
        insert(&mut book, 2, Side::Sell, 100, 1);
        insert(&mut book, 3, Side::Sell, 101, 1);

        let best = book.peek_best(Side::Sell).unwrap();
        assert_eq!(best.id, OrderId::new(2));
        assert_eq!(best.price, Price::from_u64(100));
    }

    #[test]
    fn test_fifo_at_equal_price() {
        let mut book = OrderBook::new();
        insert(&mut book, 1, Side::Buy, 100, 1);
        insert(&mut book, 2, Side::Buy, 100, 1);
        insert(&mut book, 3, Side::Buy, 100, 1);

        let (first, _) = book.pop_best(Side::Buy).unwrap();
        let (second, _) = book.pop_best(Side::Buy).unwrap();
        let (third, _) = book.pop_best(Side::Buy).unwrap();
        assert_eq!(first.id, OrderId::new(1));
        assert_eq!(second.id, OrderId::new(2));
        assert_eq!(third.id, OrderId::new(3));
    }

    #[test]
    fn test_pop_drains_in_priority_order() {
        let mut book = OrderBook::new();
        insert(&mut book, 1, Side::Sell, 101, 1);
        insert(&mut book, 2, Side::Sell, 100, 1);
        insert(&mut book, 3, Side::Sell, 100, 1);
        insert(&mut book, 4, Side::Sell, 99, 1);

        let ids: Vec<u64> = std::iter::from_fn(|| book.pop_best(Side::Sell))
            .map(|(o, _)| o.id.as_u64())
            .collect();
        assert_eq!(ids, vec![4, 2, 3, 1]);
    }

    #[test]
    fn test_decrement_top_preserves_identity_and_position() {
        let mut book = OrderBook::new();
        insert(&mut book, 1, Side::Buy, 100, 10);
        insert(&mut book, 2, Side::Buy, 100, 5);

        let remaining = book.decrement_top(Side::Buy, Quantity::from_u64(4)).unwrap();
        assert_eq!(remaining, Quantity::from_u64(6));

        // Same order still at the head with the reduced quantity
        let best = book.peek_best(Side::Buy).unwrap();
        assert_eq!(best.id, OrderId::new(1));
        assert_eq!(best.remaining, Quantity::from_u64(6));
    }

    #[test]
    fn test_remove_by_id() {
        let mut book = OrderBook::new();
        insert(&mut book, 1, Side::Sell, 100, 1);
        insert(&mut book, 2, Side::Sell, 101, 2);

        let (removed, _) = book.remove_by_id(Side::Sell, OrderId::new(2)).unwrap();
        assert_eq!(removed.id, OrderId::new(2));
        assert_eq!(book.len(Side::Sell), 1);
        assert!(!book.contains(OrderId::new(2)));

        assert!(book.remove_by_id(Side::Sell, OrderId::new(99)).is_none());
        // A failed removal must not disturb the queue
        assert_eq!(book.len(Side::Sell), 1);
    }

    #[test]
    fn test_reinsert_with_original_seq_restores_priority() {
        let mut book = OrderBook::new();
        insert(&mut book, 1, Side::Buy, 100, 1);
        insert(&mut book, 2, Side::Buy, 100, 1);

        // Evict the head, then restore it with its original sequence
        let (order, seq) = book.pop_best(Side::Buy).unwrap();
        assert_eq!(order.id, OrderId::new(1));
        book.insert_with_seq(Price::from_u64(100), order, seq);

        let best = book.peek_best(Side::Buy).unwrap();
        assert_eq!(best.id, OrderId::new(1));
    }

    #[test]
    fn test_snapshot_contains_all_entries() {
        let mut book = OrderBook::new();
        insert(&mut book, 1, Side::Buy, 100, 10);
        insert(&mut book, 2, Side::Buy, 101, 5);
        insert(&mut book, 3, Side::Sell, 105, 2);

        let bids = book.snapshot(Side::Buy);
        assert_eq!(bids.len(), 2);
        let mut ids: Vec<u64> = bids.iter().map(|e| e.id.as_u64()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);

        let asks = book.snapshot(Side::Sell);
        assert_eq!(asks.len(), 1);
        assert_eq!(asks[0].quantity, Quantity::from_u64(2));
    }

    #[test]
    fn test_empty_book() {
        let mut book = OrderBook::new();
        assert!(book.is_empty());
        assert!(book.peek_best(Side::Buy).is_none());
        assert!(book.pop_best(Side::Sell).is_none());
        assert!(book.decrement_top(Side::Buy, Quantity::from_u64(1)).is_none());
    }
}
