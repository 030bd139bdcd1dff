//! Price-time priority matching
//!
//! Applies an incoming taker against the opposite side of the book and
//! reports the fills it generated plus whether the residual should rest.
//! Every book mutation is recorded in a rollback journal *before* it is
//! performed, so a failed durable commit can restore the book exactly.

use crate::book::{BestEntry, OrderBook};
use thiserror::Error;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderKind, Side};

/// One execution produced by matching, before it is persisted as a trade.
#[derive(Debug, Clone)]
pub struct Fill {
    pub maker_order_id: OrderId,
    /// Always the maker's quoted price
    pub price: Price,
    pub quantity: Quantity,
    pub maker_initial_qty: Quantity,
    pub maker_remaining_qty: Quantity,
}

/// Result of applying a taker against the book.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub fills: Vec<Fill>,
    /// True when a limit taker has residual quantity; the caller inserts
    /// it into its own side after persisting.
    pub should_rest: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("market order could not be filled: no orders resting on the opposite side")]
    MarketUnfillable,
}

/// A reversible book mutation, recorded before the mutation happens.
#[derive(Debug, Clone)]
enum BookAction {
    /// Maker decremented in place; `original` is its pre-match row.
    MakerChanged { original: Order },
    /// Maker fully filled and evicted; reinsertion needs its old key.
    MakerEvicted {
        original: Order,
        price: Price,
        seq: u64,
    },
    /// Taker inserted into its own side after matching.
    TakerRested { id: OrderId, side: Side },
}

/// Journal of reversible actions for one placement.
///
/// Applied in reverse on commit failure so the in-memory book returns to
/// its pre-placement state. Evicted makers come back under their original
/// enqueue sequence and therefore their original priority.
#[derive(Debug, Default)]
pub struct RollbackJournal {
    actions: Vec<BookAction>,
}

impl RollbackJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, action: BookAction) {
        self.actions.push(action);
    }

    /// Record that the taker was inserted into the book.
    pub fn record_rested(&mut self, id: OrderId, side: Side) {
        self.record(BookAction::TakerRested { id, side });
    }

    /// Undo every recorded action, newest first.
    pub fn undo(self, book: &mut OrderBook) {
        for action in self.actions.into_iter().rev() {
            match action {
                BookAction::TakerRested { id, side } => {
                    book.remove_by_id(side, id);
                }
                BookAction::MakerEvicted {
                    original,
                    price,
                    seq,
                } => {
                    book.insert_with_seq(price, original, seq);
                }
                BookAction::MakerChanged { original } => {
                    book.replace(original);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// True when the taker is willing to trade at the maker's price.
fn crosses(taker: &Order, maker_price: Price) -> bool {
    match (taker.kind, taker.price) {
        (OrderKind::Market, _) => true,
        (OrderKind::Limit, Some(limit)) => match taker.side {
            Side::Buy => maker_price <= limit,
            Side::Sell => maker_price >= limit,
        },
        // A limit order without a price is rejected at validation and
        // cannot reach the matcher.
        (OrderKind::Limit, None) => false,
    }
}

/// Apply `taker` against the opposite side of `book`.
///
/// The caller holds the engine lock for the whole call and guarantees
/// `taker.remaining_quantity > 0`. On `Ok`, the taker's quantities and
/// status have been updated in place and the book reflects every fill; on
/// `Err` nothing was mutated.
pub fn match_taker(
    book: &mut OrderBook,
    taker: &mut Order,
    journal: &mut RollbackJournal,
) -> Result<MatchOutcome, MatchError> {
    let opposite = taker.side.opposite();
    let mut fills = Vec::new();

    while !taker.remaining_quantity.is_zero() {
        let best: BestEntry = match book.peek_best(opposite) {
            Some(best) => best,
            None => break,
        };
        if !crosses(taker, best.price) {
            break;
        }

        let quantity = taker.remaining_quantity.min(best.remaining);
        let maker_original = match book.get(best.id) {
            Some(order) => order.clone(),
            None => break,
        };
        let maker_remaining = best.remaining - quantity;

        fills.push(Fill {
            maker_order_id: best.id,
            price: best.price,
            quantity,
            maker_initial_qty: maker_original.initial_quantity,
            maker_remaining_qty: maker_remaining,
        });

        taker.fill(quantity);

        if maker_remaining.is_zero() {
            journal.record(BookAction::MakerEvicted {
                original: maker_original,
                price: best.price,
                seq: best.seq,
            });
            book.pop_best(opposite);
        } else {
            journal.record(BookAction::MakerChanged {
                original: maker_original,
            });
            book.decrement_top(opposite, quantity);
        }
    }

    match taker.kind {
        OrderKind::Market if fills.is_empty() => Err(MatchError::MarketUnfillable),
        // A market residual is discarded, never rested
        OrderKind::Market => Ok(MatchOutcome {
            fills,
            should_rest: false,
        }),
        OrderKind::Limit => {
            let should_rest = !taker.remaining_quantity.is_zero();
            Ok(MatchOutcome { fills, should_rest })
        }
    }
}
