//! Trade execution types

use crate::ids::{OrderId, TradeId};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// An execution between two orders
///
/// The maker is the resting order; execution always happens at the maker's
/// quoted price. `maker_initial_qty` and `maker_remaining_qty` snapshot the
/// maker at execution time for audit. Trades are append-only and immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub maker_order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
    /// Unix nanoseconds
    pub traded_at: i64,
    pub maker_initial_qty: Quantity,
    /// Maker's remaining quantity after this execution
    pub maker_remaining_qty: Quantity,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TradeId,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        taker_order_id: OrderId,
        maker_order_id: OrderId,
        price: Price,
        quantity: Quantity,
        traded_at: i64,
        maker_initial_qty: Quantity,
        maker_remaining_qty: Quantity,
    ) -> Self {
        Self {
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
        }
    }
}
