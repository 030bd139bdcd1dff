use matching_engine::BookSnapshot;
use serde::{Deserialize, Serialize};
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderStatus};
use types::trade::Trade;

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    /// Defaults to the configured symbol when omitted
    pub symbol: Option<String>,
    /// Raw wire value; validated against the kind vocabulary by the
    /// handler so unknown values surface as validation errors
    pub kind: String,
    /// Raw wire value; validated against the side vocabulary by the
    /// handler so unknown values surface as validation errors
    pub side: String,
    pub price: Option<Price>,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderResponse {
    pub order_id: OrderId,
    pub remaining_quantity: Quantity,
    pub status: OrderStatus,
    pub trades: Vec<Trade>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradesResponse {
    pub trades: Vec<Trade>,
}

/// Resting entries on both sides. Iteration order is the book's internal
/// heap order, not priority order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderBookResponse {
    pub buy_orders: Vec<BookEntryView>,
    pub sell_orders: Vec<BookEntryView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookEntryView {
    pub id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
}

impl From<BookSnapshot> for OrderBookResponse {
    fn from(snapshot: BookSnapshot) -> Self {
        let view = |entries: Vec<matching_engine::BookEntry>| {
            entries
                .into_iter()
                .map(|e| BookEntryView {
                    id: e.id,
                    price: e.price,
                    quantity: e.quantity,
                })
                .collect()
        };
        Self {
            buy_orders: view(snapshot.buy_orders),
            sell_orders: view(snapshot.sell_orders),
        }
    }
}
