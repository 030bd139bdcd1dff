//! Order lifecycle types

use crate::errors::ValidationError;
use crate::ids::OrderId;
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Parse the wire value, rejecting anything outside the vocabulary
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(ValidationError::UnknownSide(other.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Order kind
///
/// A limit order carries a price bound and may rest in the book; a market
/// order trades against whatever the book offers and never rests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Limit,
    Market,
}

impl OrderKind {
    /// Parse the wire value, rejecting anything outside the vocabulary
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "limit" => Ok(OrderKind::Limit),
            "market" => Ok(OrderKind::Market),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// Order status
///
/// Derived from `(initial_quantity, remaining_quantity, canceled?)`; see
/// [`Order::derived_status`]. `Filled` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Canceled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A standing intent to trade a quantity of the symbol
///
/// `initial_quantity` is immutable after creation; `remaining_quantity`
/// only ever decreases, and only through [`Order::fill`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub kind: OrderKind,
    pub side: Side,
    /// `None` for market orders. Serialized as an explicit null so the
    /// binary log framing stays field-aligned.
    pub price: Option<Price>,
    pub initial_quantity: Quantity,
    pub remaining_quantity: Quantity,
    pub status: OrderStatus,
}

impl Order {
    /// Create a new open order with remaining = initial
    pub fn new(
        id: OrderId,
        symbol: impl Into<String>,
        kind: OrderKind,
        side: Side,
        price: Option<Price>,
        quantity: Quantity,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            kind,
            side,
            price,
            initial_quantity: quantity,
            remaining_quantity: quantity,
            status: OrderStatus::Open,
        }
    }

    /// The status implied by the current quantities
    pub fn derived_status(&self, canceled: bool) -> OrderStatus {
        if canceled {
            OrderStatus::Canceled
        } else if self.remaining_quantity.is_zero() {
            OrderStatus::Filled
        } else if self.remaining_quantity < self.initial_quantity {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::Open
        }
    }

    /// Decrement remaining quantity and re-derive status
    ///
    /// # Panics
    /// Panics if the fill exceeds the remaining quantity
    pub fn fill(&mut self, quantity: Quantity) {
        assert!(
            quantity <= self.remaining_quantity,
            "fill exceeds remaining quantity"
        );
        self.remaining_quantity = self.remaining_quantity - quantity;
        self.status = self.derived_status(false);
    }

    /// Mark the order canceled
    pub fn cancel(&mut self) {
        self.status = OrderStatus::Canceled;
    }

    /// True while the order may still rest in the book
    pub fn is_live(&self) -> bool {
        matches!(self.status, OrderStatus::Open | OrderStatus::PartiallyFilled)
    }

    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }
}
