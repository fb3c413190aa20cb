//! Order types, the order lifecycle state machine, and order specs.

use super::ids::{OcoGroupId, OrderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// +1.0 for buys, -1.0 for sells.
    pub fn sign(self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }
}

/// What kind of order and its price parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderType {
    /// Fill at the next bar's open price.
    Market,
    /// Fill at the limit price or better.
    Limit { limit_price: f64 },
    /// Triggers when price reaches the stop level, then fills as market.
    Stop { stop_price: f64 },
    /// Stop whose level is re-ratcheted each bar to track favorable movement.
    /// `stop_price` is None until the order activates; from then on it only
    /// ever tightens.
    StopTrail {
        trail_amount: f64,
        stop_price: Option<f64>,
    },
}

/// Order lifecycle states.
///
/// `Created → Submitted → Accepted → {PartiallyFilled → Completed | Completed
/// | Canceled | Rejected | Margin | Expired}`. An order reaches a terminal
/// state exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Built but not yet submitted (held with transmit=false, or a dormant
    /// bracket child waiting for its parent to fill).
    Created,
    /// Handed to the broker.
    Submitted,
    /// Live and matchable.
    Accepted,
    /// Some quantity filled, remainder still working.
    PartiallyFilled,
    /// Fully filled.
    Completed,
    /// Canceled with a reason (OCO sibling resolved, user cancel, end of data).
    Canceled { reason: String },
    /// Failed validation at intake.
    Rejected { reason: String },
    /// Insufficient cash at match time.
    Margin,
    /// Time-in-force elapsed.
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed
                | OrderStatus::Canceled { .. }
                | OrderStatus::Rejected { .. }
                | OrderStatus::Margin
                | OrderStatus::Expired
        )
    }
}

/// A single order in the broker's arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub size: f64,
    pub filled_size: f64,
    /// Volume-weighted average price of the fills so far (0.0 if none).
    pub avg_fill_price: f64,
    pub status: OrderStatus,
    /// False holds the order (and its children) until an explicit release.
    pub transmit: bool,
    /// Parent order ID for bracket children.
    pub parent_id: Option<OrderId>,
    /// OCO group this order belongs to.
    pub oco_group_id: Option<OcoGroupId>,
    /// Time-in-force: past this timestamp the order expires. None = GTC.
    pub valid_until: Option<DateTime<Utc>>,
    pub created_bar: usize,
    /// Bar index when this order became matchable. Orders activated during
    /// bar T are not eligible for matching until bar T+1.
    pub activated_bar: Option<usize>,
}

impl Order {
    pub fn remaining_size(&self) -> f64 {
        self.size - self.filled_size
    }

    /// Submitted, accepted, or partially filled — matchable once activated.
    pub fn is_live(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Submitted | OrderStatus::Accepted | OrderStatus::PartiallyFilled
        )
    }

    /// Live or still held/dormant — anything a cancel request can reach.
    pub fn is_open(&self) -> bool {
        self.is_live() || self.status == OrderStatus::Created
    }
}

/// A strategy-built order specification, turned into an [`Order`] at intake.
#[derive(Debug, Clone)]
pub struct OrderSpec {
    pub side: OrderSide,
    pub size: f64,
    pub order_type: OrderType,
    pub transmit: bool,
    pub parent: Option<OrderId>,
    /// Instrument override; None targets the broker's instrument. Anything
    /// else is rejected at intake.
    pub symbol: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl OrderSpec {
    pub fn market(side: OrderSide, size: f64) -> Self {
        Self::new(side, size, OrderType::Market)
    }

    pub fn limit(side: OrderSide, size: f64, limit_price: f64) -> Self {
        Self::new(side, size, OrderType::Limit { limit_price })
    }

    pub fn stop(side: OrderSide, size: f64, stop_price: f64) -> Self {
        Self::new(side, size, OrderType::Stop { stop_price })
    }

    pub fn stop_trail(side: OrderSide, size: f64, trail_amount: f64) -> Self {
        Self::new(
            side,
            size,
            OrderType::StopTrail {
                trail_amount,
                stop_price: None,
            },
        )
    }

    fn new(side: OrderSide, size: f64, order_type: OrderType) -> Self {
        Self {
            side,
            size,
            order_type,
            transmit: true,
            parent: None,
            symbol: None,
            valid_until: None,
        }
    }

    /// Hold the order (and any children) until an explicit release.
    pub fn hold(mut self) -> Self {
        self.transmit = false;
        self
    }

    /// Attach this order as a bracket child of `parent`.
    pub fn child_of(mut self, parent: OrderId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Target a specific instrument instead of the broker's default.
    pub fn for_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Expire the order once bars pass this timestamp.
    pub fn valid_until(mut self, until: DateTime<Utc>) -> Self {
        self.valid_until = Some(until);
        self
    }
}

/// Audit trail entry for an order state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAuditEntry {
    pub order_id: OrderId,
    pub bar_index: usize,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    pub reason: String,
}
