//! TradeRecord — a completed round-trip trade.

use super::ids::TradeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A complete round-trip trade record: entry → exit.
///
/// Opened when the position leaves flat, closed when it returns to flat
/// (a flip closes the old trade and opens a new one in the same fill).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: TradeId,
    pub symbol: String,

    pub entry_bar: usize,
    pub entry_timestamp: DateTime<Utc>,
    pub entry_price: f64,

    pub exit_bar: usize,
    pub exit_timestamp: DateTime<Utc>,
    pub exit_price: f64,

    /// Signed size at the trade's peak: positive long, negative short.
    pub size: f64,

    pub gross_pnl: f64,
    pub commission: f64,
    pub net_pnl: f64,

    pub bars_held: usize,
}

impl TradeRecord {
    /// Return on the trade as a fraction of entry cost.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 || self.size == 0.0 {
            return 0.0;
        }
        self.net_pnl / (self.entry_price * self.size.abs())
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }
}
