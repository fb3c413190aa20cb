use serde::{Deserialize, Serialize};

/// Position tracking. Size is signed: positive long, negative short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub size: f64,
    pub avg_entry_price: f64,
}

impl Position {
    pub fn flat(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            size: 0.0,
            avg_entry_price: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.size == 0.0
    }

    pub fn is_long(&self) -> bool {
        self.size > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.size < 0.0
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.size * current_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.size * (current_price - self.avg_entry_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_position() {
        let pos = Position::flat("SPY");
        assert!(pos.is_flat());
        assert!(!pos.is_long());
        assert!(!pos.is_short());
        assert_eq!(pos.market_value(100.0), 0.0);
    }

    #[test]
    fn long_unrealized_pnl() {
        let pos = Position {
            symbol: "SPY".into(),
            size: 100.0,
            avg_entry_price: 50.0,
        };
        assert_eq!(pos.unrealized_pnl(55.0), 500.0);
        assert_eq!(pos.market_value(55.0), 5500.0);
    }

    #[test]
    fn short_unrealized_pnl() {
        let pos = Position {
            symbol: "SPY".into(),
            size: -100.0,
            avg_entry_price: 50.0,
        };
        // price falls → short profits
        assert_eq!(pos.unrealized_pnl(45.0), 500.0);
    }
}
