//! Portfolio accounting — a read-only view over broker state.
//!
//! The accountant never mutates the broker. Once per bar, after matching,
//! the scheduler asks it to snapshot equity; the identity
//! `equity == cash + position.size * close` holds exactly at every point.

use crate::broker::Broker;
use crate::domain::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One equity observation, taken at a bar's close after matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    pub position_value: f64,
    pub equity: f64,
}

/// Equity-curve recorder and P&L read view.
#[derive(Debug, Clone, Default)]
pub struct Accountant {
    initial_cash: f64,
    curve: Vec<EquityPoint>,
}

impl Accountant {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            curve: Vec::new(),
        }
    }

    /// Record equity at the bar's close: cash + mark-to-market position value.
    pub fn snapshot(&mut self, broker: &Broker, bar: &Bar, bar_index: usize) {
        let cash = broker.cash();
        let position_value = broker.position().market_value(bar.close);
        self.curve.push(EquityPoint {
            bar_index,
            timestamp: bar.timestamp,
            cash,
            position_value,
            equity: cash + position_value,
        });
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn curve(&self) -> &[EquityPoint] {
        &self.curve
    }

    /// Latest recorded equity; initial cash before the first snapshot.
    pub fn equity(&self) -> f64 {
        self.curve.last().map_or(self.initial_cash, |p| p.equity)
    }

    /// Total P&L relative to starting capital.
    pub fn total_pnl(&self) -> f64 {
        self.equity() - self.initial_cash
    }

    /// Mark-to-market P&L of the open position at the given price.
    pub fn unrealized_pnl(&self, broker: &Broker, current_price: f64) -> f64 {
        broker.position().unrealized_pnl(current_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, CommissionSchema, OrderId, OrderSide, OrderSpec};
    use chrono::{Duration, TimeZone};

    fn bar_at(index: usize, open: f64, close: f64) -> Bar {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        Bar {
            symbol: "SPY".into(),
            timestamp: base + Duration::days(index as i64),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn equity_identity_holds_through_a_fill() {
        let mut broker = Broker::new("SPY", Account::new(10_000.0, CommissionSchema::free()));
        let mut accountant = Accountant::new(10_000.0);

        let bar0 = bar_at(0, 100.0, 100.0);
        broker.submit(OrderId(1), OrderSpec::market(OrderSide::Buy, 50.0), &bar0, 0);
        broker.process_bar(&bar0, 0);
        accountant.snapshot(&broker, &bar0, 0);
        assert_eq!(accountant.equity(), 10_000.0);

        let bar1 = bar_at(1, 100.0, 110.0);
        broker.process_bar(&bar1, 1);
        accountant.snapshot(&broker, &bar1, 1);

        // cash = 10000 - 50*100 = 5000; position = 50 * 110 = 5500
        let point = accountant.curve().last().unwrap();
        assert_eq!(point.cash, 5_000.0);
        assert_eq!(point.position_value, 5_500.0);
        assert_eq!(point.equity, point.cash + point.position_value);
        assert_eq!(accountant.total_pnl(), 500.0);
    }

    #[test]
    fn unrealized_pnl_reads_broker_position() {
        let mut broker = Broker::new("SPY", Account::new(10_000.0, CommissionSchema::free()));
        let accountant = Accountant::new(10_000.0);
        let bar0 = bar_at(0, 100.0, 100.0);
        broker.submit(OrderId(1), OrderSpec::market(OrderSide::Buy, 50.0), &bar0, 0);
        broker.process_bar(&bar_at(1, 100.0, 105.0), 1);
        assert_eq!(accountant.unrealized_pnl(&broker, 105.0), 250.0);
    }

    #[test]
    fn empty_curve_reports_initial_cash() {
        let accountant = Accountant::new(42_000.0);
        assert_eq!(accountant.equity(), 42_000.0);
        assert_eq!(accountant.total_pnl(), 0.0);
    }
}
