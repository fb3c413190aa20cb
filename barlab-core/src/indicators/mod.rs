//! Incremental indicator pipeline.
//!
//! Indicators are stateful nodes in an arena-allocated DAG ([`Pipeline`]).
//! Each node is updated exactly once per bar, in insertion order; a node's
//! inputs must already exist when it is added, so insertion order is a valid
//! topological order and cycles cannot be constructed.
//!
//! `f64::NAN` is the "undefined" value: every node emits NaN until its
//! warm-up is satisfied, and composites built on NaN inputs emit NaN.
//!
//! Multi-series indicators (Bollinger, MACD with signal/histogram) are
//! exposed as separate named nodes per line, keeping the single-series
//! `Indicator` trait unchanged.

pub mod atr;
pub mod bollinger;
pub mod crossover;
pub mod ema;
pub mod macd;
pub mod pipeline;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod spread;

pub use atr::Atr;
pub use bollinger::{Bollinger, BollingerBand};
pub use crossover::Crossover;
pub use ema::{Ema, EmaOf};
pub use macd::Macd;
pub use pipeline::{InputView, Pipeline, PipelineError, SeriesId};
pub use roc::Roc;
pub use rsi::Rsi;
pub use sma::{Sma, SmaOf};
pub use spread::Spread;

use crate::domain::Bar;

/// An incrementally-updated indicator node.
///
/// `update` is called once per bar after all of the node's inputs have been
/// updated for that bar. The returned value is appended to the node's series;
/// NaN means "undefined at this bar".
pub trait Indicator: Send {
    fn name(&self) -> &str;

    /// Minimum number of prior bars before this node's own state can produce
    /// a defined value. Input warm-up is inherited through NaN propagation.
    fn warmup(&self) -> usize;

    /// Handles of the series this node consumes, in slot order.
    fn inputs(&self) -> Vec<SeriesId> {
        Vec::new()
    }

    fn update(&mut self, bar: &Bar, inputs: &InputView<'_>) -> f64;
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Bar {
                symbol: "TEST".to_string(),
                timestamp: base + Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
