//! Moving Average Convergence Divergence (MACD), macd line only.
//!
//! macd = EMA(close, fast) - EMA(close, slow), defined once the slow EMA is.
//! The signal line is `EmaOf` applied to this node's series; the histogram is
//! `Spread` of the two. Warm-up: slow_period - 1.

use super::ema::EmaState;
use super::pipeline::InputView;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Macd {
    name: String,
    fast: EmaState,
    slow: EmaState,
    slow_period: usize,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        assert!(
            fast_period >= 1 && slow_period > fast_period,
            "MACD requires 1 <= fast < slow"
        );
        Self {
            name: format!("macd_{fast_period}_{slow_period}"),
            fast: EmaState::new(fast_period),
            slow: EmaState::new(slow_period),
            slow_period,
        }
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.slow_period - 1
    }

    fn update(&mut self, bar: &Bar, _inputs: &InputView<'_>) -> f64 {
        let fast = self.fast.update(bar.close);
        let slow = self.slow.update(bar.close);
        fast - slow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, Crossover, Ema, EmaOf, Pipeline, DEFAULT_EPSILON};

    #[test]
    fn macd_is_fast_minus_slow() {
        let mut pipeline = Pipeline::new();
        let fast = pipeline.add(Ema::new(3)).unwrap();
        let slow = pipeline.add(Ema::new(5)).unwrap();
        let macd = pipeline.add(Macd::new(3, 5)).unwrap();

        for bar in make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 13.0]) {
            pipeline.update(&bar);
        }
        let expected = pipeline.value(fast) - pipeline.value(slow);
        assert_approx(pipeline.value(macd), expected, DEFAULT_EPSILON);
    }

    #[test]
    fn macd_undefined_until_slow_seeds() {
        let mut pipeline = Pipeline::new();
        let macd = pipeline.add(Macd::new(2, 4)).unwrap();
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        for (i, bar) in bars.iter().enumerate() {
            pipeline.update(bar);
            if i < 3 {
                assert!(pipeline.value(macd).is_nan(), "bar {i} should be undefined");
            } else {
                assert!(pipeline.is_defined(macd), "bar {i} should be defined");
            }
        }
    }

    #[test]
    fn macd_signal_cross_wires_up() {
        // The classic stack: macd line, signal = EMA(macd), cross of the two.
        let mut pipeline = Pipeline::new();
        let macd = pipeline.add(Macd::new(3, 6)).unwrap();
        let signal = pipeline.add(EmaOf::new(macd, 3)).unwrap();
        let cross = pipeline.add(Crossover::new(macd, signal)).unwrap();

        let mut closes: Vec<f64> = (0..12).map(|i| 100.0 - i as f64).collect();
        closes.extend((0..12).map(|i| 89.0 + 2.0 * i as f64));
        let mut fired_up = 0;
        for bar in make_bars(&closes) {
            pipeline.update(&bar);
            if pipeline.value(cross) == 1.0 {
                fired_up += 1;
            }
        }
        // Downtrend then uptrend → exactly one upward macd/signal cross.
        assert_eq!(fired_up, 1);
    }
}
