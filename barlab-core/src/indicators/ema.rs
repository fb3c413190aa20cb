//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1]
//! Seed: EMA[period-1] = SMA of first `period` close values.
//! Warm-up: period - 1.

use super::pipeline::{InputView, SeriesId};
use super::Indicator;
use crate::domain::Bar;

/// Incremental EMA state, shared by [`Ema`], [`EmaOf`], and MACD.
#[derive(Debug, Clone)]
pub(crate) struct EmaState {
    period: usize,
    alpha: f64,
    seed_sum: f64,
    seed_count: usize,
    prev: Option<f64>,
}

impl EmaState {
    pub(crate) fn new(period: usize) -> Self {
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            seed_count: 0,
            prev: None,
        }
    }

    /// Feed one value. NaN input leaves the state untouched and yields NaN.
    pub(crate) fn update(&mut self, value: f64) -> f64 {
        if value.is_nan() {
            return f64::NAN;
        }
        match self.prev {
            Some(prev) => {
                let ema = self.alpha * value + (1.0 - self.alpha) * prev;
                self.prev = Some(ema);
                ema
            }
            None => {
                self.seed_sum += value;
                self.seed_count += 1;
                if self.seed_count == self.period {
                    let seed = self.seed_sum / self.period as f64;
                    self.prev = Some(seed);
                    seed
                } else {
                    f64::NAN
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ema {
    name: String,
    state: EmaState,
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            name: format!("ema_{period}"),
            state: EmaState::new(period),
            period,
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period - 1
    }

    fn update(&mut self, bar: &Bar, _inputs: &InputView<'_>) -> f64 {
        self.state.update(bar.close)
    }
}

/// EMA over another series (e.g. the MACD signal line). Seeds once the input
/// has produced `period` defined values.
#[derive(Debug, Clone)]
pub struct EmaOf {
    input: SeriesId,
    name: String,
    state: EmaState,
    period: usize,
}

impl EmaOf {
    pub fn new(input: SeriesId, period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            input,
            name: format!("ema_{period}_of_{}", input.0),
            state: EmaState::new(period),
            period,
        }
    }
}

impl Indicator for EmaOf {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period - 1
    }

    fn inputs(&self) -> Vec<SeriesId> {
        vec![self.input]
    }

    fn update(&mut self, _bar: &Bar, inputs: &InputView<'_>) -> f64 {
        self.state.update(inputs.value(0))
    }
}
