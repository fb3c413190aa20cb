//! Rate of Change (ROC).
//!
//! ROC[t] = 100 * (close[t] - close[t-period]) / close[t-period]
//! Warm-up: period.

use super::pipeline::InputView;
use super::Indicator;
use crate::domain::Bar;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Roc {
    period: usize,
    name: String,
    closes: VecDeque<f64>,
}

impl Roc {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        Self {
            period,
            name: format!("roc_{period}"),
            closes: VecDeque::with_capacity(period + 2),
        }
    }
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period
    }

    fn update(&mut self, bar: &Bar, _inputs: &InputView<'_>) -> f64 {
        self.closes.push_back(bar.close);
        if self.closes.len() > self.period + 1 {
            self.closes.pop_front();
        }
        if self.closes.len() < self.period + 1 {
            return f64::NAN;
        }
        let base = self.closes[0];
        if base == 0.0 {
            return f64::NAN;
        }
        100.0 * (bar.close - base) / base
    }
}
