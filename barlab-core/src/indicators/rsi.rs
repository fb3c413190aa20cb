//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Warm-up: period.
//! Edge case: avg_loss == 0 → RSI = 100 (avg_gain == 0 falls out to 0).

use super::pipeline::InputView;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
    prev_close: Option<f64>,
    seed_gain: f64,
    seed_loss: f64,
    changes_seen: usize,
    avg_gain: f64,
    avg_loss: f64,
    seeded: bool,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
            prev_close: None,
            seed_gain: 0.0,
            seed_loss: 0.0,
            changes_seen: 0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            seeded: false,
        }
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period
    }

    fn update(&mut self, bar: &Bar, _inputs: &InputView<'_>) -> f64 {
        let close = bar.close;
        let prev = match self.prev_close.replace(close) {
            Some(prev) => prev,
            None => return f64::NAN,
        };
        let change = close - prev;
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };

        if !self.seeded {
            self.seed_gain += gain;
            self.seed_loss += loss;
            self.changes_seen += 1;
            if self.changes_seen < self.period {
                return f64::NAN;
            }
            self.avg_gain = self.seed_gain / self.period as f64;
            self.avg_loss = self.seed_loss / self.period as f64;
            self.seeded = true;
            return compute_rsi(self.avg_gain, self.avg_loss);
        }

        // Wilder smoothing: alpha = 1/period
        let alpha = 1.0 / self.period as f64;
        self.avg_gain = alpha * gain + (1.0 - alpha) * self.avg_gain;
        self.avg_loss = alpha * loss + (1.0 - alpha) * self.avg_loss;
        compute_rsi(self.avg_gain, self.avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, Pipeline, DEFAULT_EPSILON};

    #[test]
    fn rsi_undefined_during_warmup() {
        let mut pipeline = Pipeline::new();
        let rsi = pipeline.add(Rsi::new(3)).unwrap();
        let bars = make_bars(&[10.0, 11.0, 12.0, 11.0]);
        pipeline.update(&bars[0]);
        assert!(pipeline.value(rsi).is_nan());
        pipeline.update(&bars[1]);
        assert!(pipeline.value(rsi).is_nan());
        pipeline.update(&bars[2]);
        assert!(pipeline.value(rsi).is_nan());
        pipeline.update(&bars[3]);
        assert!(pipeline.is_defined(rsi));
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let mut pipeline = Pipeline::new();
        let rsi = pipeline.add(Rsi::new(3)).unwrap();
        for bar in make_bars(&[10.0, 11.0, 12.0, 13.0]) {
            pipeline.update(&bar);
        }
        assert_approx(pipeline.value(rsi), 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let mut pipeline = Pipeline::new();
        let rsi = pipeline.add(Rsi::new(3)).unwrap();
        for bar in make_bars(&[13.0, 12.0, 11.0, 10.0]) {
            pipeline.update(&bar);
        }
        assert_approx(pipeline.value(rsi), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_seed_known_value() {
        // Changes over seed window: +2, -1, +1 → avg_gain = 1.0, avg_loss = 1/3
        // RS = 3, RSI = 100 - 100/4 = 75
        let mut pipeline = Pipeline::new();
        let rsi = pipeline.add(Rsi::new(3)).unwrap();
        for bar in make_bars(&[10.0, 12.0, 11.0, 12.0]) {
            pipeline.update(&bar);
        }
        assert_approx(pipeline.value(rsi), 75.0, DEFAULT_EPSILON);
    }
}
