//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|);
//! TR[0] = high[0] - low[0] (no previous close).
//! ATR uses Wilder smoothing (alpha = 1/period), seeded with the mean of the
//! first `period` true ranges. Warm-up: period - 1.

use super::pipeline::InputView;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
    prev_close: Option<f64>,
    seed_sum: f64,
    seed_count: usize,
    atr: Option<f64>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
            prev_close: None,
            seed_sum: 0.0,
            seed_count: 0,
            atr: None,
        }
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period - 1
    }

    fn update(&mut self, bar: &Bar, _inputs: &InputView<'_>) -> f64 {
        let tr = match self.prev_close {
            None => bar.high - bar.low,
            Some(pc) => (bar.high - bar.low)
                .max((bar.high - pc).abs())
                .max((bar.low - pc).abs()),
        };
        self.prev_close = Some(bar.close);

        match self.atr {
            Some(prev) => {
                let atr = (prev * (self.period as f64 - 1.0) + tr) / self.period as f64;
                self.atr = Some(atr);
                atr
            }
            None => {
                self.seed_sum += tr;
                self.seed_count += 1;
                if self.seed_count < self.period {
                    return f64::NAN;
                }
                let atr = self.seed_sum / self.period as f64;
                self.atr = Some(atr);
                atr
            }
        }
    }
}
