//! Bollinger Bands — moving average +/- standard deviation multiplier.
//!
//! Three bands (separate nodes):
//! - Middle: SMA(close, period)
//! - Upper: middle + mult * stddev(close, period)
//! - Lower: middle - mult * stddev(close, period)
//!
//! Uses population stddev (divide by N). Warm-up: period - 1.

use super::pipeline::InputView;
use super::Indicator;
use crate::domain::Bar;
use std::collections::VecDeque;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
    window: VecDeque<f64>,
}

impl Bollinger {
    pub fn upper(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BollingerBand::Upper)
    }

    pub fn middle(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BollingerBand::Middle)
    }

    pub fn lower(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BollingerBand::Lower)
    }

    fn new(period: usize, multiplier: f64, band: BollingerBand) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        let label = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            multiplier,
            band,
            name: format!("bollinger_{label}_{period}_{multiplier}"),
            window: VecDeque::with_capacity(period + 1),
        }
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period - 1
    }

    fn update(&mut self, bar: &Bar, _inputs: &InputView<'_>) -> f64 {
        self.window.push_back(bar.close);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
        if self.window.len() < self.period {
            return f64::NAN;
        }

        let n = self.period as f64;
        let mean: f64 = self.window.iter().sum::<f64>() / n;
        match self.band {
            BollingerBand::Middle => mean,
            _ => {
                let variance: f64 =
                    self.window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
                let stddev = variance.sqrt();
                match self.band {
                    BollingerBand::Upper => mean + self.multiplier * stddev,
                    BollingerBand::Lower => mean - self.multiplier * stddev,
                    BollingerBand::Middle => unreachable!(),
                }
            }
        }
    }
}
