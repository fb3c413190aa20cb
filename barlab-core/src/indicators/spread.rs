//! Spread — the difference of two series (a - b).
//!
//! Useful as a MACD histogram, an SMA direction proxy, or the raw input to a
//! zero-line crossover. NaN inputs propagate.

use super::pipeline::{InputView, SeriesId};
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Spread {
    a: SeriesId,
    b: SeriesId,
    name: String,
}

impl Spread {
    pub fn new(a: SeriesId, b: SeriesId) -> Self {
        Self {
            a,
            b,
            name: format!("spread_{}_{}", a.0, b.0),
        }
    }
}

impl Indicator for Spread {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        0
    }

    fn inputs(&self) -> Vec<SeriesId> {
        vec![self.a, self.b]
    }

    fn update(&mut self, _bar: &Bar, inputs: &InputView<'_>) -> f64 {
        inputs.value(0) - inputs.value(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, Pipeline, Sma, DEFAULT_EPSILON};

    #[test]
    fn spread_of_two_smas() {
        let mut pipeline = Pipeline::new();
        let fast = pipeline.add(Sma::new(1)).unwrap();
        let slow = pipeline.add(Sma::new(2)).unwrap();
        let spread = pipeline.add(Spread::new(fast, slow)).unwrap();

        let bars = make_bars(&[10.0, 14.0]);
        pipeline.update(&bars[0]);
        assert!(pipeline.value(spread).is_nan()); // slow undefined
        pipeline.update(&bars[1]);
        // fast = 14, slow = 12
        assert_approx(pipeline.value(spread), 2.0, DEFAULT_EPSILON);
    }
}
