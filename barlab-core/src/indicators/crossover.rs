//! Crossover — signals the bar where the sign of (A - B) flips.
//!
//! Emits +1.0 on an upward cross, -1.0 on a downward cross, 0.0 otherwise.
//! Fires exactly once per actual sign change and never re-signals while the
//! sign is unchanged. Undefined while either input is undefined; the sign
//! state carries through bars where A == B.

use super::pipeline::{InputView, SeriesId};
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Crossover {
    a: SeriesId,
    b: SeriesId,
    name: String,
    last_sign: f64,
}

impl Crossover {
    pub fn new(a: SeriesId, b: SeriesId) -> Self {
        Self {
            a,
            b,
            name: format!("crossover_{}_{}", a.0, b.0),
            last_sign: 0.0,
        }
    }
}

impl Indicator for Crossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        1
    }

    fn inputs(&self) -> Vec<SeriesId> {
        vec![self.a, self.b]
    }

    fn update(&mut self, _bar: &Bar, inputs: &InputView<'_>) -> f64 {
        let a = inputs.value(0);
        let b = inputs.value(1);
        if a.is_nan() || b.is_nan() {
            return f64::NAN;
        }
        let diff = a - b;
        let sign = if diff > 0.0 {
            1.0
        } else if diff < 0.0 {
            -1.0
        } else {
            0.0
        };

        let mut signal = 0.0;
        if sign != 0.0 {
            if self.last_sign != 0.0 && sign != self.last_sign {
                signal = sign;
            }
            self.last_sign = sign;
        }
        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_bars, Pipeline, Sma};

    fn run(closes: &[f64], fast_period: usize, slow_period: usize) -> Vec<f64> {
        let mut pipeline = Pipeline::new();
        let fast = pipeline.add(Sma::new(fast_period)).unwrap();
        let slow = pipeline.add(Sma::new(slow_period)).unwrap();
        let cross = pipeline.add(Crossover::new(fast, slow)).unwrap();
        make_bars(closes)
            .iter()
            .map(|bar| {
                pipeline.update(bar);
                pipeline.value(cross)
            })
            .collect()
    }

    #[test]
    fn fires_once_per_sign_change() {
        // close vs SMA(2): starts below, rises above, stays above, drops below.
        let signals = run(&[10.0, 8.0, 14.0, 15.0, 16.0, 8.0, 7.0], 1, 2);
        let ups = signals.iter().filter(|&&s| s == 1.0).count();
        let downs = signals.iter().filter(|&&s| s == -1.0).count();
        assert_eq!(ups, 1);
        assert_eq!(downs, 1);
    }

    #[test]
    fn no_repeat_fire_while_sign_stable() {
        let signals = run(&[10.0, 8.0, 14.0, 15.0, 16.0, 17.0], 1, 2);
        // After the single up-cross, every later bar must be 0.
        let cross_at = signals.iter().position(|&s| s == 1.0).unwrap();
        assert!(signals[cross_at + 1..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn undefined_while_inputs_undefined() {
        let signals = run(&[10.0, 11.0, 12.0, 13.0], 1, 3);
        // slow SMA(3) is undefined for the first two bars
        assert!(signals[0].is_nan());
        assert!(signals[1].is_nan());
    }

    #[test]
    fn no_signal_on_first_defined_bar() {
        let signals = run(&[10.0, 20.0], 1, 2);
        // First defined diff establishes the sign without firing.
        assert_eq!(signals[1], 0.0);
    }
}
