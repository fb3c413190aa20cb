//! Simple Moving Average (SMA).
//!
//! Rolling mean of the last `period` closes. Warm-up: period - 1.
//! `SmaOf` applies the same mean to another node's series.

use super::pipeline::{InputView, SeriesId};
use super::Indicator;
use crate::domain::Bar;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
    window: VecDeque<f64>,
    sum: f64,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
            window: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period - 1
    }

    fn update(&mut self, bar: &Bar, _inputs: &InputView<'_>) -> f64 {
        roll(&mut self.window, &mut self.sum, bar.close, self.period)
    }
}

/// SMA over another series. Undefined input values do not enter the window,
/// so the mean starts `period` defined values after the input warms up.
#[derive(Debug, Clone)]
pub struct SmaOf {
    period: usize,
    input: SeriesId,
    name: String,
    window: VecDeque<f64>,
    sum: f64,
}

impl SmaOf {
    pub fn new(input: SeriesId, period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            input,
            name: format!("sma_{period}_of_{}", input.0),
            window: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        }
    }
}

impl Indicator for SmaOf {
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
        let value = inputs.value(0);
        if value.is_nan() {
            return f64::NAN;
        }
        roll(&mut self.window, &mut self.sum, value, self.period)
    }
}

fn roll(window: &mut VecDeque<f64>, sum: &mut f64, value: f64, period: usize) -> f64 {
    if value.is_nan() {
        return f64::NAN;
    }
    window.push_back(value);
    *sum += value;
    if window.len() > period {
        if let Some(evicted) = window.pop_front() {
            *sum -= evicted;
        }
    }
    if window.len() < period {
        f64::NAN
    } else {
        *sum / period as f64
    }
}
