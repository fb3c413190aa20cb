//! The indicator arena — node storage, series storage, per-bar evaluation.

use super::Indicator;
use crate::domain::Bar;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle to an indicator series in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesId(pub usize);

/// Pipeline construction errors. Both indicate a construction bug and are
/// fatal — the graph cannot be partially wired.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("indicator input {input} does not exist (arena has {len} nodes)")]
    UnknownInput { input: usize, len: usize },

    #[error("indicators cannot be added after replay has started")]
    AddAfterStart,
}

/// Read access to a node's input series during `update`.
///
/// Slots are the positions in the node's `inputs()` declaration. Because
/// nodes are evaluated in topological order, slot values are already
/// up-to-date for the current bar.
pub struct InputView<'a> {
    series: &'a [Vec<f64>],
    ids: &'a [SeriesId],
}

impl InputView<'_> {
    /// Current-bar value of input `slot`. NaN if undefined.
    pub fn value(&self, slot: usize) -> f64 {
        self.value_at(slot, 0)
    }

    /// Lagged value of input `slot`; `offset` must be <= 0 (0 = current bar).
    pub fn value_at(&self, slot: usize, offset: i64) -> f64 {
        debug_assert!(offset <= 0, "indicator lookback offsets must be <= 0");
        let SeriesId(idx) = self.ids[slot];
        series_value_at(&self.series[idx], offset)
    }
}

fn series_value_at(series: &[f64], offset: i64) -> f64 {
    if offset > 0 {
        return f64::NAN;
    }
    let len = series.len() as i64;
    let index = len - 1 + offset;
    if index < 0 {
        f64::NAN
    } else {
        series[index as usize]
    }
}

/// Arena of indicator nodes plus one value series per node.
#[derive(Default)]
pub struct Pipeline {
    nodes: Vec<Box<dyn Indicator>>,
    node_inputs: Vec<Vec<SeriesId>>,
    series: Vec<Vec<f64>>,
    bars_seen: usize,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the arena, validating that all of its inputs already
    /// exist. Returns the handle for the node's series.
    ///
    /// The graph is sealed once replay starts: topology is computed exactly
    /// once, at construction.
    pub fn add<I: Indicator + 'static>(&mut self, node: I) -> Result<SeriesId, PipelineError> {
        if self.bars_seen > 0 {
            return Err(PipelineError::AddAfterStart);
        }
        let inputs = node.inputs();
        for &SeriesId(input) in &inputs {
            if input >= self.nodes.len() {
                return Err(PipelineError::UnknownInput {
                    input,
                    len: self.nodes.len(),
                });
            }
        }
        let id = SeriesId(self.nodes.len());
        self.nodes.push(Box::new(node));
        self.node_inputs.push(inputs);
        self.series.push(Vec::new());
        Ok(id)
    }

    /// Advance every node by one bar, in topological (insertion) order.
    pub fn update(&mut self, bar: &Bar) {
        for i in 0..self.nodes.len() {
            let value = {
                let view = InputView {
                    series: &self.series,
                    ids: &self.node_inputs[i],
                };
                self.nodes[i].update(bar, &view)
            };
            self.series[i].push(value);
        }
        self.bars_seen += 1;
    }

    /// Current-bar value of a series. NaN while undefined.
    pub fn value(&self, id: SeriesId) -> f64 {
        self.value_at(id, 0)
    }

    /// Lagged value of a series; `offset` must be <= 0 (0 = current,
    /// -1 = previous bar, ...). NaN outside recorded history.
    pub fn value_at(&self, id: SeriesId, offset: i64) -> f64 {
        series_value_at(&self.series[id.0], offset)
    }

    /// Whether the series has a defined (non-NaN) value at the current bar.
    pub fn is_defined(&self, id: SeriesId) -> bool {
        !self.value(id).is_nan()
    }

    pub fn name(&self, id: SeriesId) -> &str {
        self.nodes[id.0].name()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }
}
