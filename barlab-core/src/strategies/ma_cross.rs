//! EMA crossover entry with a protective bracket exit.
//!
//! Entry: fast EMA crosses above slow EMA while flat. The entry is held
//! (`transmit=false`), a protective child is attached — either a fixed stop a
//! fraction below the signal close, or a trailing stop — and the group is
//! released as one. A fresh signal while an entry is still pending cancels
//! the stale entry first.

use crate::domain::{OrderId, OrderSide, OrderSpec};
use crate::engine::{Context, Strategy};
use crate::indicators::{Crossover, Ema, Pipeline, PipelineError, SeriesId};

#[derive(Debug, Clone)]
pub struct MaCrossParams {
    pub fast: usize,
    pub slow: usize,
    /// Order size in units of the instrument.
    pub size: f64,
    /// Fixed stop distance as a fraction of the signal close (e.g. 0.02).
    pub stop_loss: f64,
    /// Trailing distance in price units; overrides the fixed stop when set.
    pub trail: Option<f64>,
}

impl Default for MaCrossParams {
    fn default() -> Self {
        Self {
            fast: 10,
            slow: 20,
            size: 100.0,
            stop_loss: 0.02,
            trail: None,
        }
    }
}

pub struct MaCross {
    params: MaCrossParams,
    cross: SeriesId,
    pending_entry: Option<OrderId>,
}

impl MaCross {
    /// Wire the strategy's indicator stack into the pipeline.
    pub fn new(pipeline: &mut Pipeline, params: MaCrossParams) -> Result<Self, PipelineError> {
        let fast = pipeline.add(Ema::new(params.fast))?;
        let slow = pipeline.add(Ema::new(params.slow))?;
        let cross = pipeline.add(Crossover::new(fast, slow))?;
        Ok(Self {
            params,
            cross,
            pending_entry: None,
        })
    }
}

impl Strategy for MaCross {
    fn on_bar(&mut self, ctx: &mut Context<'_>) {
        if !ctx.is_defined(self.cross) {
            return;
        }
        if !ctx.position().is_flat() {
            return;
        }
        if ctx.value(self.cross) <= 0.0 {
            return;
        }

        // Signal while an earlier entry is still working: cancel it and
        // re-arm at the new level.
        if let Some(stale) = self.pending_entry.take() {
            ctx.cancel(stale);
        }

        let close = ctx.bar().close;
        let size = self.params.size;
        let entry = ctx.submit(OrderSpec::market(OrderSide::Buy, size).hold());
        match self.params.trail {
            Some(trail) => {
                ctx.submit(OrderSpec::stop_trail(OrderSide::Sell, size, trail).child_of(entry));
            }
            None => {
                let stop_price = close * (1.0 - self.params.stop_loss);
                ctx.submit(OrderSpec::stop(OrderSide::Sell, size, stop_price).child_of(entry));
            }
        }
        ctx.release(entry);
        self.pending_entry = Some(entry);
    }

    fn on_order_update(&mut self, order: &crate::domain::Order) {
        if self.pending_entry == Some(order.id) && order.status.is_terminal() {
            self.pending_entry = None;
        }
    }
}
