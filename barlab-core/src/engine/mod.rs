//! The scheduler and the strategy boundary.
//!
//! One synchronous loop, one iteration per bar:
//! 1. Pull the next bar from the feed
//! 2. Update the indicator pipeline
//! 3. Invoke the strategy's per-bar hook (read-only views + command queue)
//! 4. Hand collected commands to broker intake
//! 5. Run broker matching for the bar
//! 6. Deliver order-status and trade-closed notifications
//! 7. Snapshot equity
//!
//! Orders activated at bar T match from bar T+1, so a cancel issued in the
//! hook at bar T takes effect before anything that could fill at bar T.

pub mod context;
pub mod scheduler;

pub use context::{Context, OrderCommand};
pub use scheduler::{RunResult, Scheduler};

use crate::domain::{Order, TradeRecord};
use crate::feed::DataError;
use crate::indicators::PipelineError;
use thiserror::Error;

/// Fatal engine errors. Per-order failures never surface here — they reject
/// the order and the replay continues.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("indicator pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// The strategy boundary: one decision hook per bar, plus notifications.
///
/// `on_bar` may read the current bar, indicator values (current and lagged),
/// and position/cash, and may submit, cancel, release, or OCO-link orders
/// through the [`Context`]. The engine calls back `on_order_update` on every
/// status change and `on_trade_closed` when a round trip completes.
pub trait Strategy {
    fn on_bar(&mut self, ctx: &mut Context<'_>);

    fn on_order_update(&mut self, order: &Order) {
        let _ = order;
    }

    fn on_trade_closed(&mut self, trade: &TradeRecord) {
        let _ = trade;
    }
}
