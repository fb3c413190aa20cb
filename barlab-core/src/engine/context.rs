//! Per-bar strategy context — read-only views plus an order command queue.

use crate::domain::{Bar, OrderId, OrderSide, OrderSpec, Position};
use crate::indicators::{Pipeline, SeriesId};

/// An order action collected during the strategy hook and applied at broker
/// intake, after the hook returns.
#[derive(Debug, Clone)]
pub enum OrderCommand {
    Submit { id: OrderId, spec: OrderSpec },
    Cancel { id: OrderId },
    Release { id: OrderId },
    LinkOco { ids: Vec<OrderId> },
}

/// What a strategy sees (and may do) during one bar.
///
/// Order ids are allocated here, before intake runs, so a hook can wire
/// children to a parent it submitted in the same call.
pub struct Context<'a> {
    bar: &'a Bar,
    bar_index: usize,
    pipeline: &'a Pipeline,
    position: &'a Position,
    cash: f64,
    next_id: u64,
    commands: Vec<OrderCommand>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        bar: &'a Bar,
        bar_index: usize,
        pipeline: &'a Pipeline,
        position: &'a Position,
        cash: f64,
        next_id: u64,
    ) -> Self {
        Self {
            bar,
            bar_index,
            pipeline,
            position,
            cash,
            next_id,
            commands: Vec::new(),
        }
    }

    // ── Read views ─────────────────────────────────────────────────────

    pub fn bar(&self) -> &Bar {
        self.bar
    }

    pub fn bar_index(&self) -> usize {
        self.bar_index
    }

    pub fn position(&self) -> &Position {
        self.position
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Current-bar value of an indicator series (NaN while undefined).
    pub fn value(&self, id: SeriesId) -> f64 {
        self.pipeline.value(id)
    }

    /// Lagged indicator value; `offset` <= 0, 0 = current bar.
    pub fn value_at(&self, id: SeriesId, offset: i64) -> f64 {
        self.pipeline.value_at(id, offset)
    }

    pub fn is_defined(&self, id: SeriesId) -> bool {
        self.pipeline.is_defined(id)
    }

    // ── Order commands ─────────────────────────────────────────────────

    /// Queue an order for intake. Returns the id the order will carry.
    pub fn submit(&mut self, spec: OrderSpec) -> OrderId {
        let id = OrderId(self.next_id);
        self.next_id += 1;
        self.commands.push(OrderCommand::Submit { id, spec });
        id
    }

    /// Market buy at the next bar's open.
    pub fn buy(&mut self, size: f64) -> OrderId {
        self.submit(OrderSpec::market(OrderSide::Buy, size))
    }

    /// Market sell at the next bar's open.
    pub fn sell(&mut self, size: f64) -> OrderId {
        self.submit(OrderSpec::market(OrderSide::Sell, size))
    }

    /// Request cancellation of an open order. Takes effect before the next
    /// matching phase.
    pub fn cancel(&mut self, id: OrderId) {
        self.commands.push(OrderCommand::Cancel { id });
    }

    /// Release a held (`transmit=false`) order group.
    pub fn release(&mut self, id: OrderId) {
        self.commands.push(OrderCommand::Release { id });
    }

    /// Link orders into a one-cancels-other group.
    pub fn link_oco(&mut self, ids: &[OrderId]) {
        self.commands.push(OrderCommand::LinkOco { ids: ids.to_vec() });
    }

    pub(crate) fn into_commands(self) -> Vec<OrderCommand> {
        self.commands
    }
}
