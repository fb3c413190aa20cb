//! The replay loop: feed → pipeline → strategy → intake → matching →
//! notifications → equity snapshot, one bar at a time.

use super::context::{Context, OrderCommand};
use super::{EngineError, Strategy};
use crate::accounting::{Accountant, EquityPoint};
use crate::broker::{Broker, Notification};
use crate::domain::{Order, OrderAuditEntry, TradeRecord};
use crate::feed::BarFeed;
use crate::indicators::Pipeline;
use log::{error, info, warn};
use serde::Serialize;

/// Everything a finished replay produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub symbol: String,
    pub bars: usize,
    pub initial_cash: f64,
    pub final_cash: f64,
    pub final_equity: f64,
    pub realized_pnl: f64,
    pub total_commission: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    pub orders: Vec<Order>,
    /// Every order state transition, in occurrence order.
    pub audit: Vec<OrderAuditEntry>,
}

/// Drives a single-instrument backtest. Owns all engine state explicitly —
/// there is no process-wide broker or account.
pub struct Scheduler<F: BarFeed, S: Strategy> {
    feed: F,
    pipeline: Pipeline,
    broker: Broker,
    accountant: Accountant,
    strategy: S,
}

impl<F: BarFeed, S: Strategy> Scheduler<F, S> {
    pub fn new(feed: F, pipeline: Pipeline, broker: Broker, strategy: S) -> Self {
        let accountant = Accountant::new(broker.cash());
        Self {
            feed,
            pipeline,
            broker,
            accountant,
            strategy,
        }
    }

    /// Replay the feed to exhaustion.
    ///
    /// Per-order failures reject the order and continue; only a `DataError`
    /// aborts, after logging the last consistent equity snapshot.
    pub fn run(mut self) -> Result<RunResult, EngineError> {
        let mut bar_index = 0usize;

        loop {
            let bar = match self.feed.next() {
                Ok(Some(bar)) => bar,
                Ok(None) => break,
                Err(e) => {
                    error!(
                        "replay aborted at bar {bar_index}: {e}; last equity {:.2}",
                        self.accountant.equity()
                    );
                    return Err(EngineError::Data(e));
                }
            };

            self.pipeline.update(&bar);

            let commands = {
                let mut ctx = Context::new(
                    &bar,
                    bar_index,
                    &self.pipeline,
                    self.broker.position(),
                    self.broker.cash(),
                    self.broker.next_order_id(),
                );
                self.strategy.on_bar(&mut ctx);
                ctx.into_commands()
            };
            self.apply_commands(commands, &bar, bar_index);
            self.dispatch_notifications();

            self.broker.process_bar(&bar, bar_index);
            self.dispatch_notifications();

            self.accountant.snapshot(&self.broker, &bar, bar_index);
            bar_index += 1;
        }

        // Feed exhausted: anything still open is forced to Canceled.
        self.broker.finalize(bar_index);
        self.dispatch_notifications();

        info!(
            "replay complete: {bar_index} bars, {} trades, final equity {:.2}",
            self.broker.closed_trades().len(),
            self.accountant.equity()
        );

        Ok(RunResult {
            symbol: self.broker.symbol().to_string(),
            bars: bar_index,
            initial_cash: self.accountant.initial_cash(),
            final_cash: self.broker.cash(),
            final_equity: self.accountant.equity(),
            realized_pnl: self.broker.realized_pnl(),
            total_commission: self.broker.total_commission(),
            equity_curve: self.accountant.curve().to_vec(),
            trades: self.broker.closed_trades().to_vec(),
            orders: self.broker.orders().cloned().collect(),
            audit: self.broker.audit_trail().to_vec(),
        })
    }

    fn apply_commands(&mut self, commands: Vec<OrderCommand>, bar: &crate::domain::Bar, bar_index: usize) {
        for command in commands {
            match command {
                OrderCommand::Submit { id, spec } => {
                    self.broker.submit(id, spec, bar, bar_index);
                }
                OrderCommand::Cancel { id } => {
                    if let Err(e) = self.broker.cancel(id, bar_index, "user cancel") {
                        warn!("cancel of order {id} ignored: {e}");
                    }
                }
                OrderCommand::Release { id } => {
                    if let Err(e) = self.broker.release(id, bar, bar_index) {
                        warn!("release of order {id} ignored: {e}");
                    }
                }
                OrderCommand::LinkOco { ids } => {
                    if let Err(e) = self.broker.link_oco(&ids) {
                        warn!("OCO link ignored: {e}");
                    }
                }
            }
        }
    }

    fn dispatch_notifications(&mut self) {
        for notification in self.broker.drain_notifications() {
            match notification {
                Notification::Order(order) => self.strategy.on_order_update(&order),
                Notification::TradeClosed(trade) => self.strategy.on_trade_closed(&trade),
            }
        }
    }
}
