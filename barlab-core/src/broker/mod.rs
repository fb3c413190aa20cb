//! Broker — order arena, state machine, matching, and portfolio effects.
//!
//! The broker owns all mutable trading state: cash, the position, and every
//! order ever created. It manages:
//! - Order intake and validation (bad orders are Rejected, never fatal)
//! - State transitions (`Created → Submitted → Accepted → terminal`)
//! - Bracket dormancy (children activate only after the parent completes)
//! - OCO enforcement (first terminal resolution cancels all live siblings)
//! - Trailing-stop ratcheting (stops only ever tighten)
//! - Matching against each bar, with margin checks at match time
//! - Fill effects: position, cash, commission, trade records
//! - An audit trail for every state transition
//!
//! Orders submitted during bar T are eligible for matching from bar T+1, so
//! market orders fill at the next bar's open.

pub mod trigger;

use crate::domain::{
    Account, Bar, OcoGroupId, Order, OrderAuditEntry, OrderId, OrderSide, OrderSpec, OrderStatus,
    OrderType, Position, TradeId, TradeRecord,
};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, VecDeque};
use thiserror::Error;

const SIZE_EPSILON: f64 = 1e-9;

/// Errors from broker operations on specific orders. These reject the
/// offending command; they never abort the replay.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {0} is not open (status: {1})")]
    OrderNotOpen(OrderId, String),

    #[error("order {0} is not held (transmit already set)")]
    OrderNotHeld(OrderId),

    #[error("order {0} already belongs to an OCO group")]
    AlreadyInOcoGroup(OrderId),
}

/// Pushed to the strategy after matching and after intake.
#[derive(Debug, Clone)]
pub enum Notification {
    /// An order changed status; carries a snapshot of the order.
    Order(Order),
    /// A round-trip trade closed.
    TradeClosed(TradeRecord),
}

/// A position round-trip in progress; becomes a [`TradeRecord`] on close.
#[derive(Debug, Clone)]
struct OpenTrade {
    id: TradeId,
    entry_bar: usize,
    entry_timestamp: DateTime<Utc>,
    /// Signed size at the trade's largest extent.
    peak_size: f64,
    gross: f64,
    commission: f64,
    exit_notional: f64,
    exit_size: f64,
}

impl OpenTrade {
    fn new(id: TradeId, entry_bar: usize, entry_timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            entry_bar,
            entry_timestamp,
            peak_size: 0.0,
            gross: 0.0,
            commission: 0.0,
            exit_notional: 0.0,
            exit_size: 0.0,
        }
    }

    fn close(self, symbol: &str, entry_price: f64, bar: &Bar, bar_index: usize) -> TradeRecord {
        let exit_price = if self.exit_size > 0.0 {
            self.exit_notional / self.exit_size
        } else {
            0.0
        };
        TradeRecord {
            id: self.id,
            symbol: symbol.to_string(),
            entry_bar: self.entry_bar,
            entry_timestamp: self.entry_timestamp,
            entry_price,
            exit_bar: bar_index,
            exit_timestamp: bar.timestamp,
            exit_price,
            size: self.peak_size,
            gross_pnl: self.gross,
            commission: self.commission,
            net_pnl: self.gross - self.commission,
            bars_held: bar_index - self.entry_bar,
        }
    }
}

/// The broker: order arena plus exclusive owner of cash and the position.
pub struct Broker {
    symbol: String,
    account: Account,
    position: Position,

    /// All orders ever created, keyed by ID. BTreeMap iteration gives
    /// deterministic (ascending-id) matching order.
    orders: BTreeMap<OrderId, Order>,

    /// Dormant bracket children waiting for their parent to complete.
    children: HashMap<OrderId, Vec<OrderId>>,

    /// Live OCO groups. A group is removed when it resolves, which is what
    /// makes resolution happen exactly once.
    oco_groups: HashMap<OcoGroupId, Vec<OrderId>>,

    next_order_id: u64,
    next_oco_id: u64,
    next_trade_id: u64,

    open_trade: Option<OpenTrade>,
    closed_trades: Vec<TradeRecord>,
    realized_pnl: f64,
    total_commission: f64,

    audit: Vec<OrderAuditEntry>,
    notifications: VecDeque<Notification>,
}

impl Broker {
    pub fn new(symbol: impl Into<String>, account: Account) -> Self {
        let symbol = symbol.into();
        Self {
            position: Position::flat(symbol.clone()),
            symbol,
            account,
            orders: BTreeMap::new(),
            children: HashMap::new(),
            oco_groups: HashMap::new(),
            next_order_id: 1,
            next_oco_id: 1,
            next_trade_id: 1,
            open_trade: None,
            closed_trades: Vec::new(),
            realized_pnl: 0.0,
            total_commission: 0.0,
            audit: Vec::new(),
            notifications: VecDeque::new(),
        }
    }

    // ── Read API ───────────────────────────────────────────────────────

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn cash(&self) -> f64 {
        self.account.cash
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn live_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().filter(|o| o.is_live())
    }

    pub fn open_order_count(&self) -> usize {
        self.orders.values().filter(|o| o.is_open()).count()
    }

    pub fn closed_trades(&self) -> &[TradeRecord] {
        &self.closed_trades
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    pub fn audit_trail(&self) -> &[OrderAuditEntry] {
        &self.audit
    }

    /// Next id the intake will accept; the scheduler seeds per-bar contexts
    /// from this so strategies can reference ids before intake runs.
    pub fn next_order_id(&self) -> u64 {
        self.next_order_id
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    // ── Configuration (mirrors setcash/setcommission on the original) ──

    pub fn set_cash(&mut self, cash: f64) {
        self.account.cash = cash;
    }

    pub fn set_commission(&mut self, schema: crate::domain::CommissionSchema) {
        self.account.commission = schema;
    }

    // ── Intake ─────────────────────────────────────────────────────────

    /// Take in a strategy-built order spec under a pre-allocated id.
    ///
    /// Validation failures transition the order straight to `Rejected` and
    /// notify the strategy; they never abort the run.
    pub fn submit(&mut self, id: OrderId, spec: OrderSpec, bar: &Bar, bar_index: usize) {
        self.next_order_id = self.next_order_id.max(id.0 + 1);

        let rejection = self.validate_spec(&spec);
        let parent = spec.parent;
        let transmit = spec.transmit;

        let order = Order {
            id,
            symbol: self.symbol.clone(),
            side: spec.side,
            order_type: spec.order_type,
            size: spec.size,
            filled_size: 0.0,
            avg_fill_price: 0.0,
            status: OrderStatus::Created,
            transmit,
            parent_id: parent,
            oco_group_id: None,
            valid_until: spec.valid_until,
            created_bar: bar_index,
            activated_bar: None,
        };
        self.orders.insert(id, order);

        if let Some(reason) = rejection {
            debug!("order {id} rejected at intake: {reason}");
            self.transition(id, OrderStatus::Rejected { reason: reason.clone() }, bar_index, &reason);
            self.notify_order(id);
            return;
        }

        match parent {
            Some(pid) => match self.orders.get(&pid).map(|p| p.status.clone()) {
                // Parent already done — the child goes live on its own.
                Some(OrderStatus::Completed) => {
                    self.activate(id, bar, bar_index);
                    self.notify_order(id);
                }
                // Parent open (live, held, or itself dormant) — child sleeps.
                Some(status) if !status.is_terminal() => {
                    self.children.entry(pid).or_default().push(id);
                }
                _ => {
                    let reason = format!("parent order {pid} is not open");
                    self.transition(id, OrderStatus::Rejected { reason: reason.clone() }, bar_index, &reason);
                    self.notify_order(id);
                }
            },
            None if !transmit => {
                // Held until an explicit release.
            }
            None => {
                self.activate(id, bar, bar_index);
                self.notify_order(id);
            }
        }
    }

    /// Release a held (`transmit=false`) order group: the parent goes live
    /// now, its children stay dormant until the parent completes.
    pub fn release(&mut self, id: OrderId, bar: &Bar, bar_index: usize) -> Result<(), BrokerError> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or(BrokerError::OrderNotFound(id))?;
        if order.status != OrderStatus::Created || order.transmit {
            return Err(BrokerError::OrderNotHeld(id));
        }
        order.transmit = true;
        self.activate(id, bar, bar_index);
        self.notify_order(id);
        Ok(())
    }

    /// Cancel an open order. Cascades to dormant children and resolves the
    /// order's OCO group.
    pub fn cancel(&mut self, id: OrderId, bar_index: usize, reason: &str) -> Result<(), BrokerError> {
        let order = self.orders.get(&id).ok_or(BrokerError::OrderNotFound(id))?;
        if !order.is_open() {
            return Err(BrokerError::OrderNotOpen(id, format!("{:?}", order.status)));
        }
        self.transition(
            id,
            OrderStatus::Canceled {
                reason: reason.to_string(),
            },
            bar_index,
            reason,
        );
        self.cancel_children_of(id, bar_index, "bracket parent canceled");
        self.resolve_oco(id, bar_index);
        self.notify_order(id);
        Ok(())
    }

    /// Link already-submitted orders into a standalone OCO group.
    pub fn link_oco(&mut self, ids: &[OrderId]) -> Result<OcoGroupId, BrokerError> {
        for &id in ids {
            let order = self.orders.get(&id).ok_or(BrokerError::OrderNotFound(id))?;
            if !order.is_open() {
                return Err(BrokerError::OrderNotOpen(id, format!("{:?}", order.status)));
            }
            if order.oco_group_id.is_some() {
                return Err(BrokerError::AlreadyInOcoGroup(id));
            }
        }
        let gid = OcoGroupId(self.next_oco_id);
        self.next_oco_id += 1;
        for &id in ids {
            if let Some(order) = self.orders.get_mut(&id) {
                order.oco_group_id = Some(gid);
            }
        }
        self.oco_groups.insert(gid, ids.to_vec());
        Ok(gid)
    }

    // ── Matching ───────────────────────────────────────────────────────

    /// Match all eligible orders against one bar. Orders activated during
    /// this bar are skipped; they become eligible next bar.
    pub fn process_bar(&mut self, bar: &Bar, bar_index: usize) {
        self.expire_stale(bar, bar_index);

        let eligible: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.is_live() && o.activated_bar.is_some_and(|b| b < bar_index))
            .map(|o| o.id)
            .collect();

        for id in eligible {
            let Some(order) = self.orders.get(&id) else {
                continue;
            };
            // May have been canceled by an earlier OCO resolution this bar.
            if !order.is_live() {
                continue;
            }

            match trigger::check_trigger(order, bar) {
                Some(raw_price) => {
                    let side = order.side;
                    let remaining = order.remaining_size();
                    let commission = self.account.commission.compute(raw_price, remaining);
                    if side == OrderSide::Buy
                        && raw_price * remaining + commission > self.account.cash
                    {
                        debug!(
                            "order {id}: margin ({} needed, {} available)",
                            raw_price * remaining + commission,
                            self.account.cash
                        );
                        self.transition(id, OrderStatus::Margin, bar_index, "insufficient cash");
                        self.resolve_oco(id, bar_index);
                        self.cancel_children_of(id, bar_index, "bracket parent hit margin");
                        self.notify_order(id);
                        continue;
                    }
                    if let Err(e) = self.fill_order(id, raw_price, remaining, bar, bar_index) {
                        warn!("fill of order {id} failed: {e}");
                    }
                }
                None => self.ratchet_trailing(id, bar),
            }
        }
    }

    /// Record a fill on a live order. Returns whether the order is now fully
    /// filled. Handles OCO resolution and bracket activation on completion.
    pub fn fill_order(
        &mut self,
        id: OrderId,
        price: f64,
        size: f64,
        bar: &Bar,
        bar_index: usize,
    ) -> Result<bool, BrokerError> {
        let side;
        let full;
        {
            let order = self
                .orders
                .get_mut(&id)
                .ok_or(BrokerError::OrderNotFound(id))?;
            if !order.is_live() {
                return Err(BrokerError::OrderNotOpen(id, format!("{:?}", order.status)));
            }
            side = order.side;
            let prior = order.filled_size;
            order.avg_fill_price = (order.avg_fill_price * prior + price * size) / (prior + size);
            order.filled_size = prior + size;
            full = order.filled_size >= order.size - SIZE_EPSILON;
        }

        if full {
            self.transition(id, OrderStatus::Completed, bar_index, "filled");
        } else {
            self.transition(id, OrderStatus::PartiallyFilled, bar_index, "partial fill");
        }

        debug!(
            "order {id} filled: {size} @ {price} ({})",
            if full { "complete" } else { "partial" }
        );
        self.settle(side, price, size, bar, bar_index);
        self.notify_order(id);

        if full {
            self.resolve_oco(id, bar_index);
            self.activate_children(id, bar, bar_index);
        }
        Ok(full)
    }

    /// Force-cancel everything still open. Called when the feed ends.
    pub fn finalize(&mut self, bar_index: usize) {
        let open: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.is_open())
            .map(|o| o.id)
            .collect();
        for id in open {
            if self.orders.get(&id).is_some_and(|o| o.is_open()) {
                self.transition(
                    id,
                    OrderStatus::Canceled {
                        reason: "end of data".to_string(),
                    },
                    bar_index,
                    "end of data",
                );
                self.notify_order(id);
            }
        }
        self.children.clear();
        self.oco_groups.clear();
    }

    // ── Internal helpers ───────────────────────────────────────────────

    fn validate_spec(&self, spec: &OrderSpec) -> Option<String> {
        if !spec.size.is_finite() || spec.size <= 0.0 {
            return Some(format!("non-positive order size {}", spec.size));
        }
        if let Some(symbol) = &spec.symbol {
            if symbol != &self.symbol {
                return Some(format!("unknown instrument {symbol}"));
            }
        }
        match spec.order_type {
            OrderType::Limit { limit_price } => {
                if !limit_price.is_finite() || limit_price <= 0.0 {
                    return Some(format!("invalid limit price {limit_price}"));
                }
            }
            OrderType::Stop { stop_price } => {
                if !stop_price.is_finite() || stop_price <= 0.0 {
                    return Some(format!("invalid stop price {stop_price}"));
                }
            }
            OrderType::StopTrail { trail_amount, .. } => {
                if !trail_amount.is_finite() || trail_amount <= 0.0 {
                    return Some(format!("invalid trail amount {trail_amount}"));
                }
            }
            OrderType::Market => {}
        }
        None
    }

    /// `Created → Submitted → Accepted`; stamps the activation bar and
    /// initializes a trailing stop from the current close.
    fn activate(&mut self, id: OrderId, bar: &Bar, bar_index: usize) {
        self.transition(id, OrderStatus::Submitted, bar_index, "submitted");
        self.transition(id, OrderStatus::Accepted, bar_index, "accepted");
        if let Some(order) = self.orders.get_mut(&id) {
            order.activated_bar = Some(bar_index);
            let side = order.side;
            if let OrderType::StopTrail {
                trail_amount,
                stop_price,
            } = &mut order.order_type
            {
                if stop_price.is_none() {
                    *stop_price = Some(match side {
                        OrderSide::Sell => bar.close - *trail_amount,
                        OrderSide::Buy => bar.close + *trail_amount,
                    });
                }
            }
        }
    }

    /// Move a trailing stop favorably, never backward.
    fn ratchet_trailing(&mut self, id: OrderId, bar: &Bar) {
        if let Some(order) = self.orders.get_mut(&id) {
            let side = order.side;
            if let OrderType::StopTrail {
                trail_amount,
                stop_price,
            } = &mut order.order_type
            {
                let trail = *trail_amount;
                let updated = match (side, *stop_price) {
                    (OrderSide::Sell, Some(old)) => old.max(bar.close - trail),
                    (OrderSide::Sell, None) => bar.close - trail,
                    (OrderSide::Buy, Some(old)) => old.min(bar.close + trail),
                    (OrderSide::Buy, None) => bar.close + trail,
                };
                *stop_price = Some(updated);
            }
        }
    }

    /// Expire live orders whose time-in-force has elapsed.
    fn expire_stale(&mut self, bar: &Bar, bar_index: usize) {
        let stale: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.is_live() && o.valid_until.is_some_and(|vu| bar.timestamp > vu))
            .map(|o| o.id)
            .collect();
        for id in stale {
            if self.orders.get(&id).is_some_and(|o| o.is_live()) {
                self.transition(id, OrderStatus::Expired, bar_index, "time in force elapsed");
                self.cancel_children_of(id, bar_index, "bracket parent expired");
                self.resolve_oco(id, bar_index);
                self.notify_order(id);
            }
        }
    }

    /// Cancel all live siblings of a terminally-resolved OCO member.
    /// Removing the group record makes resolution happen exactly once.
    fn resolve_oco(&mut self, id: OrderId, bar_index: usize) {
        let Some(gid) = self.orders.get(&id).and_then(|o| o.oco_group_id) else {
            return;
        };
        let Some(members) = self.oco_groups.remove(&gid) else {
            return;
        };
        for sibling in members {
            if sibling == id {
                continue;
            }
            if self.orders.get(&sibling).is_some_and(|o| o.is_open()) {
                self.transition(
                    sibling,
                    OrderStatus::Canceled {
                        reason: "OCO sibling resolved".to_string(),
                    },
                    bar_index,
                    "OCO sibling resolved",
                );
                self.cancel_children_of(sibling, bar_index, "bracket parent canceled");
                self.notify_order(sibling);
            }
        }
    }

    /// Wake the dormant children of a completed bracket parent. Siblings
    /// without an explicit group are linked OCO so the first to resolve
    /// cancels the rest.
    fn activate_children(&mut self, parent_id: OrderId, bar: &Bar, bar_index: usize) {
        let Some(child_ids) = self.children.remove(&parent_id) else {
            return;
        };
        let live: Vec<OrderId> = child_ids
            .into_iter()
            .filter(|cid| {
                self.orders
                    .get(cid)
                    .is_some_and(|o| o.status == OrderStatus::Created)
            })
            .collect();

        let ungrouped = live
            .iter()
            .all(|cid| self.orders.get(cid).is_some_and(|o| o.oco_group_id.is_none()));
        if live.len() >= 2 && ungrouped {
            let gid = OcoGroupId(self.next_oco_id);
            self.next_oco_id += 1;
            for cid in &live {
                if let Some(order) = self.orders.get_mut(cid) {
                    order.oco_group_id = Some(gid);
                }
            }
            self.oco_groups.insert(gid, live.clone());
        }

        for cid in live {
            self.activate(cid, bar, bar_index);
            self.notify_order(cid);
        }
    }

    /// Recursively cancel dormant children of an order leaving the book.
    fn cancel_children_of(&mut self, parent_id: OrderId, bar_index: usize, reason: &str) {
        let Some(child_ids) = self.children.remove(&parent_id) else {
            return;
        };
        for cid in child_ids {
            if self.orders.get(&cid).is_some_and(|o| o.is_open()) {
                self.transition(
                    cid,
                    OrderStatus::Canceled {
                        reason: reason.to_string(),
                    },
                    bar_index,
                    reason,
                );
                self.notify_order(cid);
                self.cancel_children_of(cid, bar_index, reason);
            }
        }
    }

    /// Apply a fill's portfolio effects: cash, position, realized P&L, and
    /// trade records. Weighted-average entry on size increase; realized P&L
    /// against the average entry on decrease; flips close the old trade and
    /// open a new one at the fill price.
    fn settle(&mut self, side: OrderSide, price: f64, size: f64, bar: &Bar, bar_index: usize) {
        let commission = self.account.commission.compute(price, size);
        match side {
            OrderSide::Buy => self.account.cash -= price * size + commission,
            OrderSide::Sell => self.account.cash += price * size - commission,
        }
        self.total_commission += commission;

        let signed = side.sign() * size;
        let old = self.position.size;
        let new = old + signed;

        if old == 0.0 && new != 0.0 {
            let trade_id = TradeId(self.next_trade_id);
            self.next_trade_id += 1;
            self.open_trade = Some(OpenTrade::new(trade_id, bar_index, bar.timestamp));
        }
        if let Some(trade) = self.open_trade.as_mut() {
            trade.commission += commission;
        }

        let increases = old == 0.0 || (old > 0.0) == (signed > 0.0);
        if increases {
            let old_abs = old.abs();
            self.position.avg_entry_price = if old == 0.0 {
                price
            } else {
                (self.position.avg_entry_price * old_abs + price * size) / (old_abs + size)
            };
            self.position.size = new;
            if let Some(trade) = self.open_trade.as_mut() {
                if new.abs() > trade.peak_size.abs() {
                    trade.peak_size = new;
                }
            }
            return;
        }

        // Decrease, close, or flip.
        let closed = size.min(old.abs());
        let direction = if old > 0.0 { 1.0 } else { -1.0 };
        let pnl = (price - self.position.avg_entry_price) * closed * direction;
        self.realized_pnl += pnl;
        if let Some(trade) = self.open_trade.as_mut() {
            trade.gross += pnl;
            trade.exit_notional += price * closed;
            trade.exit_size += closed;
        }

        let crossed = new == 0.0 || (new > 0.0) != (old > 0.0);
        if crossed {
            let entry_price = self.position.avg_entry_price;
            if let Some(trade) = self.open_trade.take() {
                let record = trade.close(&self.symbol, entry_price, bar, bar_index);
                debug!(
                    "trade {} closed: net {:.2} over {} bars",
                    record.id, record.net_pnl, record.bars_held
                );
                self.closed_trades.push(record.clone());
                self.notifications.push_back(Notification::TradeClosed(record));
            }
            self.position.size = new;
            if new != 0.0 {
                // Flip: the remainder opens a fresh trade at the fill price.
                self.position.avg_entry_price = price;
                let trade_id = TradeId(self.next_trade_id);
                self.next_trade_id += 1;
                let mut trade = OpenTrade::new(trade_id, bar_index, bar.timestamp);
                trade.peak_size = new;
                self.open_trade = Some(trade);
            } else {
                self.position.avg_entry_price = 0.0;
            }
        } else {
            // Partial reduce: average entry unchanged.
            self.position.size = new;
        }
    }

    fn transition(&mut self, id: OrderId, to: OrderStatus, bar_index: usize, reason: &str) {
        if let Some(order) = self.orders.get_mut(&id) {
            let from = order.status.clone();
            order.status = to.clone();
            self.audit.push(OrderAuditEntry {
                order_id: id,
                bar_index,
                from_status: from,
                to_status: to,
                reason: reason.to_string(),
            });
        }
    }

    fn notify_order(&mut self, id: OrderId) {
        if let Some(order) = self.orders.get(&id) {
            self.notifications.push_back(Notification::Order(order.clone()));
        }
    }
}
