//! Trigger checking — does a bar fill a given order, and at what price?
//!
//! Evaluates an order's trigger condition against a bar's OHLC range and
//! returns the raw fill price. Market orders fill at the bar's open (the
//! "next bar" relative to submission — eligibility gating is the broker's
//! job). Gap-throughs fill at the open: adverse for stops, favorable for
//! limits.

use crate::domain::{Bar, Order, OrderSide, OrderType};

/// Raw fill price if the order triggers on this bar, None otherwise.
pub fn check_trigger(order: &Order, bar: &Bar) -> Option<f64> {
    match &order.order_type {
        OrderType::Market => Some(bar.open),
        OrderType::Limit { limit_price } => check_limit(order.side, *limit_price, bar),
        OrderType::Stop { stop_price } => check_stop(order.side, *stop_price, bar),
        OrderType::StopTrail { stop_price, .. } => {
            stop_price.and_then(|stop| check_stop(order.side, stop, bar))
        }
    }
}

/// Sell stop: triggers if bar.low <= stop, fills at the stop (or at the open
/// when the bar gaps through). Buy stop mirrored against bar.high.
fn check_stop(side: OrderSide, stop: f64, bar: &Bar) -> Option<f64> {
    match side {
        OrderSide::Sell => {
            if bar.low <= stop {
                Some(if bar.open <= stop { bar.open } else { stop })
            } else {
                None
            }
        }
        OrderSide::Buy => {
            if bar.high >= stop {
                Some(if bar.open >= stop { bar.open } else { stop })
            } else {
                None
            }
        }
    }
}

/// Buy limit: triggers if bar.low <= limit, fills at the limit or better
/// (the open, when the bar opens below the limit). Sell limit mirrored.
fn check_limit(side: OrderSide, limit: f64, bar: &Bar) -> Option<f64> {
    match side {
        OrderSide::Buy => {
            if bar.low <= limit {
                Some(if bar.open <= limit { bar.open } else { limit })
            } else {
                None
            }
        }
        OrderSide::Sell => {
            if bar.high >= limit {
                Some(if bar.open >= limit { bar.open } else { limit })
            } else {
                None
            }
        }
    }
}
