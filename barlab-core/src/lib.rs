//! barlab core — an event-driven bar-replay backtesting engine.
//!
//! This crate contains the heart of the engine:
//! - Domain types (bars, orders, positions, trades, accounts)
//! - A lazy, validated bar feed boundary
//! - An incremental indicator pipeline (arena DAG, topological evaluation)
//! - The broker state machine: brackets, OCO groups, trailing stops, margin
//! - A deterministic single-threaded scheduler tying replay, indicators,
//!   strategy decisions, and matching together
//! - Portfolio accounting (equity, realized/unrealized P&L, commission)
//!
//! The scheduler is the sole mutator: each bar is fully processed
//! (indicators → strategy → intake → matching → accounting) before the next.

pub mod accounting;
pub mod broker;
pub mod domain;
pub mod engine;
pub mod feed;
pub mod indicators;
pub mod strategies;
