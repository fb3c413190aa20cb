//! Concrete example strategies.
//!
//! The engine fixes order/indicator/broker mechanics, not trading logic —
//! every strategy here is just one swappable implementation of the
//! [`Strategy`](crate::engine::Strategy) boundary.

pub mod ma_cross;

pub use ma_cross::{MaCross, MaCrossParams};
