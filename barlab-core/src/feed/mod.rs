//! Bar feed — ordered, lazy, forward-only source of OHLCV bars.
//!
//! The feed is the ingestion boundary: whatever produced the records (CSV
//! reader, API client) must hand over bars ascending by timestamp. The feed
//! re-validates monotonicity and OHLC sanity so a malformed sequence fails
//! the replay instead of silently corrupting it.

use crate::domain::Bar;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from the bar feed. All fatal: a replay aborts on the first one.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("bar {index} ({timestamp}) is not after the previous bar ({previous})")]
    NonMonotonic {
        index: usize,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },

    #[error("bar {index} ({timestamp}) failed OHLC sanity checks")]
    MalformedBar {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("bar {index} has symbol {found}, feed is for {expected}")]
    SymbolMismatch {
        index: usize,
        found: String,
        expected: String,
    },
}

/// Ordered source of bars for one instrument.
///
/// `next()` is lazy and forward-only; once it returns `Ok(None)` the feed is
/// exhausted for good. Re-reading requires a fresh feed instance.
pub trait BarFeed {
    /// The instrument this feed serves.
    fn symbol(&self) -> &str;

    /// Produce the next bar, or `None` when exhausted.
    fn next(&mut self) -> Result<Option<Bar>, DataError>;
}

/// In-memory feed over a pre-loaded bar vector, with optional `[from, to)`
/// clipping. Validates each bar as it is handed out.
pub struct MemoryFeed {
    symbol: String,
    bars: std::vec::IntoIter<Bar>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    last_timestamp: Option<DateTime<Utc>>,
    index: usize,
}

impl MemoryFeed {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars: bars.into_iter(),
            from: None,
            to: None,
            last_timestamp: None,
            index: 0,
        }
    }

    /// Clip the feed to `[from, to)`. Bars outside the range are skipped
    /// (but still validated for ordering).
    pub fn with_range(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    fn validate(&mut self, bar: &Bar) -> Result<(), DataError> {
        let index = self.index;
        self.index += 1;

        if bar.symbol != self.symbol {
            return Err(DataError::SymbolMismatch {
                index,
                found: bar.symbol.clone(),
                expected: self.symbol.clone(),
            });
        }
        if !bar.is_sane() {
            return Err(DataError::MalformedBar {
                index,
                timestamp: bar.timestamp,
            });
        }
        if let Some(previous) = self.last_timestamp {
            if bar.timestamp <= previous {
                return Err(DataError::NonMonotonic {
                    index,
                    timestamp: bar.timestamp,
                    previous,
                });
            }
        }
        self.last_timestamp = Some(bar.timestamp);
        Ok(())
    }
}

impl BarFeed for MemoryFeed {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn next(&mut self) -> Result<Option<Bar>, DataError> {
        while let Some(bar) = self.bars.next() {
            self.validate(&bar)?;

            if let Some(from) = self.from {
                if bar.timestamp < from {
                    continue;
                }
            }
            if let Some(to) = self.to {
                if bar.timestamp >= to {
                    // Past the clip end; drain nothing further.
                    return Ok(None);
                }
            }
            return Ok(Some(bar));
        }
        Ok(None)
    }
}
