//! Account — cash plus the commission schema applied to every fill.

use serde::{Deserialize, Serialize};

/// How commission is charged on a fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CommissionSchema {
    /// Fraction of fill notional: `price * size * rate`.
    Percent { rate: f64 },
    /// Fixed amount per share/contract: `size * amount`.
    PerShare { amount: f64 },
    /// Fixed amount per fill.
    Flat { amount: f64 },
}

impl CommissionSchema {
    pub fn free() -> Self {
        CommissionSchema::Percent { rate: 0.0 }
    }

    /// Commission for a fill of `size` units at `price`.
    pub fn compute(&self, price: f64, size: f64) -> f64 {
        match *self {
            CommissionSchema::Percent { rate } => price * size * rate,
            CommissionSchema::PerShare { amount } => size * amount,
            CommissionSchema::Flat { amount } => amount,
        }
    }
}

/// Cash account. Mutated only by the broker on fills.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub cash: f64,
    pub commission: CommissionSchema,
}

impl Account {
    pub fn new(cash: f64, commission: CommissionSchema) -> Self {
        Self { cash, commission }
    }
}
