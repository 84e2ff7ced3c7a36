//! Order planning: from market price, holdings and target rate to ladder rungs.
//!
//! For every offset `r` in the expanded ladder `[r1, -r1, r2, -r2, ...]`:
//!
//! ```text
//! price          = market * (1 + r)
//! value_at_price = base * price + quote
//! target_base    = value_at_price * target_rate / price
//! delta          = target_base - base
//! consistent     = r * delta < 0
//! ```
//!
//! A sell rung (r > 0) must shed base, a buy rung (r < 0) must add it. When
//! a rung points the wrong way the market has already moved past it, and
//! the planner returns a single correcting order instead of a ladder.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::side::Side;
use crate::snapshot::BalanceSnapshot;

/// Validated list of positive percentage offsets from the market price.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OffsetLadder(Vec<f64>);

impl OffsetLadder {
    /// Offsets must be non-empty, distinct, and each within `(0, 1)`.
    pub fn new(offsets: Vec<f64>) -> Result<Self> {
        if offsets.is_empty() {
            return Err(Error::InvalidLadder("at least one offset is required".into()));
        }
        if let Some(bad) = offsets
            .iter()
            .find(|r| !r.is_finite() || **r <= 0.0 || **r >= 1.0)
        {
            return Err(Error::InvalidLadder(format!(
                "offset {bad} is not a fraction in (0, 1)"
            )));
        }
        // A repeated offset would get a zero-sized bucket.
        if let Some((i, dup)) = offsets
            .iter()
            .enumerate()
            .find(|&(i, r)| offsets[..i].contains(r))
        {
            return Err(Error::InvalidLadder(format!(
                "offset {dup} is repeated at position {i}"
            )));
        }
        Ok(Self(offsets))
    }

    /// Number of configured offsets (half the steady-state order count).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Innermost offset; also the INITIALIZE drift threshold.
    pub fn first(&self) -> f64 {
        self.0[0]
    }

    pub fn offsets(&self) -> &[f64] {
        &self.0
    }

    /// `[r1, -r1, r2, -r2, ...]`
    pub fn expanded(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().flat_map(|&r| [r, -r])
    }

    /// Live orders expected once the full ladder is resting.
    pub fn steady_state_orders(&self) -> usize {
        self.0.len() * 2
    }
}

/// One planned order at a given offset from the market.
#[derive(Clone, Debug, PartialEq)]
pub struct Rung {
    pub price: f64,
    pub value_at_price: f64,
    pub target_base_qty: f64,
    pub delta_qty: f64,
    pub offset: f64,
    pub is_consistent: bool,
}

impl Rung {
    pub fn evaluate(
        offset: f64,
        market_price: f64,
        base: f64,
        quote: f64,
        target_rate: f64,
    ) -> Self {
        let price = market_price * (1.0 + offset);
        let value_at_price = base * price + quote;
        let target_base_qty = value_at_price * target_rate / price;
        let delta_qty = target_base_qty - base;
        Self {
            price,
            value_at_price,
            target_base_qty,
            delta_qty,
            offset,
            is_consistent: offset * delta_qty < 0.0,
        }
    }

    pub fn side(&self) -> Side {
        Side::from_offset(self.offset)
    }

    /// Same price and quantity, opposite direction.
    pub fn inverted(&self) -> Self {
        let offset = -self.offset;
        Self {
            offset,
            is_consistent: offset * self.delta_qty < 0.0,
            ..self.clone()
        }
    }
}

/// What the planner wants placed.
#[derive(Clone, Debug, PartialEq)]
pub enum Plan {
    /// All rungs consistent. Each side is ordered innermost first.
    Ladder { sells: Vec<Rung>, buys: Vec<Rung> },
    /// A price gap was found; place this single rung (already inverted) alone.
    Correction(Rung),
}

/// Evaluate every rung of the expanded ladder, in ladder order.
pub fn plan_rungs(
    balances: &BalanceSnapshot,
    market_price: f64,
    target_rate: f64,
    ladder: &OffsetLadder,
) -> Vec<Rung> {
    ladder
        .expanded()
        .map(|r| Rung::evaluate(r, market_price, balances.base, balances.quote, target_rate))
        .collect()
}

/// Plan the next set of orders.
pub fn plan(
    balances: &BalanceSnapshot,
    market_price: f64,
    target_rate: f64,
    ladder: &OffsetLadder,
) -> Plan {
    let rungs = plan_rungs(balances, market_price, target_rate, ladder);

    if let Some(gap) = most_extreme_inconsistent(&rungs) {
        return Plan::Correction(gap.inverted());
    }

    let (mut sells, mut buys): (Vec<Rung>, Vec<Rung>) =
        rungs.into_iter().partition(|r| r.offset > 0.0);
    sells.sort_by(|a, b| a.price.total_cmp(&b.price));
    buys.sort_by(|a, b| b.price.total_cmp(&a.price));
    Plan::Ladder { sells, buys }
}

/// Buy-side gaps win and pick the highest price; otherwise the lowest sell.
fn most_extreme_inconsistent(rungs: &[Rung]) -> Option<&Rung> {
    let by_price = |a: &&Rung, b: &&Rung| -> Ordering { a.price.total_cmp(&b.price) };
    let inconsistent = || rungs.iter().filter(|r| !r.is_consistent);

    inconsistent()
        .filter(|r| r.offset < 0.0)
        .max_by(by_price)
        .or_else(|| inconsistent().filter(|r| r.offset > 0.0).min_by(by_price))
}
