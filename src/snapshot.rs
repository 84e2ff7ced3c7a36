//! Market and balance snapshots, and the cache that decides when to refetch them.

use chrono::{DateTime, Duration, Utc};

use crate::cache::CachedValue;
use crate::error::{Error, Result};
use crate::types::{Balance, BookQuotes, Contract};

/// Seconds a market or balance snapshot stays fresh.
pub const STALENESS_WINDOW_SECS: i64 = 5;

/// Mid price of the best bid/ask at the time it was queried.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarketSnapshot {
    pub price: f64,
    /// Value share of one base unit against one base plus one quote unit.
    pub rate: f64,
    pub queried_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Build a snapshot from a depth-1 book query.
    ///
    /// Exactly one entry is required on each side; anything else means the
    /// book response cannot be trusted.
    pub fn from_quotes(quotes: &BookQuotes, now: DateTime<Utc>) -> Result<Self> {
        if quotes.base.len() != 1 {
            return Err(Error::DataIntegrity(format!(
                "expected exactly one best ask, got {}",
                quotes.base.len()
            )));
        }
        if quotes.quote.len() != 1 {
            return Err(Error::DataIntegrity(format!(
                "expected exactly one best bid, got {}",
                quotes.quote.len()
            )));
        }
        let ask = quotes.base[0].quote_price;
        let bid = quotes.quote[0].quote_price;
        if !ask.is_finite() || !bid.is_finite() || ask <= 0.0 || bid <= 0.0 {
            return Err(Error::DataIntegrity(format!(
                "non-positive best quote prices: ask={ask}, bid={bid}"
            )));
        }
        let price = (ask + bid) / 2.0;
        Ok(Self {
            price,
            rate: price / (price + 1.0),
            queried_at: now,
        })
    }
}

/// Account holdings valued at a market price.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BalanceSnapshot {
    pub base: f64,
    pub quote: f64,
    pub price: f64,
    /// `base * price`
    pub base_value: f64,
    /// `base_value + quote`
    pub total_value: f64,
    /// `base_value / total_value`, or 0 for an empty account.
    pub rate: f64,
}

impl BalanceSnapshot {
    pub fn new(base: f64, quote: f64, price: f64) -> Self {
        let base_value = base * price;
        let total_value = base_value + quote;
        let rate = if total_value > 0.0 {
            base_value / total_value
        } else {
            0.0
        };
        Self {
            base,
            quote,
            price,
            base_value,
            total_value,
            rate,
        }
    }

    /// Locate the contract's base and quote entries and value them at `price`.
    pub fn from_balances(balances: &[Balance], contract: &Contract, price: f64) -> Result<Self> {
        let base = find_amount(balances, &contract.base.id)?;
        let quote = find_amount(balances, &contract.quote.id)?;
        Ok(Self::new(base, quote, price))
    }
}

fn find_amount(balances: &[Balance], denom: &str) -> Result<f64> {
    let entry = balances
        .iter()
        .find(|b| b.denom == denom)
        .ok_or_else(|| Error::DataIntegrity(format!("invalid balance: {denom} missing")))?;
    if !entry.amount.is_finite() || entry.amount < 0.0 {
        return Err(Error::DataIntegrity(format!(
            "invalid balance: {denom} amount {}",
            entry.amount
        )));
    }
    Ok(entry.amount)
}

/// Last known market and balances, plus the latched target rate.
///
/// The cache never fetches by itself: callers ask `*_needs_refresh`, do the
/// fetch, and `store_*` only once the fetch has succeeded.
#[derive(Clone, Debug)]
pub struct SnapshotCache {
    market: CachedValue<MarketSnapshot>,
    balances: CachedValue<BalanceSnapshot>,
    target_rate: Option<f64>,
    ttl: Duration,
}

impl SnapshotCache {
    /// A cache with an optional preset target rate.
    pub fn new(target_rate: Option<f64>) -> Self {
        Self {
            market: CachedValue::new(),
            balances: CachedValue::new(),
            target_rate,
            ttl: Duration::seconds(STALENESS_WINDOW_SECS),
        }
    }

    pub fn market_needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.market.needs_refresh(now)
    }

    pub fn balances_needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.balances.needs_refresh(now)
    }

    pub fn store_market(&mut self, snapshot: MarketSnapshot, now: DateTime<Utc>) {
        self.market.store(snapshot, now, self.ttl);
    }

    /// Store balances; the first stored rate becomes the target if none was set.
    pub fn store_balances(&mut self, snapshot: BalanceSnapshot, now: DateTime<Utc>) {
        if self.target_rate.is_none() {
            self.target_rate = Some(snapshot.rate);
        }
        self.balances.store(snapshot, now, self.ttl);
    }

    /// Holdings changed on the exchange; refetch on next use.
    pub fn invalidate_balances(&mut self) {
        self.balances.invalidate();
    }

    pub fn market(&self) -> Option<&MarketSnapshot> {
        self.market.get()
    }

    pub fn balances(&self) -> Option<&BalanceSnapshot> {
        self.balances.get()
    }

    pub fn target_rate(&self) -> Option<f64> {
        self.target_rate
    }
}
