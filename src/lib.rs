//! # ladder-mm
//!
//! Core of a ratio-rebalancing market maker for a single base/quote pair.
//!
//! Given a target share of portfolio value held in the base asset and a
//! ladder of percentage offsets, the planner derives a symmetric set of
//! limit orders that pull holdings back toward the target as price moves.
//!
//! This crate is pure: no I/O, no async. Exchange access lives in
//! `ladder-mm-gateway`, the tick-driven state machine in `ladder-mm-maker`.
//!
//! ## Quick Start
//!
//! ```
//! use ladder_mm::{BalanceSnapshot, Contract, Denom, OffsetLadder, Plan, plan, to_order_requests};
//!
//! let contract = Contract {
//!     address: "kujira1fin".into(),
//!     base: Denom::new("uatom", "ATOM"),
//!     quote: Denom::new("uusk", "USK"),
//!     price_decimals: 2,
//! };
//! let balances = BalanceSnapshot::new(5.0, 500.0, 100.0);
//! let ladder = OffsetLadder::new(vec![0.1]).unwrap();
//!
//! match plan(&balances, 100.0, 0.5, &ladder) {
//!     Plan::Ladder { sells, buys } => {
//!         let sell = &to_order_requests(&contract, &sells)[0];
//!         let buy = &to_order_requests(&contract, &buys)[0];
//!         assert_eq!(sell.to_string(), "SELL 0.2273 ATOM at 110.00 USK");
//!         assert_eq!(buy.to_string(), "BUY 25.0000 USK at 90.00 USK");
//!     }
//!     Plan::Correction(_) => unreachable!("balanced portfolio"),
//! }
//! ```
//!
//! ## Caching
//!
//! Market and balance snapshots are refetched at most once per
//! [`STALENESS_WINDOW_SECS`]; see [`SnapshotCache`] and [`CachedValue`].

pub mod cache;
pub mod error;
pub mod ladder;
pub mod planner;
pub mod side;
pub mod snapshot;
pub mod types;

pub use cache::{CachedValue, Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use ladder::{bucketed_quantities, to_order_requests};
pub use planner::{OffsetLadder, Plan, Rung, plan, plan_rungs};
pub use side::Side;
pub use snapshot::{BalanceSnapshot, MarketSnapshot, STALENESS_WINDOW_SECS, SnapshotCache};
pub use types::{
    Balance, BookQuote, BookQuotes, Contract, Denom, Order, OrderRequest, OrderState, Wallet,
};
pub use uuid::Uuid;
