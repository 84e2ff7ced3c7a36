//! ladder-mm-maker: tick-driven ratio-rebalancing market maker.
//!
//! Each configured market runs one [`trading::Trading`] instance, a state
//! machine that plans a symmetric order ladder around the mid price, waits
//! for fills, settles them, and plans again. [`scheduler::run`] drives it on
//! a fixed interval; the binary wires it to the paper exchange.

pub mod action_log;
pub mod config;
pub mod error;
pub mod notify;
pub mod paper_feed;
pub mod scheduler;
pub mod state;
pub mod trading;
