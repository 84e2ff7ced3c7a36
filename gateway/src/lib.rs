//! Exchange gateway for ladder-mm.
//!
//! Provides the `ExchangeGateway` trait the market maker drives, and
//! [`paper::PaperGateway`], an in-memory single-pair exchange for tests and
//! paper trading.

pub mod error;
pub mod paper;

pub use error::{GatewayError, GatewayResult};

use std::sync::Arc;

use async_trait::async_trait;
use ladder_mm::{Balance, BookQuotes, Contract, Order, OrderRequest, Wallet};

/// The exchange operations a trading instance needs.
///
/// Every call is an I/O boundary; errors surface unchanged to the caller.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Wallet balances, one entry per denom held.
    async fn fetch_balances(&self, wallet: &Wallet, contract: &Contract)
    -> GatewayResult<Vec<Balance>>;

    /// Best `limit` book levels on each side.
    async fn fetch_best_quotes(
        &self,
        wallet: &Wallet,
        contract: &Contract,
        limit: usize,
    ) -> GatewayResult<BookQuotes>;

    /// Orders owned by `wallet` on this contract, including closed ones not yet withdrawn.
    async fn list_orders(&self, wallet: &Wallet, contract: &Contract) -> GatewayResult<Vec<Order>>;

    async fn submit_orders(&self, wallet: &Wallet, orders: &[OrderRequest]) -> GatewayResult<()>;

    /// Claim the proceeds of filled orders.
    async fn withdraw_orders(
        &self,
        wallet: &Wallet,
        contract: &Contract,
        orders: &[Order],
    ) -> GatewayResult<()>;

    async fn cancel_orders(
        &self,
        wallet: &Wallet,
        contract: &Contract,
        orders: &[Order],
    ) -> GatewayResult<()>;

    /// Re-establish the session and return the replacement handle.
    async fn reconnect_wallet(&self, wallet: &Wallet) -> GatewayResult<Wallet>;
}

#[async_trait]
impl<G: ExchangeGateway + ?Sized> ExchangeGateway for Arc<G> {
    async fn fetch_balances(
        &self,
        wallet: &Wallet,
        contract: &Contract,
    ) -> GatewayResult<Vec<Balance>> {
        (**self).fetch_balances(wallet, contract).await
    }

    async fn fetch_best_quotes(
        &self,
        wallet: &Wallet,
        contract: &Contract,
        limit: usize,
    ) -> GatewayResult<BookQuotes> {
        (**self).fetch_best_quotes(wallet, contract, limit).await
    }

    async fn list_orders(&self, wallet: &Wallet, contract: &Contract) -> GatewayResult<Vec<Order>> {
        (**self).list_orders(wallet, contract).await
    }

    async fn submit_orders(&self, wallet: &Wallet, orders: &[OrderRequest]) -> GatewayResult<()> {
        (**self).submit_orders(wallet, orders).await
    }

    async fn withdraw_orders(
        &self,
        wallet: &Wallet,
        contract: &Contract,
        orders: &[Order],
    ) -> GatewayResult<()> {
        (**self).withdraw_orders(wallet, contract, orders).await
    }

    async fn cancel_orders(
        &self,
        wallet: &Wallet,
        contract: &Contract,
        orders: &[Order],
    ) -> GatewayResult<()> {
        (**self).cancel_orders(wallet, contract, orders).await
    }

    async fn reconnect_wallet(&self, wallet: &Wallet) -> GatewayResult<Wallet> {
        (**self).reconnect_wallet(wallet).await
    }
}
