//! Paper exchange: a single-pair, in-memory `ExchangeGateway`.
//!
//! Resting orders lock their funds on submit and fill in full as soon as
//! the mid price reaches them. Fill proceeds are credited on withdraw, the
//! unfilled amount is refunded on cancel. Every call is counted, and any
//! operation can be made to fail once, which is what the state-machine
//! tests lean on. A dropped session fails every call with
//! `GatewayError::Connection` until the wallet reconnects.
//!
//! ```ignore
//! use ladder_mm_gateway::paper::{Operation, PaperGateway};
//!
//! let exchange = PaperGateway::builder(contract)
//!     .with_balance("uatom", 5.0)
//!     .with_balance("uusk", 500.0)
//!     .mid_price(100.0)
//!     .build();
//!
//! exchange.fail_next(Operation::ListOrders, GatewayError::RateLimit);
//! ```

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use ladder_mm::{
    Balance, BookQuote, BookQuotes, Contract, Order, OrderRequest, OrderState, Side, Wallet,
};
use log::debug;
use rustc_hash::FxHashMap;

use crate::ExchangeGateway;
use crate::error::{GatewayError, GatewayResult};

/// Gateway operations, for call counting and failure injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchBalances,
    FetchBestQuotes,
    ListOrders,
    SubmitOrders,
    WithdrawOrders,
    CancelOrders,
    ReconnectWallet,
}

/// Builder for `PaperGateway`.
pub struct PaperGatewayBuilder {
    contract: Contract,
    balances: FxHashMap<String, f64>,
    mid: f64,
    half_spread: f64,
}

impl PaperGatewayBuilder {
    pub fn with_balance(mut self, denom: &str, amount: f64) -> Self {
        self.balances.insert(denom.to_string(), amount);
        self
    }

    pub fn mid_price(mut self, mid: f64) -> Self {
        self.mid = mid;
        self
    }

    /// Distance from the mid to the best bid and best ask.
    pub fn half_spread(mut self, half_spread: f64) -> Self {
        self.half_spread = half_spread;
        self
    }

    pub fn build(self) -> PaperGateway {
        PaperGateway {
            contract: self.contract,
            state: Mutex::new(PaperState {
                balances: self.balances,
                mid: self.mid,
                half_spread: self.half_spread,
                orders: Vec::new(),
                next_idx: 1,
                calls: FxHashMap::default(),
                failures: FxHashMap::default(),
                book_override: None,
                submitted: Vec::new(),
                session: 0,
                connected: true,
            }),
        }
    }
}

struct PaperState {
    balances: FxHashMap<String, f64>,
    mid: f64,
    half_spread: f64,
    /// Resting and filled-but-unclaimed orders, in placement order.
    orders: Vec<Order>,
    next_idx: u64,
    calls: FxHashMap<Operation, usize>,
    failures: FxHashMap<Operation, GatewayError>,
    book_override: Option<BookQuotes>,
    submitted: Vec<OrderRequest>,
    session: u64,
    connected: bool,
}

impl PaperState {
    fn credit(&mut self, denom: &str, amount: f64) {
        *self.balances.entry(denom.to_string()).or_insert(0.0) += amount;
    }

    fn debit(&mut self, denom: &str, amount: f64) {
        *self.balances.entry(denom.to_string()).or_insert(0.0) -= amount;
    }

    /// Close every open order the current mid has reached.
    fn match_orders(&mut self) {
        let mid = self.mid;
        for order in self.orders.iter_mut().filter(|o| !o.is_closed()) {
            let crossed = match order.side {
                Side::Sell => mid >= order.price,
                Side::Buy => mid <= order.price,
            };
            if crossed {
                debug!("paper fill: {} {} @ {}", order.idx, order.side, order.price);
                order.state = OrderState::Closed;
            }
        }
    }
}

/// In-memory exchange for one contract.
pub struct PaperGateway {
    contract: Contract,
    state: Mutex<PaperState>,
}

impl PaperGateway {
    pub fn builder(contract: Contract) -> PaperGatewayBuilder {
        PaperGatewayBuilder {
            contract,
            balances: FxHashMap::default(),
            mid: 1.0,
            half_spread: 0.0,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PaperState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call and consume a pending injected failure, if any.
    fn enter(&self, op: Operation) -> GatewayResult<MutexGuard<'_, PaperState>> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        if let Some(err) = state.failures.remove(&op) {
            return Err(err);
        }
        if !state.connected && op != Operation::ReconnectWallet {
            return Err(GatewayError::Connection(format!(
                "session {} dropped",
                state.session
            )));
        }
        Ok(state)
    }

    /// Move the market; resting orders it reaches are filled.
    pub fn set_mid(&self, mid: f64) {
        let mut state = self.lock();
        state.mid = mid;
        state.match_orders();
    }

    pub fn mid(&self) -> f64 {
        self.lock().mid
    }

    /// Free (unlocked) balance of a denom.
    pub fn balance(&self, denom: &str) -> f64 {
        self.lock().balances.get(denom).copied().unwrap_or(0.0)
    }

    pub fn orders(&self) -> Vec<Order> {
        self.lock().orders.clone()
    }

    /// Every request ever submitted, in order.
    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.lock().submitted.clone()
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Make the next call of `op` fail with `err`.
    pub fn fail_next(&self, op: Operation, err: GatewayError) {
        self.lock().failures.insert(op, err);
    }

    /// Drop the wallet session; calls fail until `reconnect_wallet`.
    pub fn drop_session(&self) {
        self.lock().connected = false;
    }

    /// Serve this book instead of the synthetic one (`None` restores it).
    pub fn override_book(&self, book: Option<BookQuotes>) {
        self.lock().book_override = book;
    }

    /// Place an order directly, without locking funds.
    pub fn insert_order(&self, side: Side, price: f64, amount: f64, state: OrderState) -> String {
        let mut inner = self.lock();
        let idx = inner.next_idx.to_string();
        inner.next_idx += 1;
        inner.orders.push(Order {
            idx: idx.clone(),
            side,
            price,
            amount,
            state,
        });
        idx
    }

    pub fn set_order_state(&self, idx: &str, state: OrderState) {
        if let Some(order) = self.lock().orders.iter_mut().find(|o| o.idx == idx) {
            order.state = state;
        }
    }

    fn check_contract(&self, contract: &Contract) -> GatewayResult<()> {
        if contract.address != self.contract.address {
            return Err(GatewayError::Other(format!(
                "unknown contract {}",
                contract.address
            )));
        }
        Ok(())
    }

    /// Denom and amount a filled order pays out.
    fn proceeds(&self, order: &Order) -> (&str, f64) {
        match order.side {
            Side::Sell => (&self.contract.quote.id, order.amount * order.price),
            Side::Buy => (&self.contract.base.id, order.amount / order.price),
        }
    }

    fn locked_denom(&self, side: Side) -> &str {
        match side {
            Side::Sell => &self.contract.base.id,
            Side::Buy => &self.contract.quote.id,
        }
    }
}

#[async_trait]
impl ExchangeGateway for PaperGateway {
    async fn fetch_balances(
        &self,
        _wallet: &Wallet,
        contract: &Contract,
    ) -> GatewayResult<Vec<Balance>> {
        let state = self.enter(Operation::FetchBalances)?;
        self.check_contract(contract)?;
        let mut balances: Vec<Balance> = state
            .balances
            .iter()
            .map(|(denom, amount)| Balance {
                denom: denom.clone(),
                amount: *amount,
            })
            .collect();
        balances.sort_by(|a, b| a.denom.cmp(&b.denom));
        Ok(balances)
    }

    async fn fetch_best_quotes(
        &self,
        _wallet: &Wallet,
        contract: &Contract,
        limit: usize,
    ) -> GatewayResult<BookQuotes> {
        let state = self.enter(Operation::FetchBestQuotes)?;
        self.check_contract(contract)?;
        if let Some(book) = &state.book_override {
            return Ok(book.clone());
        }
        let depth = limit.min(1);
        let level = |price: f64| BookQuote {
            quote_price: price,
            total_offer_amount: 1_000.0,
        };
        Ok(BookQuotes {
            base: vec![level(state.mid + state.half_spread); depth],
            quote: vec![level(state.mid - state.half_spread); depth],
        })
    }

    async fn list_orders(&self, _wallet: &Wallet, contract: &Contract) -> GatewayResult<Vec<Order>> {
        let state = self.enter(Operation::ListOrders)?;
        self.check_contract(contract)?;
        Ok(state.orders.clone())
    }

    async fn submit_orders(&self, _wallet: &Wallet, orders: &[OrderRequest]) -> GatewayResult<()> {
        let mut state = self.enter(Operation::SubmitOrders)?;
        for request in orders {
            self.check_contract(&request.contract)?;
            if !request.amount.is_finite() || request.amount <= 0.0 || request.price <= 0.0 {
                return Err(GatewayError::Order(format!(
                    "invalid order: {} {} @ {}",
                    request.side, request.amount, request.price
                )));
            }
        }
        let mut needed: FxHashMap<&str, f64> = FxHashMap::default();
        for request in orders {
            *needed.entry(self.locked_denom(request.side)).or_insert(0.0) += request.amount;
        }
        for (denom, amount) in needed {
            let available = state.balances.get(denom).copied().unwrap_or(0.0);
            if available < amount {
                return Err(GatewayError::Order(format!(
                    "insufficient {denom}: need {amount}, have {available}"
                )));
            }
        }
        for request in orders {
            state.debit(self.locked_denom(request.side), request.amount);
            let idx = state.next_idx.to_string();
            state.next_idx += 1;
            state.orders.push(Order {
                idx,
                side: request.side,
                price: request.price,
                amount: request.amount,
                state: OrderState::Open,
            });
            state.submitted.push(request.clone());
        }
        state.match_orders();
        Ok(())
    }

    async fn withdraw_orders(
        &self,
        _wallet: &Wallet,
        contract: &Contract,
        orders: &[Order],
    ) -> GatewayResult<()> {
        let mut state = self.enter(Operation::WithdrawOrders)?;
        self.check_contract(contract)?;
        for order in orders {
            let Some(pos) = state.orders.iter().position(|o| o.idx == order.idx) else {
                return Err(GatewayError::Order(format!("unknown order {}", order.idx)));
            };
            if !state.orders[pos].is_closed() {
                return Err(GatewayError::Order(format!("order {} is not filled", order.idx)));
            }
            let filled = state.orders.remove(pos);
            let (denom, amount) = self.proceeds(&filled);
            state.credit(denom, amount);
        }
        Ok(())
    }

    async fn cancel_orders(
        &self,
        _wallet: &Wallet,
        contract: &Contract,
        orders: &[Order],
    ) -> GatewayResult<()> {
        let mut state = self.enter(Operation::CancelOrders)?;
        self.check_contract(contract)?;
        for order in orders {
            let Some(pos) = state.orders.iter().position(|o| o.idx == order.idx) else {
                return Err(GatewayError::Order(format!("unknown order {}", order.idx)));
            };
            let cancelled = state.orders.remove(pos);
            if cancelled.is_closed() {
                let (denom, amount) = self.proceeds(&cancelled);
                state.credit(denom, amount);
            } else {
                state.credit(self.locked_denom(cancelled.side), cancelled.amount);
            }
        }
        Ok(())
    }

    async fn reconnect_wallet(&self, wallet: &Wallet) -> GatewayResult<Wallet> {
        let mut state = self.enter(Operation::ReconnectWallet)?;
        state.session += 1;
        state.connected = true;
        Ok(Wallet {
            address: wallet.address.clone(),
            session: state.session,
        })
    }
}
