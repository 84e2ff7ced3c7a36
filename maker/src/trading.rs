//! Reconciliation state machine: one trading instance for one wallet and contract.
//!
//! Each call to [`Trading::next`] performs at most one state transition:
//!
//! | State | Transition |
//! |---|---|
//! | INITIALIZE | refresh, check drift; 0 live orders → ORDER, 1 → WAITING, more → ORDER_CHECK |
//! | ORDER | live orders → ORDER_CHECK; else plan: gap → one correction + WAITING, ladder → ORDER_CHECK |
//! | ORDER_CHECK | 0 → ORDER; not 2n → CANCEL_ALL; ≥ n closed → FULFILLED; else stay |
//! | FULFILLED / CANCEL_ALL | withdraw closed, cancel the rest → ORDER |
//! | WAITING | 0 → ORDER; all closed → FULFILLED; else stay |
//! | MARKET_ORDER_CHECK | no-op |
//!
//! Any error aborts the tick with the state unchanged. The caller must not
//! run two ticks of one instance at the same time.

use std::sync::Arc;

use ladder_mm::{
    BalanceSnapshot, Clock, Contract, MarketSnapshot, OffsetLadder, Order, OrderRequest, Plan,
    SnapshotCache, SystemClock, Wallet, plan, to_order_requests,
};
use ladder_mm_gateway::ExchangeGateway;
use log::{debug, info, warn};

use crate::action_log::ActionLog;
use crate::error::{Error, Result};
use crate::notify::Notifier;
use crate::state::ClientState;

/// Construction-time settings of one instance.
#[derive(Clone, Debug)]
pub struct TradingParams {
    pub wallet: Wallet,
    pub contract: Contract,
    pub ladder: OffsetLadder,
    /// Desired base share of portfolio value; latched from the first balances when `None`.
    pub target_rate: Option<f64>,
}

/// A trading instance.
pub struct Trading<G> {
    gateway: G,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    wallet: Wallet,
    contract: Contract,
    ladder: OffsetLadder,
    snapshots: SnapshotCache,
    state: ClientState,
    actions: ActionLog,
}

impl<G: ExchangeGateway> Trading<G> {
    pub fn new(params: TradingParams, gateway: G) -> Result<Self> {
        if let Some(rate) = params.target_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ladder_mm::Error::InvalidTargetRate(rate).into());
            }
        }
        Ok(Self {
            gateway,
            notifier: Notifier::disabled(),
            clock: Arc::new(SystemClock),
            wallet: params.wallet,
            contract: params.contract,
            ladder: params.ladder,
            snapshots: SnapshotCache::new(params.target_rate),
            state: ClientState::Initialize,
            actions: ActionLog::new(),
        })
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn target_rate(&self) -> Option<f64> {
        self.snapshots.target_rate()
    }

    pub fn market(&self) -> Option<&MarketSnapshot> {
        self.snapshots.market()
    }

    pub fn balances(&self) -> Option<&BalanceSnapshot> {
        self.snapshots.balances()
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Lines collected by the current tick and not yet flushed.
    pub fn pending_actions(&self) -> &[String] {
        self.actions.lines()
    }

    /// Run one step, then flush the action log. Returns the state after the step.
    pub async fn tick(&mut self) -> Result<ClientState> {
        let before = self.state;
        info!("[start] {before}");

        let result = self.next().await;

        for line in self.actions.drain() {
            info!("{line}");
        }
        match &result {
            Ok(()) if before != self.state => info!("[end] {before} => {}", self.state),
            Ok(()) => info!("[end] {}", self.state),
            Err(e) => warn!("[end] {before} aborted: {e}"),
        }
        result.map(|()| self.state)
    }

    /// Advance the state machine by one step.
    pub async fn next(&mut self) -> Result<()> {
        let next = match self.state {
            ClientState::Initialize => self.initialize().await?,
            ClientState::Order => self.order().await?,
            ClientState::OrderCheck => self.order_check().await?,
            ClientState::FulfilledOrders | ClientState::CancelAllOrders => {
                self.clear_orders().await?
            }
            ClientState::MarketOrderCheck => ClientState::MarketOrderCheck,
            ClientState::WaitingAllOrderComplete => self.wait_all_complete().await?,
        };
        self.state = next;
        Ok(())
    }

    /// Replace the wallet session with a fresh one from the gateway.
    pub async fn reconnect(&mut self) -> Result<()> {
        info!("[wallet] reconnect...");
        self.wallet = self.gateway.reconnect_wallet(&self.wallet).await?;
        Ok(())
    }

    async fn initialize(&mut self) -> Result<ClientState> {
        self.refresh_market().await?;
        let balances = self.refresh_balances().await?;
        let target = self.require_target()?;

        let threshold = self.ladder.first();
        if (balances.rate - target).abs() >= threshold {
            return Err(Error::Configuration(format!(
                "current rate[{}] is off target rate[{target}] by at least {threshold}",
                balances.rate
            )));
        }

        let orders = self.list_orders().await?;
        Ok(match orders.len() {
            0 => ClientState::Order,
            1 => ClientState::WaitingAllOrderComplete,
            _ => ClientState::OrderCheck,
        })
    }

    async fn order(&mut self) -> Result<ClientState> {
        if !self.list_orders().await?.is_empty() {
            return Ok(ClientState::OrderCheck);
        }

        let market_price = self.refresh_market().await?.price;
        let balances = self.refresh_balances().await?;
        let target = self.require_target()?;
        debug!(
            "balance rate at current is {}",
            BalanceSnapshot::new(balances.base, balances.quote, market_price).rate
        );

        match plan(&balances, market_price, target, &self.ladder) {
            Plan::Correction(rung) => {
                warn!(
                    "[price] found gap between market price{{{market_price}}} and order price{{{}}}",
                    rung.price
                );
                let requests = to_order_requests(&self.contract, std::slice::from_ref(&rung));
                self.actions
                    .push(format!("[orders] request: {}", to_json(&requests)));
                self.gateway.submit_orders(&self.wallet, &requests).await?;
                Ok(ClientState::WaitingAllOrderComplete)
            }
            Plan::Ladder { sells, buys } => {
                let mut requests = to_order_requests(&self.contract, &sells);
                requests.extend(to_order_requests(&self.contract, &buys));
                self.actions.push(format!("[orders] {}", to_json(&requests)));
                self.gateway.submit_orders(&self.wallet, &requests).await?;

                self.notifier
                    .send(format!("Orders\n{}", describe_orders(&requests)));
                Ok(ClientState::OrderCheck)
            }
        }
    }

    async fn order_check(&mut self) -> Result<ClientState> {
        let orders = self.list_orders().await?;
        if orders.is_empty() {
            return Ok(ClientState::Order);
        }
        if orders.len() != self.ladder.steady_state_orders() {
            return Ok(ClientState::CancelAllOrders);
        }
        let fulfilled = orders.iter().filter(|o| o.is_closed()).count();
        if fulfilled >= self.ladder.len() {
            return Ok(ClientState::FulfilledOrders);
        }
        self.actions.push(format!(
            "[order state] idxs: {} fulfilled orders: {fulfilled}",
            join_idxs(orders.iter())
        ));
        Ok(ClientState::OrderCheck)
    }

    async fn clear_orders(&mut self) -> Result<ClientState> {
        let (fulfilled, unfilled): (Vec<Order>, Vec<Order>) = self
            .list_orders()
            .await?
            .into_iter()
            .partition(Order::is_closed);

        let withdraw_idxs = join_idxs(fulfilled.iter());
        let cancel_idxs = join_idxs(unfilled.iter());
        self.actions
            .push(format!("[orders] withdraw: {withdraw_idxs:?}"));
        self.actions.push(format!("[orders] cancel: {cancel_idxs:?}"));

        if !fulfilled.is_empty() {
            self.gateway
                .withdraw_orders(&self.wallet, &self.contract, &fulfilled)
                .await?;
        }
        if !unfilled.is_empty() {
            self.gateway
                .cancel_orders(&self.wallet, &self.contract, &unfilled)
                .await?;
        }
        // Holdings just moved; the next plan must not reuse pre-settlement balances.
        self.snapshots.invalidate_balances();

        self.notifier.send(format!("Withdraw\n{withdraw_idxs}"));
        self.notifier.send(format!("Cancel\n{cancel_idxs}"));
        Ok(ClientState::Order)
    }

    async fn wait_all_complete(&mut self) -> Result<ClientState> {
        let orders = self.list_orders().await?;
        if orders.is_empty() {
            return Ok(ClientState::Order);
        }
        if orders.iter().all(Order::is_closed) {
            return Ok(ClientState::FulfilledOrders);
        }
        Ok(ClientState::WaitingAllOrderComplete)
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.gateway.list_orders(&self.wallet, &self.contract).await?)
    }

    /// Current market snapshot, fetching the book only when the cached one is stale.
    async fn refresh_market(&mut self) -> Result<MarketSnapshot> {
        let now = self.clock.now();
        if !self.snapshots.market_needs_refresh(now) {
            if let Some(market) = self.snapshots.market() {
                return Ok(market.clone());
            }
        }

        let book = self
            .gateway
            .fetch_best_quotes(&self.wallet, &self.contract, 1)
            .await?;
        let snapshot = MarketSnapshot::from_quotes(&book, now)?;
        self.actions.push(format!(
            "[market] price: {}, rate: {}",
            snapshot.price, snapshot.rate
        ));
        self.snapshots.store_market(snapshot.clone(), now);
        Ok(snapshot)
    }

    /// Current balances valued at the cached market price.
    async fn refresh_balances(&mut self) -> Result<BalanceSnapshot> {
        let now = self.clock.now();
        if !self.snapshots.balances_needs_refresh(now) {
            if let Some(balances) = self.snapshots.balances() {
                return Ok(balances.clone());
            }
        }

        let price = self
            .snapshots
            .market()
            .map(|m| m.price)
            .ok_or_else(|| Error::DataIntegrity("balances requested before any market price".into()))?;
        let raw = self
            .gateway
            .fetch_balances(&self.wallet, &self.contract)
            .await?;
        let snapshot = BalanceSnapshot::from_balances(&raw, &self.contract, price)?;
        self.snapshots.store_balances(snapshot.clone(), now);

        let base = &self.contract.base;
        let quote = &self.contract.quote;
        self.actions.push(format!(
            "[balances] base/quote: {}{base}/{}{quote}, balanceTotal: {}{quote}, balanceRate: {}, targetRate: {}",
            snapshot.base,
            snapshot.quote,
            snapshot.total_value,
            snapshot.rate,
            self.snapshots.target_rate().unwrap_or(snapshot.rate),
        ));
        Ok(snapshot)
    }

    fn require_target(&self) -> Result<f64> {
        self.snapshots
            .target_rate()
            .ok_or_else(|| Error::DataIntegrity("target rate not latched".into()))
    }
}

fn join_idxs<'a>(orders: impl Iterator<Item = &'a Order>) -> String {
    orders
        .map(|o| o.idx.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Operator summary, highest price first.
fn describe_orders(requests: &[OrderRequest]) -> String {
    let mut sorted: Vec<&OrderRequest> = requests.iter().collect();
    sorted.sort_by(|a, b| b.price.total_cmp(&a.price));
    sorted
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_json(requests: &[OrderRequest]) -> String {
    serde_json::to_string(requests).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_mm::{Denom, Side};

    fn request(contract: &Contract, side: Side, price: f64) -> OrderRequest {
        OrderRequest {
            uuid: ladder_mm::Uuid::new_v4(),
            contract: contract.clone(),
            side,
            price,
            amount: 1.0,
        }
    }

    fn contract() -> Contract {
        Contract {
            address: "kujira1fin".into(),
            base: Denom::new("uatom", "ATOM"),
            quote: Denom::new("uusk", "USK"),
            price_decimals: 2,
        }
    }

    #[test]
    fn describe_sorts_by_descending_price() {
        let requests = vec![
            request(&contract(), Side::Sell, 101.0),
            request(&contract(), Side::Buy, 99.0),
            request(&contract(), Side::Sell, 102.0),
        ];
        let text = describe_orders(&requests);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("at 102.00 USK"));
        assert!(lines[1].ends_with("at 101.00 USK"));
        assert!(lines[2].starts_with("BUY"));
    }

    #[test]
    fn idxs_joined_with_commas() {
        let order = |idx: &str| Order {
            idx: idx.into(),
            side: Side::Buy,
            price: 1.0,
            amount: 1.0,
            state: ladder_mm::OrderState::Open,
        };
        let orders = [order("3"), order("9")];
        assert_eq!(join_idxs(orders.iter()), "3,9");
        let none: [Order; 0] = [];
        assert_eq!(join_idxs(none.iter()), "");
    }

    #[test]
    fn json_trace_contains_side() {
        let json = to_json(&[request(&contract(), Side::Sell, 101.0)]);
        assert!(json.contains("\"side\":\"Sell\""));
    }
}
