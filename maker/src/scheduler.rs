//! Fixed-interval tick loop for one trading instance.

use std::time::Duration;

use ladder_mm_gateway::ExchangeGateway;
use log::{error, info, warn};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::state::ClientState;
use crate::trading::Trading;

/// How the loop runs.
#[derive(Clone, Debug)]
pub struct ScheduleOptions {
    pub interval: Duration,
    /// Consecutive failed ticks before reconnecting the wallet; 0 never reconnects.
    pub reconnect_after_failures: u32,
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
}

/// What a finished loop did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub failures: u64,
    pub reconnects: u64,
    pub last_state: Option<ClientState>,
}

/// Tick `trading` every `opts.interval` until `shutdown` flips to true or
/// `max_ticks` is reached.
///
/// Ticks never overlap: a slow tick delays the next one instead of queueing.
pub async fn run<G: ExchangeGateway>(
    trading: &mut Trading<G>,
    opts: &ScheduleOptions,
    mut shutdown: watch::Receiver<bool>,
) -> RunSummary {
    let mut summary = RunSummary::default();
    let mut consecutive_failures = 0u32;
    let mut interval = time::interval(opts.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let market = trading.contract().address.clone();
    info!("[{market}] scheduler started, every {:?}", opts.interval);

    loop {
        if *shutdown.borrow() {
            break;
        }
        if opts.max_ticks.is_some_and(|max| summary.ticks >= max) {
            break;
        }
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        summary.ticks += 1;
        match trading.tick().await {
            Ok(state) => {
                consecutive_failures = 0;
                summary.last_state = Some(state);
            }
            Err(e) => {
                summary.failures += 1;
                consecutive_failures += 1;
                error!("[{market}] tick failed: {e}");

                if opts.reconnect_after_failures > 0
                    && consecutive_failures >= opts.reconnect_after_failures
                {
                    consecutive_failures = 0;
                    match trading.reconnect().await {
                        Ok(()) => summary.reconnects += 1,
                        Err(e) => warn!("[{market}] reconnect failed: {e}"),
                    }
                }
            }
        }
    }

    info!(
        "[{market}] scheduler stopped after {} ticks ({} failed)",
        summary.ticks, summary.failures
    );
    summary
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ladder_mm::{Contract, Denom, OffsetLadder, Wallet};
    use ladder_mm_gateway::GatewayError;
    use ladder_mm_gateway::paper::{Operation, PaperGateway};

    use super::*;
    use crate::trading::TradingParams;

    fn contract() -> Contract {
        Contract {
            address: "kujira1fin".into(),
            base: Denom::new("uatom", "ATOM"),
            quote: Denom::new("uusk", "USK"),
            price_decimals: 2,
        }
    }

    fn trading(exchange: Arc<PaperGateway>) -> Trading<Arc<PaperGateway>> {
        let params = TradingParams {
            wallet: Wallet::new("kujira1wallet"),
            contract: contract(),
            ladder: OffsetLadder::new(vec![0.1]).unwrap(),
            target_rate: None,
        };
        Trading::new(params, exchange).unwrap()
    }

    fn exchange() -> Arc<PaperGateway> {
        Arc::new(
            PaperGateway::builder(contract())
                .with_balance("uatom", 5.0)
                .with_balance("uusk", 500.0)
                .mid_price(100.0)
                .build(),
        )
    }

    fn opts(max_ticks: u64, reconnect_after_failures: u32) -> ScheduleOptions {
        ScheduleOptions {
            interval: Duration::from_millis(100),
            reconnect_after_failures,
            max_ticks: Some(max_ticks),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_bounded_number_of_ticks() {
        let ex = exchange();
        let mut t = trading(ex.clone());
        let (_tx, rx) = watch::channel(false);

        let summary = run(&mut t, &opts(3, 0), rx).await;
        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.failures, 0);
        // INITIALIZE -> ORDER -> ORDER_CHECK
        assert_eq!(summary.last_state, Some(ClientState::OrderCheck));
        assert_eq!(ex.orders().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_consecutive_failures() {
        let ex = exchange();
        let mut t = trading(ex.clone());
        let (_tx, rx) = watch::channel(false);

        ex.override_book(Some(ladder_mm::BookQuotes {
            base: vec![],
            quote: vec![],
        }));
        let summary = run(&mut t, &opts(4, 2), rx).await;
        assert_eq!(summary.failures, 4);
        assert_eq!(summary.reconnects, 2);
        assert_eq!(t.wallet().session, 2);
        assert_eq!(t.state(), ClientState::Initialize);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_session_recovers_after_reconnect() {
        let ex = exchange();
        let mut t = trading(ex.clone());
        let (_tx, rx) = watch::channel(false);

        ex.drop_session();
        let summary = run(&mut t, &opts(3, 2), rx).await;
        assert_eq!(summary.failures, 2);
        assert_eq!(summary.reconnects, 1);
        assert_eq!(summary.last_state, Some(ClientState::Order));
        assert_eq!(t.wallet().session, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reconnect_is_not_counted() {
        let ex = exchange();
        let mut t = trading(ex.clone());
        let (_tx, rx) = watch::channel(false);

        ex.fail_next(Operation::FetchBestQuotes, GatewayError::RateLimit);
        ex.fail_next(Operation::ReconnectWallet, GatewayError::NotConnected);
        let summary = run(&mut t, &opts(1, 1), rx).await;
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.reconnects, 0);
        assert_eq!(t.wallet().session, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_shutdown() {
        let ex = exchange();
        let mut t = trading(ex);
        let (tx, rx) = watch::channel(false);
        let options = ScheduleOptions {
            interval: Duration::from_secs(1),
            reconnect_after_failures: 0,
            max_ticks: None,
        };

        let handle = tokio::spawn(async move { run(&mut t, &options, rx).await });
        time::sleep(Duration::from_millis(2_500)).await;
        tx.send(true).unwrap();
        let summary = handle.await.unwrap();
        assert_eq!(summary.ticks, 3);
    }
}
