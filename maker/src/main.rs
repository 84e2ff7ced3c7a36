//! CLI entry point for the ladder market maker.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ladder_mm::{BalanceSnapshot, Plan, plan, to_order_requests};
use ladder_mm_gateway::paper::PaperGateway;
use log::{error, info};
use tokio::sync::watch;

use ladder_mm_maker::config::{Config, MarketConfig};
use ladder_mm_maker::error::{Error, Result};
use ladder_mm_maker::notify::{Notifier, TelegramSink};
use ladder_mm_maker::paper_feed::{self, RandomWalk};
use ladder_mm_maker::scheduler::{self, ScheduleOptions};
use ladder_mm_maker::trading::Trading;

#[derive(Parser)]
#[command(name = "ladder-mm")]
#[command(about = "Ratio-rebalancing ladder market maker")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trade every configured market against the paper exchange
    Run {
        /// Stop each market after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Print the order ladder for the configured balances without trading
    Plan,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run { ticks } => run(&config, ticks).await,
        Command::Plan => show_plan(&config),
    };

    if let Err(e) = result {
        match &e {
            Error::Configuration(msg) => {
                eprintln!("Configuration error: {msg}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}

fn paper_exchange(config: &Config, market: &MarketConfig) -> PaperGateway {
    PaperGateway::builder(market.contract())
        .with_balance(&market.base_denom, market.paper.base_balance)
        .with_balance(&market.quote_denom, market.paper.quote_balance)
        .mid_price(market.paper.mid_price)
        .half_spread(market.paper.mid_price * config.paper.half_spread)
        .build()
}

fn notifier(config: &Config) -> Notifier {
    match (&config.notify.chat_id, &config.notify.bot_token) {
        (Some(chat_id), Some(token)) => Notifier::new(Arc::new(TelegramSink::new(token, chat_id))),
        _ => Notifier::disabled(),
    }
}

async fn run(config: &Config, ticks: Option<u64>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let options = ScheduleOptions {
        interval: config.tick_interval(),
        reconnect_after_failures: config.scheduler.reconnect_after_failures,
        max_ticks: ticks,
    };
    let notifier = notifier(config);
    if !notifier.is_enabled() {
        info!("notifications disabled");
    }

    // Build every instance first so a bad market aborts before any trading starts.
    let mut instances = Vec::with_capacity(config.markets.len());
    for market in &config.markets {
        let exchange = Arc::new(paper_exchange(config, market));
        let trading = Trading::new(market.trading_params()?, exchange.clone())?
            .with_notifier(notifier.clone());
        instances.push((exchange, trading));
    }

    let shutdown_tx = Arc::new(shutdown_tx);
    let signal_tx = shutdown_tx.clone();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, stopping");
            let _ = signal_tx.send(true);
        }
    });

    let mut schedulers = Vec::new();
    let mut feeds = Vec::new();
    for (exchange, mut trading) in instances {
        let walk = RandomWalk::new(config.paper.price_step);
        feeds.push(tokio::spawn(paper_feed::run(
            exchange,
            walk,
            config.step_interval(),
            shutdown_rx.clone(),
        )));
        let options = options.clone();
        let rx = shutdown_rx.clone();
        schedulers.push(tokio::spawn(async move {
            let summary = scheduler::run(&mut trading, &options, rx).await;
            (trading.contract().address.clone(), summary)
        }));
    }

    let mut summaries = Vec::with_capacity(schedulers.len());
    for handle in schedulers {
        match handle.await {
            Ok(done) => summaries.push(done),
            Err(e) => error!("scheduler task failed: {e}"),
        }
    }
    let _ = shutdown_tx.send(true);
    signal.abort();
    for feed in feeds {
        let _ = feed.await;
    }

    for (market, summary) in summaries {
        println!(
            "{market}: {} ticks, {} failed, {} reconnects, last state {}",
            summary.ticks,
            summary.failures,
            summary.reconnects,
            summary.last_state.map_or("-", |s| s.as_str()),
        );
    }
    Ok(())
}

fn show_plan(config: &Config) -> Result<()> {
    for market in &config.markets {
        let contract = market.contract();
        let ladder = market.ladder()?;
        let price = market.paper.mid_price;
        let balances =
            BalanceSnapshot::new(market.paper.base_balance, market.paper.quote_balance, price);
        let target = market.target_rate.unwrap_or(balances.rate);

        println!(
            "{} @ {} (rate {:.4}, target {:.4})",
            contract.address,
            contract.format_price(price),
            balances.rate,
            target
        );
        match plan(&balances, price, target, &ladder) {
            Plan::Ladder { sells, buys } => {
                let sells = to_order_requests(&contract, &sells);
                let buys = to_order_requests(&contract, &buys);
                for request in sells.iter().rev().chain(buys.iter()) {
                    println!("  {request}");
                }
            }
            Plan::Correction(rung) => {
                println!("  price gap at {}", contract.format_price(rung.price));
                for request in to_order_requests(&contract, std::slice::from_ref(&rung)) {
                    println!("  {request}");
                }
            }
        }
    }
    Ok(())
}
