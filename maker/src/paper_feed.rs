//! Random-walk price feed that moves the paper exchange's mid.

use std::sync::Arc;
use std::time::Duration;

use ladder_mm_gateway::paper::PaperGateway;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

/// Multiplicative random walk: each step moves the price by a uniform
/// fraction in `[-step, step]`.
pub struct RandomWalk {
    rng: StdRng,
    step: f64,
}

impl RandomWalk {
    pub fn new(step: f64) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            step,
        }
    }

    /// Reproducible walk for tests.
    pub fn seeded(step: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            step,
        }
    }

    pub fn next_price(&mut self, price: f64) -> f64 {
        if self.step <= 0.0 {
            return price;
        }
        let change = self.rng.gen_range(-self.step..=self.step);
        let next = price * (1.0 + change);
        // Only a step of 1.0 or more can reach zero.
        if next > 0.0 { next } else { price }
    }
}

/// Drive `exchange`'s mid every `interval` until `shutdown` flips to true.
pub async fn run(
    exchange: Arc<PaperGateway>,
    mut walk: RandomWalk,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let mid = walk.next_price(exchange.mid());
                debug!("paper mid -> {mid}");
                exchange.set_mid(mid);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_mm::{Contract, Denom};

    #[test]
    fn walk_stays_within_step() {
        let mut walk = RandomWalk::seeded(0.01, 7);
        let mut price = 100.0;
        for _ in 0..1_000 {
            let next = walk.next_price(price);
            assert!(next > 0.0);
            assert!((next / price - 1.0).abs() <= 0.01 + 1e-12);
            price = next;
        }
    }

    #[test]
    fn zero_step_is_flat() {
        let mut walk = RandomWalk::seeded(0.0, 1);
        assert_eq!(walk.next_price(42.0), 42.0);
    }

    #[test]
    fn same_seed_same_path() {
        let mut a = RandomWalk::seeded(0.05, 99);
        let mut b = RandomWalk::seeded(0.05, 99);
        for _ in 0..10 {
            assert_eq!(a.next_price(10.0), b.next_price(10.0));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn feed_moves_mid_until_shutdown() {
        let contract = Contract {
            address: "kujira1fin".into(),
            base: Denom::new("uatom", "ATOM"),
            quote: Denom::new("uusk", "USK"),
            price_decimals: 2,
        };
        let exchange = Arc::new(PaperGateway::builder(contract).mid_price(100.0).build());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run(
            exchange.clone(),
            RandomWalk::seeded(0.01, 3),
            Duration::from_millis(10),
            rx,
        ));

        time::sleep(Duration::from_millis(55)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();
        assert_ne!(exchange.mid(), 100.0);
    }
}
