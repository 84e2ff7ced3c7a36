//! Planned rungs to exchange order requests.
//!
//! Rungs on one side are bucketed: each order only carries the quantity
//! beyond what the closer rungs already cover, so the whole side adds up to
//! the outermost rung's delta.

use uuid::Uuid;

use crate::planner::Rung;
use crate::side::Side;
use crate::types::{Contract, OrderRequest};

/// Incremental base quantity for each rung, in input order.
pub fn bucketed_quantities(rungs: &[Rung]) -> Vec<f64> {
    let mut running = 0.0;
    rungs
        .iter()
        .map(|rung| {
            let qty = rung.delta_qty.abs() - running;
            running += qty;
            qty
        })
        .collect()
}

/// Build order requests for one side of the ladder (or a single correction).
///
/// Sell amounts are in base units, buy amounts in quote units.
pub fn to_order_requests(contract: &Contract, rungs: &[Rung]) -> Vec<OrderRequest> {
    rungs
        .iter()
        .zip(bucketed_quantities(rungs))
        .map(|(rung, qty)| {
            let side = rung.side();
            let amount = match side {
                Side::Sell => qty.abs(),
                Side::Buy => (qty * rung.price).abs(),
            };
            OrderRequest {
                uuid: Uuid::new_v4(),
                contract: contract.clone(),
                side,
                price: rung.price,
                amount,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{OffsetLadder, Plan, plan};
    use crate::snapshot::BalanceSnapshot;
    use crate::types::Denom;

    fn contract() -> Contract {
        Contract {
            address: "kujira1fin".into(),
            base: Denom::new("uatom", "ATOM"),
            quote: Denom::new("uusk", "USK"),
            price_decimals: 2,
        }
    }

    fn ladder_for(offsets: Vec<f64>) -> (Vec<Rung>, Vec<Rung>) {
        let balances = BalanceSnapshot::new(5.0, 500.0, 100.0);
        let ladder = OffsetLadder::new(offsets).unwrap();
        match plan(&balances, 100.0, 0.5, &ladder) {
            Plan::Ladder { sells, buys } => (sells, buys),
            Plan::Correction(_) => panic!("expected a full ladder"),
        }
    }

    #[test]
    fn empty_input() {
        assert!(to_order_requests(&contract(), &[]).is_empty());
        assert!(bucketed_quantities(&[]).is_empty());
    }

    #[test]
    fn single_rung_sides_and_units() {
        let (sells, buys) = ladder_for(vec![0.1]);

        let sell = &to_order_requests(&contract(), &sells)[0];
        assert_eq!(sell.side, Side::Sell);
        assert!((sell.amount - 0.2273).abs() < 1e-3);
        assert_eq!(sell.price, sells[0].price);

        let buy = &to_order_requests(&contract(), &buys)[0];
        assert_eq!(buy.side, Side::Buy);
        assert!((buy.amount - 25.0).abs() < 1e-3);
    }

    #[test]
    fn buckets_are_incremental() {
        let (sells, _) = ladder_for(vec![0.01, 0.02, 0.03]);
        let qtys = bucketed_quantities(&sells);

        assert!((qtys[0] - sells[0].delta_qty.abs()).abs() < 1e-12);
        assert!((qtys[1] - (sells[1].delta_qty.abs() - sells[0].delta_qty.abs())).abs() < 1e-12);

        let total: f64 = qtys.iter().sum();
        assert!((total - sells[2].delta_qty.abs()).abs() < 1e-9);
    }

    #[test]
    fn requests_get_unique_ids() {
        let (sells, _) = ladder_for(vec![0.01, 0.02]);
        let requests = to_order_requests(&contract(), &sells);
        assert_ne!(requests[0].uuid, requests[1].uuid);
    }

    #[test]
    fn price_is_not_rounded() {
        let (sells, _) = ladder_for(vec![0.01234]);
        let request = &to_order_requests(&contract(), &sells)[0];
        assert_eq!(request.price, sells[0].price);
        assert!((request.price - 101.234).abs() < 1e-9);
        assert_eq!(contract().format_price(request.price), "101.23");
    }
}
