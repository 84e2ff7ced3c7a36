//! Core types: Denom, Contract, Wallet, Balance, BookQuotes, Order, OrderRequest

use std::fmt;

use uuid::Uuid;

use crate::side::Side;

/// An exchange denomination plus the symbol shown to humans.
///
/// In `Denom::new("ibc/27394FB0...", "ATOM")` the id is what the exchange
/// reports in balances, the symbol is what goes into log lines and messages.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Denom {
    pub id: String,
    pub symbol: String,
}

impl Denom {
    pub fn new(id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// Static configuration of one base/quote market.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contract {
    pub address: String,
    pub base: Denom,
    pub quote: Denom,
    /// Decimal places used when a price is rendered for humans.
    pub price_decimals: u32,
}

impl Contract {
    /// Render a price rounded to the contract's precision.
    ///
    /// Display only: order requests keep the unrounded value.
    pub fn format_price(&self, price: f64) -> String {
        format!("{:.*}", self.price_decimals as usize, price)
    }
}

/// Exchange account session handle.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Wallet {
    pub address: String,
    /// Incremented each time the session is re-established.
    pub session: u64,
}

impl Wallet {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            session: 0,
        }
    }
}

/// One balance entry as reported by the exchange.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Balance {
    pub denom: String,
    pub amount: f64,
}

/// One level of the book.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BookQuote {
    pub quote_price: f64,
    pub total_offer_amount: f64,
}

/// Best levels of the book, keyed by the denom being offered.
///
/// `base` holds offers of the base asset (asks), `quote` offers of the
/// quote asset (bids).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BookQuotes {
    pub base: Vec<BookQuote>,
    pub quote: Vec<BookQuote>,
}

/// Lifecycle state of a live order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderState {
    Open,
    PartiallyFilled,
    Closed,
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderState::Open => write!(f, "Open"),
            OrderState::PartiallyFilled => write!(f, "PartiallyFilled"),
            OrderState::Closed => write!(f, "Closed"),
        }
    }
}

/// An order as the exchange reports it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Order {
    pub idx: String,
    pub side: Side,
    pub price: f64,
    /// Offered amount: base units for sells, quote units for buys.
    pub amount: f64,
    pub state: OrderState,
}

impl Order {
    /// Fully filled and waiting to be withdrawn.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state == OrderState::Closed
    }
}

/// A limit order to be placed on the exchange.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderRequest {
    pub uuid: Uuid,
    pub contract: Contract,
    pub side: Side,
    pub price: f64,
    /// Base units for sells, quote units for buys.
    pub amount: f64,
}

impl OrderRequest {
    /// Denom the `amount` is expressed in.
    pub fn amount_denom(&self) -> &Denom {
        match self.side {
            Side::Sell => &self.contract.base,
            Side::Buy => &self.contract.quote,
        }
    }
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.4} {} at {} {}",
            self.side,
            self.amount,
            self.amount_denom(),
            self.contract.format_price(self.price),
            self.contract.quote,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> Contract {
        Contract {
            address: "kujira1fin".into(),
            base: Denom::new("uatom", "ATOM"),
            quote: Denom::new("uusk", "USK"),
            price_decimals: 3,
        }
    }

    #[test]
    fn format_price_rounds_for_display() {
        assert_eq!(contract().format_price(10.12345), "10.123");
        assert_eq!(contract().format_price(10.0), "10.000");
    }

    #[test]
    fn request_display_uses_side_denom() {
        let sell = OrderRequest {
            uuid: Uuid::nil(),
            contract: contract(),
            side: Side::Sell,
            price: 110.0,
            amount: 0.227272,
        };
        assert_eq!(sell.to_string(), "SELL 0.2273 ATOM at 110.000 USK");

        let buy = OrderRequest {
            side: Side::Buy,
            price: 90.0,
            amount: 25.0,
            ..sell
        };
        assert_eq!(buy.to_string(), "BUY 25.0000 USK at 90.000 USK");
    }

    #[test]
    fn closed_orders() {
        let mut order = Order {
            idx: "7".into(),
            side: Side::Buy,
            price: 1.0,
            amount: 1.0,
            state: OrderState::PartiallyFilled,
        };
        assert!(!order.is_closed());
        order.state = OrderState::Closed;
        assert!(order.is_closed());
    }

    #[test]
    fn fresh_wallet_session() {
        let wallet = Wallet::new("kujira1abc");
        assert_eq!(wallet.session, 0);
        assert_eq!(wallet.address, "kujira1abc");
    }
}
