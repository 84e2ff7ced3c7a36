//! Reconciliation states.

use std::fmt;

/// Where a trading instance is in its order cycle.
///
/// `Initialize` is only ever the starting state; after it the machine
/// cycles through the others for as long as it is ticked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientState {
    Initialize,
    Order,
    OrderCheck,
    FulfilledOrders,
    CancelAllOrders,
    /// Reserved for immediately executable orders; ticks here do nothing.
    MarketOrderCheck,
    WaitingAllOrderComplete,
}

impl ClientState {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientState::Initialize => "INITIALIZE",
            ClientState::Order => "ORDER",
            ClientState::OrderCheck => "ORDER_CHECK",
            ClientState::FulfilledOrders => "FULFILLED_ORDERS",
            ClientState::CancelAllOrders => "CANCEL_ALL_ORDERS",
            ClientState::MarketOrderCheck => "MARKET_ORDER_CHECK",
            ClientState::WaitingAllOrderComplete => "WAITING_ALL_ORDER_COMPLETE",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(ClientState::Initialize.to_string(), "INITIALIZE");
        assert_eq!(ClientState::OrderCheck.to_string(), "ORDER_CHECK");
        assert_eq!(
            ClientState::WaitingAllOrderComplete.to_string(),
            "WAITING_ALL_ORDER_COMPLETE"
        );
    }
}
