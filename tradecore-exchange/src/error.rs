use thiserror::Error;

/// Failure surfaced by an [`crate::ExchangeAdapter`]. The OrderManager (Live
/// variant) escalates these to `order_rejected` and `risk_alert` events as
/// appropriate (spec.md §7, `ExchangeError`).
#[derive(Debug, Error, Clone)]
pub enum ExchangeError {
    #[error("not connected to exchange")]
    NotConnected,

    #[error("symbol {0} is not subscribed")]
    NotSubscribed(String),

    #[error("order rejected by exchange: {0}")]
    OrderRejected(String),

    #[error("exchange transport error: {0}")]
    Transport(String),
}
