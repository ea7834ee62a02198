use thiserror::Error;

/// Errors raised directly by [`crate::EventBus`] calls, as opposed to
/// errors a subscriber's own handler raises (see [`HandlerError`]).
#[derive(Debug, Error)]
pub enum BusError {
    #[error("topic must be a non-empty string")]
    EmptyTopic,

    #[error("event data must be a JSON object")]
    InvalidData,
}

/// Error returned by a subscriber handler. The bus treats any `Err` the
/// same way regardless of cause: retry up to the configured limit, then
/// log and move on (spec.md §7, `SubscriberFailure`).
#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
