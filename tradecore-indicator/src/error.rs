use thiserror::Error;

/// Failure surfaced by the variant registry and calculation dispatch
/// (spec.md §4.2 "Failure modes").
#[derive(Debug, Error, Clone)]
pub enum IndicatorError {
    #[error("unknown indicator base type: {0}")]
    UnknownIndicator(String),

    #[error("invalid parameter for {base_type}: {reason}")]
    InvalidParameter { base_type: String, reason: String },

    #[error("unknown variant id: {0}")]
    UnknownVariant(String),
}
