use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("malformed {topic} payload: {source}")]
    MalformedPayload {
        topic: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
