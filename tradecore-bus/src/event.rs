use crate::topic::Topic;
use chrono::{DateTime, Utc};

/// An envelope delivered to subscribers: the topic it was published on, the
/// JSON-object payload, and the time it entered the bus.
#[derive(Debug, Clone)]
pub struct Event {
    pub topic: Topic,
    pub data: serde_json::Value,
    pub published_at: DateTime<Utc>,
}

impl Event {
    pub fn new(topic: Topic, data: serde_json::Value) -> Self {
        Self {
            topic,
            data,
            published_at: Utc::now(),
        }
    }
}
