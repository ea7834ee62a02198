use serde::{Deserialize, Serialize};

/// A single observability data point emitted by the bus. Shape ported from
/// `jackbot-integration::metric::Metric` — name, tags to categorise it,
/// fields carrying the actual measurement(s).
#[derive(Debug, Clone, PartialOrd, PartialEq, Serialize)]
pub struct Metric {
    pub name: &'static str,
    pub time_ms: u64,
    pub tags: Vec<Tag>,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Serialize, Ord, PartialOrd, Eq, PartialEq)]
pub struct Tag {
    pub key: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialOrd, PartialEq, Serialize)]
pub struct Field {
    pub key: &'static str,
    pub value: Value,
}

#[derive(Debug, Clone, PartialOrd, PartialEq, Deserialize, Serialize)]
pub enum Value {
    Float(f64),
    Int(i64),
    UInt(u64),
    Bool(bool),
    String(String),
}

impl<S> From<(&'static str, S)> for Tag
where
    S: Into<String>,
{
    fn from((key, value): (&'static str, S)) -> Self {
        Self::new(key, value)
    }
}

impl Tag {
    pub fn new<S>(key: &'static str, value: S) -> Self
    where
        S: Into<String>,
    {
        Self { key, value: value.into() }
    }
}

impl<S> From<(&'static str, S)> for Field
where
    S: Into<Value>,
{
    fn from((key, value): (&'static str, S)) -> Self {
        Self::new(key, value)
    }
}

impl Field {
    pub fn new<S>(key: &'static str, value: S) -> Self
    where
        S: Into<Value>,
    {
        Self { key, value: value.into() }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl Metric {
    /// Emitted on every `subscribe`/`subscribe_blocking` call with the
    /// resulting subscriber count for that topic.
    pub fn subscriber_count(topic: &str, count: i64) -> Self {
        Self {
            name: "bus_subscriber_count",
            time_ms: now_ms(),
            tags: vec![Tag::new("topic", topic.to_string())],
            fields: vec![Field::new("count", count)],
        }
    }

    /// Emitted when a delivery exhausts its retry budget and is abandoned.
    pub fn retry_exhausted(topic: &str) -> Self {
        Self {
            name: "bus_retry_exhausted",
            time_ms: now_ms(),
            tags: vec![Tag::new("topic", topic.to_string())],
            fields: vec![Field::new("count", 1i64)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_count_metric_carries_topic_tag_and_count_field() {
        let metric = Metric::subscriber_count("order_created", 2);
        assert_eq!(metric.name, "bus_subscriber_count");
        assert_eq!(metric.tags[0].value, "order_created");
        assert!(matches!(metric.fields[0].value, Value::Int(2)));
    }
}
