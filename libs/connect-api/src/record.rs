use std::sync::Arc;

use crate::schema::Schema;
use crate::value::Value;

/// Universal data record flowing through a pipeline.
///
/// Transforms receive records as `Arc<Record>` and never mutate them: a
/// transform either hands the same `Arc` back or builds a new record with
/// [`Record::with_value`]. `Arc::ptr_eq` therefore tells whether a record
/// was changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub topic: String,
    pub partition: Option<i32>,
    pub key_schema: Option<Arc<Schema>>,
    /// `Value::Null` when the record has no key.
    pub key: Value,
    pub value_schema: Option<Arc<Schema>>,
    pub value: Value,
    /// Milliseconds since the Unix epoch.
    pub timestamp: Option<i64>,
}

impl Record {
    pub fn new(
        topic: impl Into<String>,
        value_schema: Option<Arc<Schema>>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition: None,
            key_schema: None,
            key: Value::Null,
            value_schema,
            value: value.into(),
            timestamp: None,
        }
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_key(mut self, key_schema: Option<Arc<Schema>>, key: impl Into<Value>) -> Self {
        self.key_schema = key_schema;
        self.key = key.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Build a new record carrying `value_schema`/`value`, copying topic,
    /// partition, key schema, key and timestamp from `self`.
    pub fn with_value(&self, value_schema: Option<Arc<Schema>>, value: Value) -> Self {
        Self {
            topic: self.topic.clone(),
            partition: self.partition,
            key_schema: self.key_schema.clone(),
            key: self.key.clone(),
            value_schema,
            value,
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_value_copies_everything_else() {
        let original = Record::new("users", Some(Schema::string()), "raw")
            .with_partition(3)
            .with_key(Some(Schema::int64()), 99i64)
            .with_timestamp(1_700_000_000_000);

        let replaced = original.with_value(Some(Schema::int32()), Value::Int32(1));

        assert_eq!(replaced.topic, "users");
        assert_eq!(replaced.partition, Some(3));
        assert_eq!(replaced.key_schema, original.key_schema);
        assert_eq!(replaced.key, Value::Int64(99));
        assert_eq!(replaced.timestamp, Some(1_700_000_000_000));
        assert_eq!(replaced.value, Value::Int32(1));
        // Original untouched.
        assert_eq!(original.value, Value::String("raw".into()));
    }

    #[test]
    fn defaults_are_empty() {
        let record = Record::new("t", None, Value::Null);
        assert_eq!(record.partition, None);
        assert_eq!(record.key, Value::Null);
        assert!(record.key_schema.is_none());
        assert_eq!(record.timestamp, None);
    }
}
