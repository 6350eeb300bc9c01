//! Newline-delimited JSON record codec.
//!
//! One JSON object per record:
//!
//! ```json
//! {"topic": "users", "partition": 0, "timestamp": 1700000000000,
//!  "key":   {"schema": {"type": "int64"}, "payload": 42},
//!  "value": {"schema": {"type": "struct", "fields": [...]}, "payload": {...}}}
//! ```
//!
//! `partition`, `timestamp` and `key` are optional. An envelope whose
//! `schema` is null or missing is schemaless: its payload is converted by
//! shape, and JSON objects become maps with string keys.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};

use connect_api::record::Record;
use connect_api::schema::{Schema, SchemaBuilder, SchemaType};
use connect_api::value::{Struct, Value};

use crate::error::EngineError;

#[derive(Debug, Serialize, Deserialize)]
struct RecordLine {
    topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    partition: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<Envelope>,
    value: Envelope,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(default)]
    schema: Option<Json>,
    #[serde(default)]
    payload: Json,
}

fn codec_err(msg: impl Into<String>) -> EngineError {
    EngineError::Codec(msg.into())
}

/// Decode one record from a JSON line.
pub fn decode_record(line: &str) -> Result<Record, EngineError> {
    let parsed: RecordLine = serde_json::from_str(line)?;

    let (key_schema, key) = match &parsed.key {
        Some(envelope) => decode_envelope(envelope).map_err(|e| e.with_context("key"))?,
        None => (None, Value::Null),
    };
    let (value_schema, value) =
        decode_envelope(&parsed.value).map_err(|e| e.with_context("value"))?;

    Ok(Record {
        topic: parsed.topic,
        partition: parsed.partition,
        key_schema,
        key,
        value_schema,
        value,
        timestamp: parsed.timestamp,
    })
}

/// Encode one record as a single JSON line (no trailing newline).
pub fn encode_record(record: &Record) -> Result<String, EngineError> {
    let key = if record.key_schema.is_none() && record.key.is_null() {
        None
    } else {
        Some(encode_envelope(record.key_schema.as_deref(), &record.key)?)
    };
    let line = RecordLine {
        topic: record.topic.clone(),
        partition: record.partition,
        timestamp: record.timestamp,
        key,
        value: encode_envelope(record.value_schema.as_deref(), &record.value)?,
    };
    Ok(serde_json::to_string(&line)?)
}

fn decode_envelope(envelope: &Envelope) -> Result<(Option<Arc<Schema>>, Value), EngineError> {
    match &envelope.schema {
        Some(schema_json) => {
            let schema = schema_from_json(schema_json)?;
            let value = value_from_json(&schema, &envelope.payload)?;
            Ok((Some(schema), value))
        }
        None => Ok((None, infer_value(&envelope.payload)?)),
    }
}

fn encode_envelope(schema: Option<&Schema>, value: &Value) -> Result<Envelope, EngineError> {
    Ok(Envelope {
        schema: schema.map(schema_to_json),
        payload: value_to_json(value)?,
    })
}

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

pub fn schema_from_json(json: &Json) -> Result<Arc<Schema>, EngineError> {
    let obj = json
        .as_object()
        .ok_or_else(|| codec_err("schema must be an object"))?;
    let type_name = obj
        .get("type")
        .and_then(Json::as_str)
        .ok_or_else(|| codec_err("schema without \"type\""))?;
    let schema_type = SchemaType::from_name(type_name)
        .ok_or_else(|| codec_err(format!("unknown schema type '{type_name}'")))?;

    let child = |key: &str| -> Result<Arc<Schema>, EngineError> {
        let json = obj
            .get(key)
            .ok_or_else(|| codec_err(format!("{type_name} schema without \"{key}\"")))?;
        schema_from_json(json).map_err(|e| e.with_context(key))
    };

    let mut builder = match schema_type {
        SchemaType::Array => SchemaBuilder::array(child("items")?),
        SchemaType::Map => SchemaBuilder::map(child("keys")?, child("values")?),
        SchemaType::Struct => {
            let mut builder = SchemaBuilder::structure();
            let fields: &[Json] = match obj.get("fields") {
                Some(Json::Array(fields)) => fields.as_slice(),
                None => &[],
                Some(_) => return Err(codec_err("struct \"fields\" must be an array")),
            };
            for field in fields {
                let name = field
                    .get("field")
                    .and_then(Json::as_str)
                    .ok_or_else(|| codec_err("struct field without \"field\" name"))?;
                let field_schema =
                    schema_from_json(field).map_err(|e| e.with_context(format!("field '{name}'")))?;
                builder = builder.field(name, field_schema);
            }
            builder
        }
        other => SchemaBuilder::new(other),
    };

    if obj.get("optional").and_then(Json::as_bool).unwrap_or(false) {
        builder = builder.optional();
    }
    if let Some(name) = obj.get("name").and_then(Json::as_str) {
        builder = builder.name(name);
    }
    if let Some(version) = obj.get("version").and_then(Json::as_i64) {
        let version = i32::try_from(version)
            .map_err(|_| codec_err(format!("schema version {version} out of range")))?;
        builder = builder.version(version);
    }
    if let Some(doc) = obj.get("doc").and_then(Json::as_str) {
        builder = builder.doc(doc);
    }
    if let Some(params) = obj.get("parameters").and_then(Json::as_object) {
        for (k, v) in params {
            let v = v
                .as_str()
                .ok_or_else(|| codec_err(format!("schema parameter '{k}' must be a string")))?;
            builder = builder.parameter(k, v);
        }
    }

    Ok(builder.build()?)
}

fn schema_object(schema: &Schema) -> Map<String, Json> {
    let mut obj = Map::new();
    obj.insert("type".into(), Json::from(schema.schema_type().name()));
    match schema.schema_type() {
        SchemaType::Array => {
            if let Some(items) = schema.value_schema() {
                obj.insert("items".into(), schema_to_json(items));
            }
        }
        SchemaType::Map => {
            if let Some(keys) = schema.key_schema() {
                obj.insert("keys".into(), schema_to_json(keys));
            }
            if let Some(values) = schema.value_schema() {
                obj.insert("values".into(), schema_to_json(values));
            }
        }
        SchemaType::Struct => {
            let fields = schema
                .fields()
                .iter()
                .map(|field| {
                    let mut f = schema_object(field.schema());
                    f.insert("field".into(), Json::from(field.name()));
                    Json::Object(f)
                })
                .collect();
            obj.insert("fields".into(), Json::Array(fields));
        }
        _ => {}
    }
    obj.insert("optional".into(), Json::Bool(schema.is_optional()));
    if let Some(name) = schema.name() {
        obj.insert("name".into(), Json::from(name));
    }
    if let Some(version) = schema.version() {
        obj.insert("version".into(), Json::from(version));
    }
    if let Some(doc) = schema.doc() {
        obj.insert("doc".into(), Json::from(doc));
    }
    if !schema.parameters().is_empty() {
        let params = schema
            .parameters()
            .iter()
            .map(|(k, v)| (k.clone(), Json::from(v.as_str())))
            .collect();
        obj.insert("parameters".into(), Json::Object(params));
    }
    obj
}

pub fn schema_to_json(schema: &Schema) -> Json {
    Json::Object(schema_object(schema))
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Convert a payload according to its schema.
pub fn value_from_json(schema: &Arc<Schema>, json: &Json) -> Result<Value, EngineError> {
    let schema_type = schema.schema_type();
    if json.is_null() {
        return if schema.is_optional() {
            Ok(Value::Null)
        } else {
            Err(codec_err(format!("null payload for mandatory {schema_type} schema")))
        };
    }
    let mismatch = || codec_err(format!("expected {schema_type} payload, got {json}"));

    let value = match schema_type {
        SchemaType::Int8 => Value::Int8(
            json.as_i64()
                .and_then(|v| i8::try_from(v).ok())
                .ok_or_else(mismatch)?,
        ),
        SchemaType::Int16 => Value::Int16(
            json.as_i64()
                .and_then(|v| i16::try_from(v).ok())
                .ok_or_else(mismatch)?,
        ),
        SchemaType::Int32 => Value::Int32(
            json.as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(mismatch)?,
        ),
        SchemaType::Int64 => Value::Int64(json.as_i64().ok_or_else(mismatch)?),
        SchemaType::Float32 => {
            let narrowed = json.as_f64().ok_or_else(mismatch)? as f32;
            if !narrowed.is_finite() {
                return Err(mismatch());
            }
            Value::Float32(narrowed)
        }
        SchemaType::Float64 => Value::Float64(json.as_f64().ok_or_else(mismatch)?),
        SchemaType::Boolean => Value::Boolean(json.as_bool().ok_or_else(mismatch)?),
        SchemaType::String => Value::String(json.as_str().ok_or_else(mismatch)?.to_string()),
        SchemaType::Bytes => {
            let encoded = json.as_str().ok_or_else(mismatch)?;
            let bytes = STANDARD
                .decode(encoded)
                .map_err(|e| codec_err(format!("invalid base64 payload: {e}")))?;
            Value::Bytes(bytes)
        }
        SchemaType::Array => {
            let element = schema
                .value_schema()
                .ok_or_else(|| codec_err("array schema without element schema"))?;
            let items = json.as_array().ok_or_else(mismatch)?;
            let values = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    value_from_json(element, item)
                        .map_err(|e| e.with_context(format!("element {i}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Value::Array(values)
        }
        SchemaType::Map => {
            let (keys, values) = match (schema.key_schema(), schema.value_schema()) {
                (Some(k), Some(v)) => (k, v),
                _ => return Err(codec_err("map schema without key/value schemas")),
            };
            let mut entries = Vec::new();
            match json {
                // Object form: only for string keys.
                Json::Object(obj) if keys.schema_type() == SchemaType::String => {
                    for (k, v) in obj {
                        let v = value_from_json(values, v).map_err(|e| e.with_context(k))?;
                        entries.push((Value::String(k.clone()), v));
                    }
                }
                // Pair form: [[key, value], ...].
                Json::Array(pairs) => {
                    for pair in pairs {
                        let (k, v) = match pair.as_array().map(Vec::as_slice) {
                            Some([k, v]) => (k, v),
                            _ => return Err(codec_err("map entry must be a [key, value] pair")),
                        };
                        entries.push((value_from_json(keys, k)?, value_from_json(values, v)?));
                    }
                }
                _ => return Err(mismatch()),
            }
            Value::Map(entries)
        }
        SchemaType::Struct => {
            let obj = json.as_object().ok_or_else(mismatch)?;
            let mut value = Struct::new(schema.clone())?;
            for field in schema.fields() {
                let field_value = match obj.get(field.name()) {
                    Some(j) => value_from_json(field.schema(), j)
                        .map_err(|e| e.with_context(format!("field '{}'", field.name())))?,
                    None => Value::Null,
                };
                value = value.put(field.name(), field_value)?;
            }
            Value::Struct(value)
        }
    };
    Ok(value)
}

/// Convert a schemaless payload by shape.
///
/// Integers become `Int64`; integers above `i64::MAX` are rejected, since
/// no value type holds them exactly.
pub fn infer_value(json: &Json) -> Result<Value, EngineError> {
    let value = match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else if n.is_u64() {
                return Err(codec_err(format!("schemaless integer {n} exceeds int64 range")));
            } else {
                let f = n
                    .as_f64()
                    .ok_or_else(|| codec_err(format!("unrepresentable number {n}")))?;
                Value::Float64(f)
            }
        }
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => {
            Value::Array(items.iter().map(infer_value).collect::<Result<Vec<_>, _>>()?)
        }
        Json::Object(obj) => Value::Map(
            obj.iter()
                .map(|(k, v)| -> Result<(Value, Value), EngineError> {
                    Ok((Value::String(k.clone()), infer_value(v)?))
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };
    Ok(value)
}

fn float_json(v: f64) -> Result<Json, EngineError> {
    Number::from_f64(v)
        .map(Json::Number)
        .ok_or_else(|| codec_err(format!("cannot encode non-finite float {v}")))
}

/// Convert a value to its JSON payload. Maps whose keys are all strings
/// become objects, other maps become `[key, value]` pair arrays.
pub fn value_to_json(value: &Value) -> Result<Json, EngineError> {
    let json = match value {
        Value::Null => Json::Null,
        Value::Int8(v) => Json::from(*v),
        Value::Int16(v) => Json::from(*v),
        Value::Int32(v) => Json::from(*v),
        Value::Int64(v) => Json::from(*v),
        Value::Float32(v) => float_json(f64::from(*v))?,
        Value::Float64(v) => float_json(*v)?,
        Value::Boolean(v) => Json::Bool(*v),
        Value::String(v) => Json::String(v.clone()),
        Value::Bytes(v) => Json::String(STANDARD.encode(v)),
        Value::Array(items) => {
            Json::Array(items.iter().map(value_to_json).collect::<Result<_, _>>()?)
        }
        Value::Map(entries) => {
            if entries.iter().all(|(k, _)| matches!(k, Value::String(_))) {
                let mut obj = Map::new();
                for (k, v) in entries {
                    if let Value::String(k) = k {
                        obj.insert(k.clone(), value_to_json(v)?);
                    }
                }
                Json::Object(obj)
            } else {
                let pairs = entries
                    .iter()
                    .map(|(k, v)| -> Result<Json, EngineError> {
                        Ok(Json::Array(vec![value_to_json(k)?, value_to_json(v)?]))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Json::Array(pairs)
            }
        }
        Value::Struct(s) => {
            let mut obj = Map::new();
            for (field, v) in s.iter() {
                obj.insert(field.name().to_string(), value_to_json(v)?);
            }
            Json::Object(obj)
        }
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const PERSON_LINE: &str = r#"{
        "topic": "people",
        "partition": 2,
        "timestamp": 1700000000000,
        "key": {"schema": {"type": "int64", "optional": false}, "payload": 42},
        "value": {
            "schema": {
                "type": "struct",
                "name": "com.example.Person",
                "optional": false,
                "fields": [
                    {"field": "first_name", "type": "string", "optional": true},
                    {"field": "last_name", "type": "string", "optional": true},
                    {"field": "age", "type": "int32", "optional": true}
                ]
            },
            "payload": {"first_name": "Alice", "last_name": null}
        }
    }"#;

    #[test]
    fn decodes_schema_envelope() {
        let record = decode_record(PERSON_LINE).unwrap();
        assert_eq!(record.topic, "people");
        assert_eq!(record.partition, Some(2));
        assert_eq!(record.timestamp, Some(1_700_000_000_000));
        assert_eq!(record.key, Value::Int64(42));

        let schema = record.value_schema.as_ref().unwrap();
        assert_eq!(schema.name(), Some("com.example.Person"));
        assert_eq!(schema.fields().len(), 3);

        let value = record.value.as_struct().unwrap();
        assert_eq!(value.get_string("first_name").unwrap(), Some("Alice"));
        assert_eq!(value.get_string("last_name").unwrap(), None);
        // Missing optional field decodes as null.
        assert_eq!(value.get("age").unwrap(), &Value::Null);
    }

    #[test]
    fn round_trips_nested_values() {
        let tags = SchemaBuilder::array(Schema::string()).build().unwrap();
        let scores = SchemaBuilder::map(Schema::int32(), Schema::float64()).build().unwrap();
        let schema = SchemaBuilder::structure()
            .name("doc")
            .version(1)
            .parameter("source", "test")
            .field("tags", tags)
            .field("scores", scores)
            .field("blob", Schema::bytes())
            .field("ok", Schema::boolean())
            .build()
            .unwrap();
        let value = Struct::new(schema.clone())
            .unwrap()
            .put("tags", Value::Array(vec!["a".into(), "b".into()]))
            .unwrap()
            .put("scores", Value::Map(vec![(Value::Int32(1), Value::Float64(0.5))]))
            .unwrap()
            .put("blob", vec![0u8, 159, 255])
            .unwrap()
            .put("ok", true)
            .unwrap();
        let record = Record::new("docs", Some(schema), value)
            .with_key(None, "k")
            .with_timestamp(5);

        let line = encode_record(&record).unwrap();
        let decoded = decode_record(&line).unwrap();
        assert_eq!(decoded, record);

        let raw: Json = serde_json::from_str(&line).unwrap();
        assert_eq!(raw["value"]["payload"]["blob"], "AJ//");
        assert_eq!(raw["value"]["payload"]["scores"], json!([[1, 0.5]]));
        assert_eq!(raw["key"]["schema"], Json::Null);
        assert!(raw.get("partition").is_none());
    }

    #[test]
    fn schemaless_objects_become_maps() {
        let record = decode_record(
            r#"{"topic": "t", "value": {"payload": {"first_name": "Alice", "n": 1, "x": 1.5}}}"#,
        )
        .unwrap();
        assert!(record.value_schema.is_none());
        assert_eq!(
            record.value,
            Value::Map(vec![
                ("first_name".into(), "Alice".into()),
                ("n".into(), Value::Int64(1)),
                ("x".into(), Value::Float64(1.5)),
            ])
        );
        assert!(record.key.is_null());
    }

    #[test]
    fn schemaless_numbers_keep_their_exact_value() {
        let line = r#"{"topic":"t","value":{"payload":{"id":9223372036854775807,"x":0.25}}}"#;
        let record = decode_record(line).unwrap();
        let out: Json = serde_json::from_str(&encode_record(&record).unwrap()).unwrap();
        assert_eq!(out["value"]["payload"], json!({"id": i64::MAX, "x": 0.25}));

        let err = decode_record(
            r#"{"topic": "t", "value": {"payload": {"id": 18446744073709551615}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeds int64 range"), "{err}");
    }

    #[test]
    fn mandatory_field_missing_from_payload_fails() {
        let err = decode_record(
            r#"{"topic": "t", "value": {
                "schema": {"type": "struct", "fields": [{"field": "id", "type": "int64"}]},
                "payload": {}
            }}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Plugin(_)), "{err}");
    }

    #[test]
    fn rejects_bad_payloads() {
        let bad_type = decode_record(
            r#"{"topic": "t", "value": {"schema": {"type": "varchar"}, "payload": "x"}}"#,
        )
        .unwrap_err();
        assert!(bad_type.to_string().contains("unknown schema type 'varchar'"));

        let bad_base64 = decode_record(
            r#"{"topic": "t", "value": {"schema": {"type": "bytes"}, "payload": "***"}}"#,
        )
        .unwrap_err();
        assert!(bad_base64.to_string().contains("invalid base64"));

        let overflow = decode_record(
            r#"{"topic": "t", "value": {"schema": {"type": "int8"}, "payload": 300}}"#,
        )
        .unwrap_err();
        assert!(overflow.to_string().contains("expected int8 payload"));

        let float_overflow = decode_record(
            r#"{"topic": "t", "value": {"schema": {"type": "float32"}, "payload": 1e300}}"#,
        )
        .unwrap_err();
        assert!(
            float_overflow.to_string().contains("expected float32 payload"),
            "{float_overflow}"
        );

        assert!(decode_record("not json").is_err());
    }

    #[test]
    fn non_finite_floats_cannot_be_encoded() {
        let record = Record::new("t", None, Value::Float64(f64::NAN));
        assert!(encode_record(&record).is_err());
    }
}
