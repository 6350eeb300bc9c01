use std::sync::Arc;

use crate::error::PluginError;
use crate::schema::{Field, Schema, SchemaType};

/// Canonical value representation for keys and values of a [`Record`].
///
/// Variants mirror [`SchemaType`]; `Null` is only valid where the schema is
/// optional.
///
/// [`Record`]: crate::record::Record
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Boolean(bool),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    /// Entries in insertion order.
    Map(Vec<(Value, Value)>),
    Struct(Struct),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Short type label for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
        }
    }

    /// Check that this value conforms to `schema`: matching type, null only
    /// when optional, and recursively for array elements, map entries and
    /// nested structs (whose schema must equal `schema`).
    pub fn validate(&self, schema: &Schema) -> Result<(), PluginError> {
        let expected = schema.schema_type();
        match (self, expected) {
            (Value::Null, _) => {
                if schema.is_optional() {
                    Ok(())
                } else {
                    Err(PluginError::data(format!(
                        "null value for mandatory {expected} schema"
                    )))
                }
            }
            (Value::Int8(_), SchemaType::Int8)
            | (Value::Int16(_), SchemaType::Int16)
            | (Value::Int32(_), SchemaType::Int32)
            | (Value::Int64(_), SchemaType::Int64)
            | (Value::Float32(_), SchemaType::Float32)
            | (Value::Float64(_), SchemaType::Float64)
            | (Value::Boolean(_), SchemaType::Boolean)
            | (Value::String(_), SchemaType::String)
            | (Value::Bytes(_), SchemaType::Bytes) => Ok(()),
            (Value::Array(items), SchemaType::Array) => {
                let element = schema
                    .value_schema()
                    .ok_or_else(|| PluginError::schema("array schema without element schema"))?;
                for (i, item) in items.iter().enumerate() {
                    item.validate(element)
                        .map_err(|e| e.with_context(format!("element {i}")))?;
                }
                Ok(())
            }
            (Value::Map(entries), SchemaType::Map) => {
                let (keys, values) = match (schema.key_schema(), schema.value_schema()) {
                    (Some(k), Some(v)) => (k, v),
                    _ => return Err(PluginError::schema("map schema without key/value schemas")),
                };
                for (k, v) in entries {
                    k.validate(keys).map_err(|e| e.with_context("map key"))?;
                    v.validate(values).map_err(|e| e.with_context("map value"))?;
                }
                Ok(())
            }
            (Value::Struct(s), SchemaType::Struct) => {
                if s.schema().as_ref() == schema {
                    Ok(())
                } else {
                    Err(PluginError::data("struct schema does not match the expected schema"))
                }
            }
            (other, _) => Err(PluginError::data(format!(
                "expected {expected}, got {}",
                other.kind()
            ))),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Struct> for Value {
    fn from(v: Struct) -> Self {
        Value::Struct(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Structured value conforming to exactly one struct schema.
///
/// Values are stored positionally; order matches `Schema::fields()`.
/// Every field starts as `Null` until set with [`Struct::put`].
#[derive(Debug, Clone, PartialEq)]
pub struct Struct {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Struct {
    pub fn new(schema: Arc<Schema>) -> Result<Self, PluginError> {
        if schema.schema_type() != SchemaType::Struct {
            return Err(PluginError::schema(format!(
                "struct value requires a struct schema, got {}",
                schema.schema_type()
            )));
        }
        let values = vec![Value::Null; schema.fields().len()];
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn lookup(&self, name: &str) -> Result<&Field, PluginError> {
        self.schema
            .field(name)
            .ok_or_else(|| PluginError::schema(format!("'{name}' is not a valid field name")))
    }

    /// Set a field after validating the value against the field schema.
    pub fn put(mut self, name: &str, value: impl Into<Value>) -> Result<Self, PluginError> {
        let value = value.into();
        let index = {
            let field = self.lookup(name)?;
            value
                .validate(field.schema())
                .map_err(|e| e.with_context(format!("field '{name}'")))?;
            field.index()
        };
        self.values[index] = value;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Result<&Value, PluginError> {
        let field = self.lookup(name)?;
        Ok(&self.values[field.index()])
    }

    /// Read a string field. `Ok(None)` means the field holds null.
    ///
    /// A declared field holding anything other than a string or null is a
    /// data error.
    pub fn get_string(&self, name: &str) -> Result<Option<&str>, PluginError> {
        match self.get(name)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(PluginError::data(format!(
                "field '{name}' holds {}, not a string",
                other.kind()
            ))),
        }
    }

    /// Fields paired with their current values, in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&Field, &Value)> {
        self.schema.fields().iter().zip(self.values.iter())
    }

    /// Check every field, including that no mandatory field is still null.
    pub fn validate(&self) -> Result<(), PluginError> {
        for (field, value) in self.iter() {
            value
                .validate(field.schema())
                .map_err(|e| e.with_context(format!("field '{}'", field.name())))?;
        }
        Ok(())
    }
}
