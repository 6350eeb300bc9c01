use std::sync::Arc;

use connect_api::config::{ConfigDef, ConfigValues};
use connect_api::error::PluginError;
use connect_api::record::Record;
use connect_api::schema::{Schema, SchemaBuilder};
use connect_api::transform::Transformation;
use connect_api::value::{Struct, Value};

pub const FIRST_NAME_FIELD: &str = "first_name";
pub const LAST_NAME_FIELD: &str = "last_name";
pub const FULL_NAME_FIELD: &str = "full_name";

/// Derives `full_name` from the optional `first_name` and `last_name`
/// fields of a struct value.
///
/// Records whose value is not a struct, that carry no value schema, or whose
/// schema declares neither name field pass through as the same `Arc`.
/// Otherwise the record is rebuilt with a schema that has a trailing
/// mandatory `full_name` string field. A schema that already declares
/// `full_name` keeps it in place, retyped, and the value is overwritten.
///
/// The rebuilt schema keeps the name, version, doc, parameters and
/// optionality of the input schema. An optional input struct schema stays
/// optional rather than becoming a mandatory struct.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullNameTransform;

impl FullNameTransform {
    pub fn new() -> Self {
        Self
    }
}

/// `first + " " + last`. Missing parts become empty strings; the separator
/// is always present.
pub fn full_name(first: Option<&str>, last: Option<&str>) -> String {
    format!("{} {}", first.unwrap_or(""), last.unwrap_or(""))
}

/// Read a name field: `None` when the schema does not declare it or when
/// the value holds null.
fn read_name<'a>(
    schema: &Schema,
    value: &'a Struct,
    field: &str,
) -> Result<Option<&'a str>, PluginError> {
    if schema.field(field).is_none() {
        return Ok(None);
    }
    value.get_string(field)
}

fn augmented_schema(schema: &Schema) -> Result<Arc<Schema>, PluginError> {
    let mut builder = SchemaBuilder::structure().copy_basics(schema);
    for field in schema.fields() {
        if field.name() == FULL_NAME_FIELD {
            builder = builder.field(FULL_NAME_FIELD, Schema::string());
        } else {
            builder = builder.field(field.name(), field.schema().clone());
        }
    }
    if schema.field(FULL_NAME_FIELD).is_none() {
        builder = builder.field(FULL_NAME_FIELD, Schema::string());
    }
    builder.build()
}

impl Transformation for FullNameTransform {
    fn configure(&mut self, config: &ConfigValues) -> Result<(), PluginError> {
        if !config.is_empty() {
            tracing::debug!(ignored = config.len(), "full-name transform takes no options");
        }
        Ok(())
    }

    fn apply(&self, record: Arc<Record>) -> Result<Arc<Record>, PluginError> {
        let Value::Struct(value) = &record.value else {
            return Ok(record);
        };
        let Some(schema) = record.value_schema.as_ref() else {
            return Ok(record);
        };
        if schema.field(FIRST_NAME_FIELD).is_none() && schema.field(LAST_NAME_FIELD).is_none() {
            return Ok(record);
        }

        let first = read_name(schema, value, FIRST_NAME_FIELD)?;
        let last = read_name(schema, value, LAST_NAME_FIELD)?;
        let derived = full_name(first, last);

        let new_schema = augmented_schema(schema)?;
        let mut new_value = Struct::new(new_schema.clone())?;
        for field in schema.fields() {
            if field.name() == FULL_NAME_FIELD {
                continue;
            }
            new_value = new_value.put(field.name(), value.get(field.name())?.clone())?;
        }
        new_value = new_value.put(FULL_NAME_FIELD, derived)?;

        Ok(Arc::new(
            record.with_value(Some(new_schema), Value::Struct(new_value)),
        ))
    }

    fn config(&self) -> ConfigDef {
        ConfigDef::new()
    }

    fn close(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "full-name"
    }
}
