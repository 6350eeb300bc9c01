use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::PluginError;

/// Logical type of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Boolean,
    String,
    Bytes,
    Array,
    Map,
    Struct,
}

impl SchemaType {
    /// Wire name, as used by the JSON envelope (`"int32"`, `"struct"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            SchemaType::Int8 => "int8",
            SchemaType::Int16 => "int16",
            SchemaType::Int32 => "int32",
            SchemaType::Int64 => "int64",
            SchemaType::Float32 => "float32",
            SchemaType::Float64 => "float64",
            SchemaType::Boolean => "boolean",
            SchemaType::String => "string",
            SchemaType::Bytes => "bytes",
            SchemaType::Array => "array",
            SchemaType::Map => "map",
            SchemaType::Struct => "struct",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name {
            "int8" => SchemaType::Int8,
            "int16" => SchemaType::Int16,
            "int32" => SchemaType::Int32,
            "int64" => SchemaType::Int64,
            "float32" => SchemaType::Float32,
            "float64" => SchemaType::Float64,
            "boolean" => SchemaType::Boolean,
            "string" => SchemaType::String,
            "bytes" => SchemaType::Bytes,
            "array" => SchemaType::Array,
            "map" => SchemaType::Map,
            "struct" => SchemaType::Struct,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_primitive(self) -> bool {
        !matches!(self, SchemaType::Array | SchemaType::Map | SchemaType::Struct)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single named field of a struct schema.
///
/// `index` is the field's position in `Schema::fields()` and in the
/// positional storage of a `Struct`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    index: usize,
    schema: Arc<Schema>,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

/// Immutable, self-describing type of a key or value.
///
/// Struct schemas carry an ordered field list. Array schemas carry their
/// element schema in `value_schema`; map schemas carry both `key_schema`
/// and `value_schema`. Built with [`SchemaBuilder`] and shared as `Arc<Schema>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    schema_type: SchemaType,
    optional: bool,
    name: Option<String>,
    version: Option<i32>,
    doc: Option<String>,
    parameters: BTreeMap<String, String>,
    fields: Vec<Field>,
    key_schema: Option<Arc<Schema>>,
    value_schema: Option<Arc<Schema>>,
}

impl Schema {
    fn bare(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            optional: false,
            name: None,
            version: None,
            doc: None,
            parameters: BTreeMap::new(),
            fields: Vec::new(),
            key_schema: None,
            value_schema: None,
        }
    }

    fn primitive(schema_type: SchemaType, optional: bool) -> Arc<Self> {
        let mut schema = Self::bare(schema_type);
        schema.optional = optional;
        Arc::new(schema)
    }

    /// Mandatory string.
    pub fn string() -> Arc<Self> {
        Self::primitive(SchemaType::String, false)
    }

    /// Nullable string.
    pub fn optional_string() -> Arc<Self> {
        Self::primitive(SchemaType::String, true)
    }

    pub fn int32() -> Arc<Self> {
        Self::primitive(SchemaType::Int32, false)
    }

    pub fn optional_int32() -> Arc<Self> {
        Self::primitive(SchemaType::Int32, true)
    }

    pub fn int64() -> Arc<Self> {
        Self::primitive(SchemaType::Int64, false)
    }

    pub fn float64() -> Arc<Self> {
        Self::primitive(SchemaType::Float64, false)
    }

    pub fn boolean() -> Arc<Self> {
        Self::primitive(SchemaType::Boolean, false)
    }

    pub fn bytes() -> Arc<Self> {
        Self::primitive(SchemaType::Bytes, false)
    }

    pub fn schema_type(&self) -> SchemaType {
        self.schema_type
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn version(&self) -> Option<i32> {
        self.version
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// Struct fields in declaration order. Empty for non-struct schemas.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a struct field by name. `None` means the schema does not
    /// declare it, which is a normal outcome.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn key_schema(&self) -> Option<&Arc<Schema>> {
        self.key_schema.as_ref()
    }

    pub fn value_schema(&self) -> Option<&Arc<Schema>> {
        self.value_schema.as_ref()
    }
}

/// Builder for [`Schema`].
///
/// Field errors (duplicate names, fields on a non-struct) are remembered and
/// reported by [`SchemaBuilder::build`], so calls can be chained.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    schema: Schema,
    error: Option<PluginError>,
}

impl SchemaBuilder {
    pub fn new(schema_type: SchemaType) -> Self {
        Self {
            schema: Schema::bare(schema_type),
            error: None,
        }
    }

    pub fn structure() -> Self {
        Self::new(SchemaType::Struct)
    }

    pub fn array(items: Arc<Schema>) -> Self {
        let mut builder = Self::new(SchemaType::Array);
        builder.schema.value_schema = Some(items);
        builder
    }

    pub fn map(keys: Arc<Schema>, values: Arc<Schema>) -> Self {
        let mut builder = Self::new(SchemaType::Map);
        builder.schema.key_schema = Some(keys);
        builder.schema.value_schema = Some(values);
        builder
    }

    pub fn optional(mut self) -> Self {
        self.schema.optional = true;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.schema.name = Some(name.into());
        self
    }

    pub fn version(mut self, version: i32) -> Self {
        self.schema.version = Some(version);
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.schema.doc = Some(doc.into());
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.schema.parameters.insert(key.into(), value.into());
        self
    }

    /// Copy name, version, doc, parameters and optionality from `source`.
    /// Fields and child schemas are not copied.
    pub fn copy_basics(mut self, source: &Schema) -> Self {
        self.schema.optional = source.optional;
        self.schema.name = source.name.clone();
        self.schema.version = source.version;
        self.schema.doc = source.doc.clone();
        self.schema.parameters = source.parameters.clone();
        self
    }

    /// Append a field. Only valid on struct builders; names must be unique.
    pub fn field(mut self, name: impl Into<String>, schema: Arc<Schema>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let name = name.into();
        if self.schema.schema_type != SchemaType::Struct {
            self.error = Some(PluginError::schema(format!(
                "cannot add field '{name}' to a {} schema",
                self.schema.schema_type
            )));
        } else if self.schema.field(&name).is_some() {
            self.error = Some(PluginError::schema(format!("duplicate field '{name}'")));
        } else {
            let index = self.schema.fields.len();
            self.schema.fields.push(Field { name, index, schema });
        }
        self
    }

    pub fn build(self) -> Result<Arc<Schema>, PluginError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        match self.schema.schema_type {
            SchemaType::Array if self.schema.value_schema.is_none() => {
                return Err(PluginError::schema("array schema requires an element schema"));
            }
            SchemaType::Map
                if self.schema.key_schema.is_none() || self.schema.value_schema.is_none() =>
            {
                return Err(PluginError::schema("map schema requires key and value schemas"));
            }
            _ => {}
        }
        Ok(Arc::new(self.schema))
    }
}
