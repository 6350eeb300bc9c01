use std::collections::HashMap;

use connect_api::config::{ConfigDef, ConfigParam, ConfigValues, ParamType, ParamValue};
use connect_api::transform::Transformation;

use crate::error::EngineError;

/// Constructor for a transform type. The returned transform is not yet
/// configured.
pub type TransformFactory = fn() -> Box<dyn Transformation>;

/// Built-in transform types, looked up by the `type` key of the pipeline config.
#[derive(Default)]
pub struct TransformRegistry {
    factories: HashMap<String, TransformFactory>,
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("TransformRegistry").field("kinds", &kinds).finish()
    }
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. Registering the same type twice replaces the
    /// earlier factory.
    pub fn register(&mut self, kind: impl Into<String>, factory: TransformFactory) -> &mut Self {
        let kind = kind.into();
        if self.factories.insert(kind.clone(), factory).is_some() {
            tracing::warn!(kind = %kind, "transform type registered twice, keeping the latest");
        }
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Create and configure a transform.
    ///
    /// 1. Instantiate via the registered factory.
    /// 2. Read the transform's `ConfigDef`.
    /// 3. Parse options → raw values, validate, build ConfigValues.
    /// 4. Call `configure(&config_values)`.
    pub fn create(
        &self,
        kind: &str,
        options: Option<&serde_json::Value>,
    ) -> Result<Box<dyn Transformation>, EngineError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| EngineError::UnknownTransform(kind.to_string()))?;
        let mut transform = factory();
        let def = transform.config();
        let raw = parse_transform_config(options, &def)?;
        let values = validate_and_build(&raw, &def)?;
        transform.configure(&values)?;
        Ok(transform)
    }
}

// ---------------------------------------------------------------------------
// Config parsing & validation (format-independent)
// ---------------------------------------------------------------------------

/// Parse transform options into format-independent key-value pairs.
///
/// `options` is a `serde_json::Value` (already converted from TOML by the
/// config loader).
///
/// - Declared keys are converted to their declared `ParamType`.
/// - Undeclared keys are kept as flattened strings; the transform decides
///   whether to use or ignore them.
///
/// Returns only the keys that are present in the options, in declaration
/// order followed by undeclared keys.
/// Defaults and required-checks are handled by `validate_and_build`.
pub fn parse_transform_config(
    options: Option<&serde_json::Value>,
    def: &ConfigDef,
) -> Result<Vec<(String, ParamValue)>, EngineError> {
    let obj = match options {
        Some(serde_json::Value::Object(map)) => map,
        Some(_) => {
            return Err(EngineError::Config(
                "transform config must be a table/object".into(),
            ))
        }
        None => return Ok(Vec::new()),
    };

    let mut result = Vec::new();
    for param in def.params() {
        if let Some(v) = obj.get(&param.name) {
            let pv = value_to_param_value(v, param)?;
            result.push((param.name.clone(), pv));
        }
    }

    for (key, v) in obj {
        if def.find(key).is_none() {
            tracing::debug!(key = %key, "passing undeclared option through as string");
            result.push((key.clone(), ParamValue::Str(flatten_value(v))));
        }
    }

    Ok(result)
}

/// Build `ConfigValues` from parsed key-value pairs (format-independent).
///
/// For each declared param:
/// - If present in `parsed`: use the value.
/// - If absent with default: use default value.
/// - If absent and required: return error.
///
/// Undeclared pairs are copied as they are.
pub fn validate_and_build(
    parsed: &[(String, ParamValue)],
    def: &ConfigDef,
) -> Result<ConfigValues, EngineError> {
    let mut values = ConfigValues::new();

    for param in def.params() {
        match parsed.iter().find(|(k, _)| k == &param.name) {
            Some((_, v)) => {
                values.set(&param.name, v.clone());
            }
            None => {
                if let Some(ref default) = param.default {
                    values.set(&param.name, default.clone());
                } else if param.required {
                    return Err(EngineError::Config(format!(
                        "missing required parameter '{}'",
                        param.name
                    )));
                }
            }
        }
    }

    for (key, v) in parsed {
        if def.find(key).is_none() {
            values.set(key, v.clone());
        }
    }

    Ok(values)
}

/// Convert a single value to a ParamValue according to the declared type.
fn value_to_param_value(
    val: &serde_json::Value,
    param: &ConfigParam,
) -> Result<ParamValue, EngineError> {
    match param.param_type {
        ParamType::Bool => {
            let b = val.as_bool().ok_or_else(|| {
                EngineError::Config(format!("parameter '{}': expected bool", param.name))
            })?;
            Ok(ParamValue::Bool(b))
        }
        ParamType::I64 => {
            let i = val.as_i64().ok_or_else(|| {
                EngineError::Config(format!("parameter '{}': expected integer", param.name))
            })?;
            Ok(ParamValue::I64(i))
        }
        ParamType::U64 => {
            if let Some(u) = val.as_u64() {
                return Ok(ParamValue::U64(u));
            }
            let i = val.as_i64().ok_or_else(|| {
                EngineError::Config(format!("parameter '{}': expected integer", param.name))
            })?;
            Err(EngineError::Config(format!(
                "parameter '{}': expected non-negative integer, got {i}",
                param.name
            )))
        }
        ParamType::F64 => {
            let f = val.as_f64().ok_or_else(|| {
                EngineError::Config(format!("parameter '{}': expected float", param.name))
            })?;
            Ok(ParamValue::F64(f))
        }
        ParamType::Str => Ok(ParamValue::Str(flatten_value(val))),
    }
}

/// Flatten a value into a string for flat config transport.
///
/// Scalars are converted directly (no quoting).
/// Arrays and objects are serialized as JSON strings.
fn flatten_value(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => val.to_string(),
    }
}
