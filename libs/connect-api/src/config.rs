/// Parameter type for plugin configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Bool,
    I64,
    U64,
    F64,
    Str,
}

/// Declaration of a single config parameter.
///
/// Transforms export these via `Transformation::config()`.
/// The host uses them to convert raw option values BEFORE calling `configure()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigParam {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub default: Option<ParamValue>,
    pub description: String,
}

/// Ordered set of parameter declarations a transform recognizes.
///
/// An empty definition means the transform has no options at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDef {
    params: Vec<ConfigParam>,
}

impl ConfigDef {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Declare a parameter. A later declaration with the same name replaces
    /// the earlier one.
    pub fn define(mut self, param: ConfigParam) -> Self {
        if let Some(existing) = self.params.iter_mut().find(|p| p.name == param.name) {
            *existing = param;
        } else {
            self.params.push(param);
        }
        self
    }

    pub fn params(&self) -> &[ConfigParam] {
        &self.params
    }

    pub fn find(&self, name: &str) -> Option<&ConfigParam> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }
}

/// Typed config value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
}

/// Config values passed to a transform's `configure()`.
///
/// The host builds this from the pipeline config after converting declared
/// parameters to their `ParamType`. Undeclared options arrive as `Str`.
/// Transforms read values via typed getters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigValues {
    entries: Vec<(String, ParamValue)>,
}

impl ConfigValues {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == &name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(ParamValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(ParamValue::I64(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        match self.get(name) {
            Some(ParamValue::U64(v)) => Some(*v),
            // Most config formats lack unsigned integers; accept non-negative i64.
            Some(ParamValue::I64(v)) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(ParamValue::F64(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ParamValue::Str(v)) => Some(v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
