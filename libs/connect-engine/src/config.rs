use serde::Deserialize;

use crate::error::EngineError;

/// Root configuration, parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    /// Per-record failure handling.
    #[serde(default)]
    pub errors: ErrorsConfig,

    /// Transform definitions, applied in order.
    #[serde(default)]
    pub transforms: Vec<TransformConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorsConfig {
    #[serde(default)]
    pub tolerance: ErrorTolerance,
}

/// What to do with a record whose processing fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorTolerance {
    /// Stop at the first failing record.
    #[default]
    None,
    /// Log and skip failing records.
    All,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransformConfig {
    /// Alias, unique within the pipeline. Used in logs and error context.
    pub name: String,
    /// Registered transform type (e.g. `"full-name"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-form options, checked against the transform's `ConfigDef`.
    #[serde(default)]
    pub config: Option<toml::Value>,
}

impl TransformConfig {
    /// Options as a format-independent JSON value.
    pub fn options(&self) -> Result<Option<serde_json::Value>, EngineError> {
        self.config
            .as_ref()
            .map(|v| {
                serde_json::to_value(v).map_err(|e| {
                    EngineError::Config(format!("transform '{}': {e}", self.name))
                })
            })
            .transpose()
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("{path}: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Single `full-name` transform, used when no config file is given.
    pub fn full_name_only() -> Self {
        Self {
            errors: ErrorsConfig::default(),
            transforms: vec![TransformConfig {
                name: "fullName".into(),
                kind: "full-name".into(),
                config: None,
            }],
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        for (i, t) in self.transforms.iter().enumerate() {
            if t.name.is_empty() {
                return Err(EngineError::Config(format!("transform #{i}: empty name")));
            }
            if self.transforms[..i].iter().any(|other| other.name == t.name) {
                return Err(EngineError::Config(format!(
                    "duplicate transform name '{}'",
                    t.name
                )));
            }
        }
        Ok(())
    }
}
