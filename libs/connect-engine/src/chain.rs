use std::sync::Arc;

use connect_api::error::PluginError;
use connect_api::record::Record;
use connect_api::transform::Transformation;

/// Configured transform with its pipeline alias.
struct Stage {
    alias: String,
    transform: Box<dyn Transformation>,
}

/// A chain of transforms applied in sequence.
#[derive(Default)]
pub struct TransformChain {
    stages: Vec<Stage>,
}

impl std::fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let aliases: Vec<_> = self.stages.iter().map(|s| s.alias.as_str()).collect();
        f.debug_struct("TransformChain").field("stages", &aliases).finish()
    }
}

impl TransformChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an already configured transform.
    pub fn push(mut self, alias: impl Into<String>, transform: Box<dyn Transformation>) -> Self {
        self.stages.push(Stage {
            alias: alias.into(),
            transform,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Run the record through every transform in order. Errors carry the
    /// alias of the failing transform.
    pub fn apply(&self, mut record: Arc<Record>) -> Result<Arc<Record>, PluginError> {
        for stage in &self.stages {
            record = stage
                .transform
                .apply(record)
                .map_err(|e| e.with_context(format!("transform '{}'", stage.alias)))?;
        }
        Ok(record)
    }

    /// Close every transform. All are attempted; the first failure is returned.
    pub fn close(&mut self) -> Result<(), PluginError> {
        let mut first_err = None;
        for stage in &mut self.stages {
            if let Err(e) = stage.transform.close() {
                tracing::error!(transform = %stage.alias, error = %e, "failed to close transform");
                if first_err.is_none() {
                    first_err = Some(e.with_context(format!("transform '{}'", stage.alias)));
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
