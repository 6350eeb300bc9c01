use connect_api::error::PluginError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("unknown transform type: {0}")]
    UnknownTransform(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Plugin` variant, context is added to the inner `PluginError`.
    /// For other variants, context is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Plugin(e) => EngineError::Plugin(e.with_context(ctx)),
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            EngineError::Codec(msg) => EngineError::Codec(format!("{ctx}: {msg}")),
            EngineError::UnknownTransform(msg) => {
                EngineError::UnknownTransform(format!("{ctx}: {msg}"))
            }
            other => other,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Codec(e.to_string())
    }
}
