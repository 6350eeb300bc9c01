use std::sync::Arc;

use crate::config::{ConfigDef, ConfigValues};
use crate::error::PluginError;
use crate::record::Record;

/// Single-record transformation, the plugin contract a host drives.
///
/// Lifecycle:
/// 1. `config()`: host reads the declared options and converts raw values.
/// 2. `configure()`: called once with the converted values.
/// 3. `apply()`: called once per record, possibly from several threads.
/// 4. `close()`: called once on shutdown.
///
/// `apply` must not mutate its input. A record that needs no change is
/// returned as the same `Arc`, so hosts can detect "unchanged" with
/// `Arc::ptr_eq`.
pub trait Transformation: Send + Sync {
    /// Receive options. Transforms without options accept and ignore any map.
    fn configure(&mut self, config: &ConfigValues) -> Result<(), PluginError>;

    /// Transform one record.
    fn apply(&self, record: Arc<Record>) -> Result<Arc<Record>, PluginError>;

    /// Options this transform recognizes.
    fn config(&self) -> ConfigDef;

    /// Release resources. Default: nothing to release.
    fn close(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Name of this transform for logging.
    fn name(&self) -> &str {
        "transform"
    }
}
