use std::sync::Arc;

use connect_api::record::Record;

use crate::chain::TransformChain;
use crate::codec;
use crate::config::{ErrorTolerance, PipelineConfig};
use crate::error::EngineError;
use crate::registry::TransformRegistry;

/// Record counters, updated by [`Pipeline::process`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub records_in: u64,
    /// Records for which the chain returned a new record.
    pub transformed: u64,
    /// Records handed back as the same `Arc`.
    pub unchanged: u64,
    /// Failed records dropped under `tolerance = "all"`.
    pub skipped: u64,
}

/// A configured transform chain plus error policy and counters.
pub struct Pipeline {
    chain: TransformChain,
    tolerance: ErrorTolerance,
    stats: PipelineStats,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("chain", &self.chain)
            .field("tolerance", &self.tolerance)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Pipeline {
    /// Build the pipeline from a parsed configuration.
    ///
    /// Creates and configures every transform in declaration order.
    pub fn bootstrap(
        config: &PipelineConfig,
        registry: &TransformRegistry,
    ) -> Result<Self, EngineError> {
        let mut chain = TransformChain::new();
        for t in &config.transforms {
            let ctx = format!("transform '{}'", t.name);
            let options = t.options()?;
            let transform = registry
                .create(&t.kind, options.as_ref())
                .map_err(|e| e.with_context(&ctx))?;
            tracing::info!(transform = %t.name, kind = %t.kind, "configured transform");
            chain = chain.push(t.name.clone(), transform);
        }

        if chain.is_empty() {
            tracing::warn!("no transforms configured, records pass through unchanged");
        }

        Ok(Self {
            chain,
            tolerance: config.errors.tolerance,
            stats: PipelineStats::default(),
        })
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Apply the chain to one record.
    ///
    /// Returns `Ok(None)` when the record failed and was skipped under
    /// `tolerance = "all"`.
    pub fn process(&mut self, record: Arc<Record>) -> Result<Option<Arc<Record>>, EngineError> {
        self.stats.records_in += 1;
        match self.chain.apply(record.clone()) {
            Ok(out) => {
                self.count(&record, &out);
                Ok(Some(out))
            }
            Err(e) => self.tolerate(&record.topic, e.into()),
        }
    }

    /// Decode a JSON line, process it and encode the result.
    ///
    /// Decode and encode failures follow the same error policy as transform
    /// failures. A record is counted as transformed or unchanged only once
    /// its output line is built.
    pub fn process_line(&mut self, line: &str) -> Result<Option<String>, EngineError> {
        self.stats.records_in += 1;
        let record = match codec::decode_record(line) {
            Ok(r) => Arc::new(r),
            Err(e) => return self.tolerate("<undecoded>", e),
        };
        let out = match self.chain.apply(record.clone()) {
            Ok(out) => out,
            Err(e) => return self.tolerate(&record.topic, e.into()),
        };
        match codec::encode_record(&out) {
            Ok(encoded) => {
                self.count(&record, &out);
                Ok(Some(encoded))
            }
            Err(e) => self.tolerate(&out.topic, e.with_context("encode")),
        }
    }

    fn count(&mut self, input: &Arc<Record>, output: &Arc<Record>) {
        if Arc::ptr_eq(input, output) {
            self.stats.unchanged += 1;
        } else {
            self.stats.transformed += 1;
        }
    }

    fn tolerate<T>(&mut self, topic: &str, err: EngineError) -> Result<Option<T>, EngineError> {
        match self.tolerance {
            ErrorTolerance::None => Err(err),
            ErrorTolerance::All => {
                self.stats.skipped += 1;
                tracing::warn!(topic = %topic, error = %err, "skipping record");
                Ok(None)
            }
        }
    }

    /// Close all transforms and log the final counters.
    pub fn shutdown(mut self) -> Result<PipelineStats, EngineError> {
        let stats = self.stats;
        tracing::info!(
            records_in = stats.records_in,
            transformed = stats.transformed,
            unchanged = stats.unchanged,
            skipped = stats.skipped,
            "pipeline stopped"
        );
        self.chain.close()?;
        Ok(stats)
    }
}
