//! Record enrichment pipeline.
//!
//! Drives one pass over decoded input rows, strictly in order:
//! 1. Reject rows missing positional fields
//! 2. Extract and validate the CNPJ
//! 3. Consult the dedup cache
//! 4. Look the company up in the registry
//! 5. Mark the CNPJ as processed
//! 6. Keep companies whose declared capital exceeds the threshold
//! 7. Merge with the row's contact fields and append to the output
//!
//! Every row, whatever its outcome, is followed by the configured delay.
use crate::config::Config;
use crate::dedup_cache::DedupCache;
use crate::lookup_client::RegistryClient;
use crate::models::{
    CompanyIdentifier, InputRow, OutputRecord, PipelineSummary, RowOutcome, SkipReason,
};
use crate::output::OutputSink;
use crate::validator;
use bigdecimal::BigDecimal;
use std::io::Write;
use std::time::Duration;

/// Declared capital a company must exceed to be written.
pub const CAPITAL_THRESHOLD: i64 = 50_000;

#[derive(Clone)]
pub struct RecordPipeline {
    client: RegistryClient,
    cache: DedupCache,
    row_delay: Duration,
    threshold: BigDecimal,
}

impl RecordPipeline {
    pub fn new(client: RegistryClient, cache: DedupCache, row_delay: Duration) -> Self {
        Self {
            client,
            cache,
            row_delay,
            threshold: BigDecimal::from(CAPITAL_THRESHOLD),
        }
    }

    /// Builds the client and a fresh dedup cache from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = RegistryClient::new(&config.lookup_base_url, config.lookup_timeout())?;
        let cache = DedupCache::new(config.dedup_cooldown(), config.dedup_max_entries);
        Ok(Self::new(client, cache, config.row_delay()))
    }

    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    /// Processes every row and returns the per-outcome counts.
    ///
    /// Per-row failures are logged and skipped; a run never aborts early.
    pub async fn run<W: Write + Send>(
        &self,
        rows: &[InputRow],
        sink: &OutputSink<W>,
    ) -> PipelineSummary {
        let mut summary = PipelineSummary::default();

        for (idx, row) in rows.iter().enumerate() {
            let outcome = self.process_row(row, sink).await;
            if outcome != RowOutcome::Written {
                tracing::debug!("Row {} skipped: {:?}", idx + 1, outcome);
            }
            summary.record(outcome);

            if !self.row_delay.is_zero() {
                tokio::time::sleep(self.row_delay).await;
            }
        }

        summary
    }

    /// Runs a single row to its terminal state.
    pub async fn process_row<W: Write + Send>(
        &self,
        row: &InputRow,
        sink: &OutputSink<W>,
    ) -> RowOutcome {
        if !row.is_complete() {
            return RowOutcome::Skipped(SkipReason::TooFewFields);
        }

        let Some(id) = CompanyIdentifier::parse(validator::extract_identifier(row)) else {
            return RowOutcome::Skipped(SkipReason::InvalidIdentifier);
        };

        if !validator::has_valid_check_digits(id.as_str()) {
            tracing::debug!("CNPJ {} has invalid check digits, looking it up anyway", id);
        }

        if self.cache.should_skip(id.as_str()).await {
            tracing::debug!("CNPJ {} looked up recently, skipping", id);
            return RowOutcome::Skipped(SkipReason::RecentlyProcessed);
        }

        let company = match self.client.lookup(&id).await {
            Ok(company) => company,
            Err(e) => {
                tracing::warn!("Error looking up CNPJ {}: {}", id, e);
                return RowOutcome::Skipped(SkipReason::LookupFailed);
            }
        };

        self.cache.mark_processed(id.as_str()).await;

        if company.capital_social <= self.threshold {
            return RowOutcome::Skipped(SkipReason::BelowThreshold);
        }

        let record = OutputRecord::merge(&id, company, row);
        match sink.append(&record) {
            Ok(()) => {
                tracing::info!("✓ CNPJ {} written ({})", id, record.razao_social);
                RowOutcome::Written
            }
            Err(e) => {
                tracing::error!("Error writing CNPJ {} to output: {}", id, e);
                RowOutcome::Skipped(SkipReason::WriteFailed)
            }
        }
    }
}
