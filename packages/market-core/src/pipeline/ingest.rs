//! Ingestion pipeline - normalize, merge, and score a batch of raw records.
//!
//! One call per scrape run. Normalization and scoring are pure and run with
//! bounded parallelism; the upsert+rescore pair for each record is
//! serialized per identity key through [`KeyedLocks`] so repeated sightings
//! of the same ad can never lose a `last_seen`/price update. Per-record
//! failures are logged and counted, never fatal to the batch.

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::StoreResult;
use crate::normalize::Normalizer;
use crate::pipeline::keyed_lock::KeyedLocks;
use crate::rules::BenchmarkCatalog;
use crate::scoring;
use crate::traits::store::{ListingStore, UpsertOutcome};
use crate::types::config::ScoringConfig;
use crate::types::listing::{Listing, RawRecord};

/// Configuration for batch ingestion.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Number of records processed concurrently
    pub concurrency: usize,

    /// Cooperative cancellation; checked between records, so aborting a
    /// batch never leaves a partially-written listing behind
    pub cancel: CancellationToken,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            cancel: CancellationToken::new(),
        }
    }
}

impl IngestConfig {
    /// Default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Outcome of one ingest batch.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Records handed in by the scraper adapter
    pub received: usize,

    /// New identities inserted
    pub inserted: usize,

    /// Existing identities merged
    pub updated: usize,

    /// Records dropped by normalization (bad identity or price)
    pub dropped: usize,

    /// Records left unprocessed because the batch was cancelled
    pub skipped: usize,

    /// Identity keys whose storage write failed
    pub failed: Vec<String>,

    /// Whether cancellation was requested during the batch
    pub cancelled: bool,
}

impl IngestReport {
    /// Records that made it into the store.
    pub fn processed(&self) -> usize {
        self.inserted + self.updated
    }

    /// True when every received record was stored.
    pub fn is_clean(&self) -> bool {
        self.dropped == 0 && self.skipped == 0 && self.failed.is_empty()
    }
}

enum RecordOutcome {
    Inserted,
    Updated,
    Dropped,
    Skipped,
    Failed(String),
}

/// Ingest a batch: normalize → upsert → score, per record.
///
/// Each record is re-scored after its upsert, insert or update alike, so
/// the stored score always reflects the merged row. No condition in here is
/// fatal; the report carries the per-record accounting.
pub async fn ingest_batch<S: ListingStore>(
    records: Vec<RawRecord>,
    normalizer: &Normalizer,
    store: &S,
    scoring_config: &ScoringConfig,
    benchmarks: &BenchmarkCatalog,
    config: &IngestConfig,
) -> IngestReport {
    let mut report = IngestReport {
        received: records.len(),
        ..Default::default()
    };
    let locks = KeyedLocks::new();

    info!(records = report.received, "ingest batch started");

    let outcomes: Vec<RecordOutcome> = stream::iter(records)
        .map(|raw| {
            let locks = &locks;
            async move {
                if config.cancel.is_cancelled() {
                    return RecordOutcome::Skipped;
                }

                let listing = match normalizer.normalize(&raw) {
                    Ok(listing) => listing,
                    Err(err) => {
                        warn!(
                            platform = %raw.platform,
                            source_id = %raw.source_id,
                            error = %err,
                            "record dropped"
                        );
                        return RecordOutcome::Dropped;
                    }
                };

                let key = listing.key();
                let _guard = locks.acquire(&key).await;
                match upsert_and_score(&listing, store, scoring_config, benchmarks).await {
                    Ok(outcome) if outcome.is_insert() => RecordOutcome::Inserted,
                    Ok(_) => RecordOutcome::Updated,
                    Err(err) => {
                        warn!(key = %key, error = %err, "storage failure, record not stored");
                        RecordOutcome::Failed(key.to_string())
                    }
                }
            }
        })
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

    for outcome in outcomes {
        match outcome {
            RecordOutcome::Inserted => report.inserted += 1,
            RecordOutcome::Updated => report.updated += 1,
            RecordOutcome::Dropped => report.dropped += 1,
            RecordOutcome::Skipped => report.skipped += 1,
            RecordOutcome::Failed(key) => report.failed.push(key),
        }
    }
    report.cancelled = config.cancel.is_cancelled();

    info!(
        inserted = report.inserted,
        updated = report.updated,
        dropped = report.dropped,
        skipped = report.skipped,
        failed = report.failed.len(),
        "ingest batch finished"
    );
    report
}

/// Upsert one listing and store the score of the merged row.
async fn upsert_and_score<S: ListingStore>(
    listing: &Listing,
    store: &S,
    config: &ScoringConfig,
    benchmarks: &BenchmarkCatalog,
) -> StoreResult<UpsertOutcome> {
    let outcome = store.upsert(listing).await?;

    // Score what the store now holds, not the candidate: on update the
    // merged row keeps its original first_seen and id.
    let merged = store
        .get(&listing.key())
        .await?
        .unwrap_or_else(|| listing.clone());
    let score = scoring::score(&merged, config, benchmarks);
    store.put_score(outcome.id(), &score).await?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::{raw_gpu_record, FailingStore};

    fn deps() -> (Normalizer, ScoringConfig, BenchmarkCatalog, IngestConfig) {
        (
            Normalizer::new(),
            ScoringConfig::default(),
            BenchmarkCatalog::baseline(),
            IngestConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_batch_with_bad_record_still_processes_rest() {
        let (normalizer, scoring_config, benchmarks, config) = deps();
        let store = MemoryStore::new();

        let records = vec![
            raw_gpu_record("1"),
            RawRecord::new("yad2", "2").with_price_text("call me"),
            RawRecord::new("", "3").with_price_text("100"),
            raw_gpu_record("4"),
        ];

        let report = ingest_batch(
            records,
            &normalizer,
            &store,
            &scoring_config,
            &benchmarks,
            &config,
        )
        .await;

        assert_eq!(report.received, 4);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.dropped, 2);
        assert!(report.failed.is_empty());
        assert_eq!(store.listing_count(), 2);
        assert_eq!(store.score_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_keys_in_one_batch_merge() {
        let (normalizer, scoring_config, benchmarks, config) = deps();
        let store = MemoryStore::new();

        // Same identity five times with different prices; per-key locking
        // serializes them even while the batch runs concurrently.
        let records: Vec<RawRecord> = (0..5)
            .map(|i| raw_gpu_record("same").with_price_text(format!("{} ₪", 1000 + i)))
            .collect();

        let report = ingest_batch(
            records,
            &normalizer,
            &store,
            &scoring_config,
            &benchmarks,
            &config,
        )
        .await;

        assert_eq!(report.inserted, 1);
        assert_eq!(report.updated, 4);
        assert_eq!(store.listing_count(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_skips_remaining_records() {
        let (normalizer, scoring_config, benchmarks, _) = deps();
        let store = MemoryStore::new();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let config = IngestConfig::new().with_cancellation(cancel);

        let report = ingest_batch(
            vec![raw_gpu_record("1"), raw_gpu_record("2")],
            &normalizer,
            &store,
            &scoring_config,
            &benchmarks,
            &config,
        )
        .await;

        assert!(report.cancelled);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.processed(), 0);
        assert_eq!(store.listing_count(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_is_counted_not_fatal() {
        let (normalizer, scoring_config, benchmarks, config) = deps();
        let store = FailingStore::new();
        store.fail_upserts(true);

        let report = ingest_batch(
            vec![raw_gpu_record("1")],
            &normalizer,
            &store,
            &scoring_config,
            &benchmarks,
            &config,
        )
        .await;

        assert_eq!(report.failed, vec!["yad2:1".to_string()]);
        assert_eq!(report.processed(), 0);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_rescore_follows_merged_price() {
        let (normalizer, scoring_config, benchmarks, config) = deps();
        let store = MemoryStore::new();

        let first = ingest_batch(
            vec![raw_gpu_record("1").with_price_text("1,500 ₪")],
            &normalizer,
            &store,
            &scoring_config,
            &benchmarks,
            &config,
        )
        .await;
        assert_eq!(first.inserted, 1);

        let key = crate::types::listing::SourceKey::new(
            crate::types::listing::Platform::Yad2,
            "1",
        );
        let id = store.get(&key).await.unwrap().unwrap().id;
        let score_before = store.get_score(id).await.unwrap().unwrap();

        ingest_batch(
            vec![raw_gpu_record("1").with_price_text("1,000 ₪")],
            &normalizer,
            &store,
            &scoring_config,
            &benchmarks,
            &config,
        )
        .await;

        let score_after = store.get_score(id).await.unwrap().unwrap();
        // Same card, lower price: strictly better deal.
        assert!(score_after.final_score.unwrap() > score_before.final_score.unwrap());
    }
}
