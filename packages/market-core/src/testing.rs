//! Testing utilities: record/listing factories and a fault-injecting store.
//!
//! Useful for testing applications built on this crate without wiring up a
//! real scraper or database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::query::{ListingFilter, Page, ScoredListing, Sort};
use crate::stores::MemoryStore;
use crate::traits::store::{ListingStore, UpsertOutcome};
use crate::types::listing::{
    Category, Condition, ConditionConfidence, Listing, Platform, RawRecord, SourceKey,
};
use crate::types::score::Score;

/// A raw yad2 GPU record matching the documented end-to-end example.
pub fn raw_gpu_record(source_id: &str) -> RawRecord {
    RawRecord::new("yad2", source_id)
        .with_title("RTX 3070 8GB")
        .with_price_text("1,500 ₪")
        .with_location("תל אביב")
}

/// A minimal canonical listing for unit tests.
///
/// Identity defaults to `yad2:sample-1`; override `source_id` when a test
/// needs distinct rows.
pub fn sample_listing(category: Category, price: f64) -> Listing {
    let now = Utc::now();
    Listing {
        id: Uuid::new_v4(),
        platform: Platform::Yad2,
        source_id: "sample-1".to_string(),
        title: format!("{category} listing"),
        description: String::new(),
        category,
        condition: Condition::Good,
        condition_confidence: ConditionConfidence::Defaulted,
        brand: None,
        model: None,
        price,
        currency: "ILS".to_string(),
        warranty_months: 0,
        vram_gb: None,
        city: None,
        region: None,
        url: None,
        seller_name: None,
        posted_date: None,
        first_seen: now,
        last_seen: now,
        active: true,
    }
}

/// A store wrapper that can be told to fail upserts, for exercising the
/// pipeline's per-record failure accounting.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_upserts: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle upsert failure injection.
    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    fn injected() -> StoreError {
        StoreError::backend(std::io::Error::other("injected upsert failure"))
    }
}

#[async_trait]
impl ListingStore for FailingStore {
    async fn upsert(&self, candidate: &Listing) -> StoreResult<UpsertOutcome> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.upsert(candidate).await
    }

    async fn get(&self, key: &SourceKey) -> StoreResult<Option<Listing>> {
        self.inner.get(key).await
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        self.inner.get_by_id(id).await
    }

    async fn put_score(&self, id: Uuid, score: &Score) -> StoreResult<()> {
        self.inner.put_score(id, score).await
    }

    async fn get_score(&self, id: Uuid) -> StoreResult<Option<Score>> {
        self.inner.get_score(id).await
    }

    async fn query(
        &self,
        filter: &ListingFilter,
        page: &Page,
        sort: Sort,
    ) -> StoreResult<Vec<ScoredListing>> {
        self.inner.query(filter, page, sort).await
    }

    async fn scan(&self, include_stale: bool) -> StoreResult<Vec<Listing>> {
        self.inner.scan(include_stale).await
    }

    async fn count(&self) -> StoreResult<usize> {
        self.inner.count().await
    }

    async fn mark_stale(&self, platform: Platform, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        self.inner.mark_stale(platform, cutoff).await
    }
}
