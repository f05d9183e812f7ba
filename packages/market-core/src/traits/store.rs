//! Storage trait for the identity & merge store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::query::{ListingFilter, Page, ScoredListing, Sort};
use crate::types::listing::{Listing, Platform, SourceKey};
use crate::types::score::Score;

/// Outcome of an upsert, carrying the stored row id either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First observation of this identity
    Inserted(Uuid),

    /// Existing row merged with the fresh observation
    Updated(Uuid),
}

impl UpsertOutcome {
    /// The stored listing id.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Inserted(id) | Self::Updated(id) => *id,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Identity-keyed listing storage with merge-on-upsert semantics.
///
/// Implementations must make each upsert atomically visible: a reader never
/// observes a half-merged listing. Serializing concurrent upserts *on the
/// same key* is the pipeline's job (see
/// [`KeyedLocks`](crate::pipeline::KeyedLocks)); backends only need
/// row-level atomicity.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Insert a new listing or merge a fresh observation into the existing
    /// row for its `(platform, source_id)` identity.
    ///
    /// On insert, `first_seen`/`last_seen` are both set to the store's
    /// clock. On update only the mutable fields move and `last_seen`
    /// advances; `first_seen` is immutable, preserving the time-on-market
    /// signal.
    async fn upsert(&self, candidate: &Listing) -> StoreResult<UpsertOutcome>;

    /// Fetch a listing by its dedup key.
    async fn get(&self, key: &SourceKey) -> StoreResult<Option<Listing>>;

    /// Fetch a listing by its row id.
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Listing>>;

    /// Store (replace) the score for a listing.
    async fn put_score(&self, id: Uuid, score: &Score) -> StoreResult<()>;

    /// Fetch the current score for a listing.
    async fn get_score(&self, id: Uuid) -> StoreResult<Option<Score>>;

    /// Filtered, sorted, paginated read access.
    async fn query(
        &self,
        filter: &ListingFilter,
        page: &Page,
        sort: Sort,
    ) -> StoreResult<Vec<ScoredListing>>;

    /// Full listing scan for aggregation. `include_stale` pulls in rows
    /// already marked inactive, which trend history needs.
    async fn scan(&self, include_stale: bool) -> StoreResult<Vec<Listing>>;

    /// Total number of stored listings, active or not.
    async fn count(&self) -> StoreResult<usize>;

    /// Mark listings of a platform stale when not seen since `cutoff`.
    ///
    /// Returns how many rows were deactivated. Nothing is ever deleted;
    /// stale rows stay behind the `include_stale` query flag for trend
    /// history.
    async fn mark_stale(&self, platform: Platform, cutoff: DateTime<Utc>) -> StoreResult<usize>;
}
