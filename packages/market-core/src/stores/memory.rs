//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::query::{paginate, sort_listings, ListingFilter, Page, ScoredListing, Sort};
use crate::traits::store::{ListingStore, UpsertOutcome};
use crate::types::listing::{Listing, Platform, SourceKey};
use crate::types::score::Score;

/// In-memory listing store.
///
/// Useful for testing and development; data is lost on restart. Upserts
/// take the map's write lock, so each merge is atomically visible to
/// readers.
pub struct MemoryStore {
    listings: RwLock<HashMap<SourceKey, Listing>>,
    ids: RwLock<HashMap<Uuid, SourceKey>>,
    scores: RwLock<HashMap<Uuid, Score>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            listings: RwLock::new(HashMap::new()),
            ids: RwLock::new(HashMap::new()),
            scores: RwLock::new(HashMap::new()),
        }
    }

    /// Drop all stored data.
    pub fn clear(&self) {
        self.listings.write().unwrap().clear();
        self.ids.write().unwrap().clear();
        self.scores.write().unwrap().clear();
    }

    /// Number of stored listings.
    pub fn listing_count(&self) -> usize {
        self.listings.read().unwrap().len()
    }

    /// Number of stored scores.
    pub fn score_count(&self) -> usize {
        self.scores.read().unwrap().len()
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn upsert(&self, candidate: &Listing) -> StoreResult<UpsertOutcome> {
        let now = Utc::now();
        let key = candidate.key();
        let mut listings = self.listings.write().unwrap();

        if let Some(existing) = listings.get_mut(&key) {
            existing.merge_observation(candidate, now);
            return Ok(UpsertOutcome::Updated(existing.id));
        }

        let mut fresh = candidate.clone();
        fresh.first_seen = now;
        fresh.last_seen = now;
        fresh.active = true;
        let id = fresh.id;
        listings.insert(key.clone(), fresh);
        self.ids.write().unwrap().insert(id, key);
        Ok(UpsertOutcome::Inserted(id))
    }

    async fn get(&self, key: &SourceKey) -> StoreResult<Option<Listing>> {
        Ok(self.listings.read().unwrap().get(key).cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        let ids = self.ids.read().unwrap();
        let Some(key) = ids.get(&id) else {
            return Ok(None);
        };
        Ok(self.listings.read().unwrap().get(key).cloned())
    }

    async fn put_score(&self, id: Uuid, score: &Score) -> StoreResult<()> {
        self.scores.write().unwrap().insert(id, score.clone());
        Ok(())
    }

    async fn get_score(&self, id: Uuid) -> StoreResult<Option<Score>> {
        Ok(self.scores.read().unwrap().get(&id).cloned())
    }

    async fn query(
        &self,
        filter: &ListingFilter,
        page: &Page,
        sort: Sort,
    ) -> StoreResult<Vec<ScoredListing>> {
        let listings = self.listings.read().unwrap();
        let scores = self.scores.read().unwrap();

        let mut results: Vec<ScoredListing> = listings
            .values()
            .filter(|l| filter.matches(l))
            .map(|l| ScoredListing {
                score: scores.get(&l.id).cloned(),
                listing: l.clone(),
            })
            .collect();

        sort_listings(&mut results, sort);
        Ok(paginate(results, page))
    }

    async fn scan(&self, include_stale: bool) -> StoreResult<Vec<Listing>> {
        Ok(self
            .listings
            .read()
            .unwrap()
            .values()
            .filter(|l| include_stale || l.active)
            .cloned()
            .collect())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.listings.read().unwrap().len())
    }

    async fn mark_stale(&self, platform: Platform, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let mut listings = self.listings.write().unwrap();
        let mut marked = 0;
        for listing in listings.values_mut() {
            if listing.platform == platform && listing.active && listing.last_seen < cutoff {
                listing.active = false;
                marked += 1;
            }
        }
        Ok(marked)
    }
}
