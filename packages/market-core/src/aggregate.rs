//! Aggregation: grouped price statistics and time-bucketed trends.
//!
//! The computations are pure functions over listing slices so they can be
//! tested without a store; thin async wrappers run them over a store scan.
//! Aggregates read only valid rows (`price > 0`, and a resolved city for
//! the city dimension); invalid rows are counted separately, never mixed
//! into avg/min/max.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::StoreResult;
use crate::query::ListingFilter;
use crate::traits::store::ListingStore;
use crate::types::listing::{Category, Listing};

/// Grouping dimension for [`aggregate_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Category,
    City,
}

/// Price statistics for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    /// Group key: a category name or canonical city name
    pub key: String,

    /// Listings with a valid price
    pub count: usize,

    /// Listings excluded from the price stats (price = 0)
    pub invalid_count: usize,

    /// Mean price over valid listings (0 when the group has none)
    pub avg_price: f64,

    pub min_price: f64,
    pub max_price: f64,
}

/// One day bucket of a trend series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,

    /// Mean price of that day's samples (0 when the bucket is empty)
    pub avg_price: f64,

    pub sample_count: usize,
}

/// Group listings by a dimension and compute per-group price stats.
///
/// Groups are ordered by valid-listing count descending, ties by key. For
/// the city dimension, listings whose city never resolved are left out
/// entirely; they have no group to belong to.
pub fn aggregate_by(
    listings: &[Listing],
    dimension: Dimension,
    filter: &ListingFilter,
) -> Vec<GroupStats> {
    let mut groups: BTreeMap<String, (Vec<f64>, usize)> = BTreeMap::new();

    for listing in listings.iter().filter(|l| filter.matches(l)) {
        let key = match dimension {
            Dimension::Category => listing.category.as_str().to_string(),
            Dimension::City => match &listing.city {
                Some(city) => city.clone(),
                None => continue,
            },
        };
        let entry = groups.entry(key).or_default();
        if listing.has_valid_price() {
            entry.0.push(listing.price);
        } else {
            entry.1 += 1;
        }
    }

    let mut stats: Vec<GroupStats> = groups
        .into_iter()
        .map(|(key, (prices, invalid_count))| {
            let count = prices.len();
            let (avg_price, min_price, max_price) = if count > 0 {
                let sum: f64 = prices.iter().sum();
                let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
                let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                (sum / count as f64, min, max)
            } else {
                (0.0, 0.0, 0.0)
            };
            GroupStats {
                key,
                count,
                invalid_count,
                avg_price,
                min_price,
                max_price,
            }
        })
        .collect();

    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    stats
}

/// Daily price trend for a category over the trailing `days` window.
///
/// Always returns exactly `days` buckets in ascending date order, ending on
/// `now`'s date; empty days stay in the series with `sample_count = 0` so
/// callers can draw a continuous line without special-casing gaps. Each
/// listing lands in the bucket of its `posted_date` when the platform
/// exposed one, otherwise its `last_seen`.
pub fn trend(
    listings: &[Listing],
    category: Category,
    days: u32,
    now: DateTime<Utc>,
) -> Vec<TrendPoint> {
    let days = days.max(1);
    let end = now.date_naive();
    let start = end - Duration::days(i64::from(days) - 1);

    let mut buckets: Vec<(f64, usize)> = vec![(0.0, 0); days as usize];
    for listing in listings {
        if listing.category != category || !listing.has_valid_price() {
            continue;
        }
        let observed = listing.posted_date.unwrap_or(listing.last_seen).date_naive();
        if observed < start || observed > end {
            continue;
        }
        let idx = (observed - start).num_days() as usize;
        buckets[idx].0 += listing.price;
        buckets[idx].1 += 1;
    }

    buckets
        .into_iter()
        .enumerate()
        .map(|(i, (sum, sample_count))| TrendPoint {
            date: start + Duration::days(i as i64),
            avg_price: if sample_count > 0 {
                sum / sample_count as f64
            } else {
                0.0
            },
            sample_count,
        })
        .collect()
}

/// Run [`aggregate_by`] over a store's active listings.
pub async fn aggregate_store<S: ListingStore>(
    store: &S,
    dimension: Dimension,
    filter: &ListingFilter,
) -> StoreResult<Vec<GroupStats>> {
    let listings = store.scan(false).await?;
    Ok(aggregate_by(&listings, dimension, filter))
}

/// Run [`trend`] over a store, stale listings included; they are history.
pub async fn trend_store<S: ListingStore>(
    store: &S,
    category: Category,
    days: u32,
) -> StoreResult<Vec<TrendPoint>> {
    let listings = store.scan(true).await?;
    Ok(trend(&listings, category, days, Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_listing;

    fn at_days_ago(mut listing: Listing, days: i64) -> Listing {
        listing.last_seen = Utc::now() - Duration::days(days);
        listing.posted_date = None;
        listing
    }

    #[test]
    fn test_category_stats_exclude_invalid_prices() {
        let listings = vec![
            sample_listing(Category::Gpu, 1000.0),
            sample_listing(Category::Gpu, 2000.0),
            sample_listing(Category::Gpu, 0.0),
            sample_listing(Category::Cpu, 500.0),
        ];

        let stats = aggregate_by(&listings, Dimension::Category, &ListingFilter::new());
        assert_eq!(stats.len(), 2);

        let gpu = &stats[0];
        assert_eq!(gpu.key, "gpu");
        assert_eq!(gpu.count, 2);
        assert_eq!(gpu.invalid_count, 1);
        assert_eq!(gpu.avg_price, 1500.0);
        assert_eq!(gpu.min_price, 1000.0);
        assert_eq!(gpu.max_price, 2000.0);
    }

    #[test]
    fn test_groups_ordered_by_count_then_key() {
        let mut listings = vec![
            sample_listing(Category::Cpu, 100.0),
            sample_listing(Category::Gpu, 100.0),
            sample_listing(Category::Ram, 100.0),
            sample_listing(Category::Ram, 150.0),
        ];
        // Equal counts for cpu and gpu: key order breaks the tie.
        let stats = aggregate_by(&listings, Dimension::Category, &ListingFilter::new());
        assert_eq!(stats[0].key, "ram");
        assert_eq!(stats[1].key, "cpu");
        assert_eq!(stats[2].key, "gpu");

        listings.pop();
        let stats = aggregate_by(&listings, Dimension::Category, &ListingFilter::new());
        assert_eq!(stats.len(), 3);
        assert!(stats.iter().all(|g| g.count == 1));
    }

    #[test]
    fn test_city_dimension_skips_unresolved_cities() {
        let mut in_tlv = sample_listing(Category::Gpu, 1000.0);
        in_tlv.city = Some("Tel Aviv".to_string());
        let nowhere = sample_listing(Category::Gpu, 900.0); // city = None

        let stats = aggregate_by(&[in_tlv, nowhere], Dimension::City, &ListingFilter::new());
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].key, "Tel Aviv");
        assert_eq!(stats[0].count, 1);
    }

    #[test]
    fn test_trend_returns_fixed_length_series() {
        let listings = vec![
            at_days_ago(sample_listing(Category::Gpu, 1000.0), 0),
            at_days_ago(sample_listing(Category::Gpu, 2000.0), 0),
            at_days_ago(sample_listing(Category::Gpu, 1200.0), 3),
            // Outside the window, must not appear.
            at_days_ago(sample_listing(Category::Gpu, 9999.0), 10),
            // Other category, must not appear.
            at_days_ago(sample_listing(Category::Cpu, 500.0), 1),
        ];

        let series = trend(&listings, Category::Gpu, 7, Utc::now());
        assert_eq!(series.len(), 7);

        // Ascending dates, one per day.
        for pair in series.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }

        assert_eq!(series[6].sample_count, 2);
        assert_eq!(series[6].avg_price, 1500.0);
        assert_eq!(series[3].sample_count, 1);
        // Empty buckets are present, not dropped.
        assert_eq!(series[0].sample_count, 0);
        assert_eq!(series[0].avg_price, 0.0);
    }

    #[test]
    fn test_trend_prefers_posted_date() {
        let mut listing = at_days_ago(sample_listing(Category::Gpu, 800.0), 0);
        listing.posted_date = Some(Utc::now() - Duration::days(2));

        let series = trend(&[listing], Category::Gpu, 7, Utc::now());
        assert_eq!(series[4].sample_count, 1);
        assert_eq!(series[6].sample_count, 0);
    }

    #[test]
    fn test_trend_ignores_zero_priced_listings() {
        let listing = at_days_ago(sample_listing(Category::Gpu, 0.0), 0);
        let series = trend(&[listing], Category::Gpu, 3, Utc::now());
        assert!(series.iter().all(|p| p.sample_count == 0));
    }

    #[tokio::test]
    async fn test_store_wrappers() {
        use crate::stores::MemoryStore;
        use crate::traits::store::ListingStore;

        let store = MemoryStore::new();
        let mut listing = sample_listing(Category::Gpu, 1000.0);
        listing.city = Some("Haifa".to_string());
        store.upsert(&listing).await.unwrap();

        let stats = aggregate_store(&store, Dimension::City, &ListingFilter::new())
            .await
            .unwrap();
        assert_eq!(stats[0].key, "Haifa");

        let series = trend_store(&store, Category::Gpu, 7).await.unwrap();
        assert_eq!(series.len(), 7);
        assert_eq!(series[6].sample_count, 1);
    }
}
