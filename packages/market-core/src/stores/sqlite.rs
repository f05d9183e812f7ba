//! SQLite storage implementation.
//!
//! A file-based backend behind the `sqlite` feature. Good for local
//! development and single-server deployments. Upserts run in a transaction,
//! so a reader never observes a half-merged row; per-key serialization
//! across concurrent writers is still the pipeline's KeyedLocks job.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::query::{ListingFilter, Page, ScoredListing, Sort};
use crate::traits::store::{ListingStore, UpsertOutcome};
use crate::types::listing::{
    Category, Condition, ConditionConfidence, Listing, Platform, SourceKey,
};
use crate::types::score::Score;

/// SQLite-backed listing store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - ephemeral, for tests
    /// - `sqlite://./market_scout.db?mode=rwc` - file-based, create if missing
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StoreError::backend)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    ///
    /// Capped to one connection; each SQLite `:memory:` connection is its
    /// own database.
    pub async fn in_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(StoreError::backend)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run schema migrations.
    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                id TEXT PRIMARY KEY,
                platform TEXT NOT NULL,
                source_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                condition TEXT NOT NULL,
                condition_confidence TEXT NOT NULL,
                brand TEXT,
                model TEXT,
                price REAL NOT NULL,
                currency TEXT NOT NULL,
                warranty_months INTEGER NOT NULL DEFAULT 0,
                vram_gb INTEGER,
                city TEXT,
                region TEXT,
                url TEXT,
                seller_name TEXT,
                posted_date TEXT,
                first_seen TEXT NOT NULL,
                last_seen TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                UNIQUE(platform, source_id)
            );

            CREATE INDEX IF NOT EXISTS idx_listings_category ON listings(category);
            CREATE INDEX IF NOT EXISTS idx_listings_city ON listings(city);
            CREATE INDEX IF NOT EXISTS idx_listings_last_seen ON listings(last_seen);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                listing_id TEXT PRIMARY KEY REFERENCES listings(id),
                payload TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(())
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    // Fixed-width form keeps lexicographic comparisons in SQL correct.
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(text: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {text:?}: {e}")))
}

fn confidence_str(confidence: ConditionConfidence) -> &'static str {
    match confidence {
        ConditionConfidence::Matched => "matched",
        ConditionConfidence::Defaulted => "defaulted",
    }
}

fn row_to_listing(row: &SqliteRow) -> StoreResult<Listing> {
    let id: String = row.try_get("id").map_err(StoreError::backend)?;
    let platform: String = row.try_get("platform").map_err(StoreError::backend)?;
    let category: String = row.try_get("category").map_err(StoreError::backend)?;
    let condition: String = row.try_get("condition").map_err(StoreError::backend)?;
    let confidence: String = row
        .try_get("condition_confidence")
        .map_err(StoreError::backend)?;
    let first_seen: String = row.try_get("first_seen").map_err(StoreError::backend)?;
    let last_seen: String = row.try_get("last_seen").map_err(StoreError::backend)?;
    let posted_date: Option<String> = row.try_get("posted_date").map_err(StoreError::backend)?;

    Ok(Listing {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Corrupt(format!("bad id: {e}")))?,
        platform: Platform::parse(&platform)
            .ok_or_else(|| StoreError::Corrupt(format!("bad platform {platform:?}")))?,
        source_id: row.try_get("source_id").map_err(StoreError::backend)?,
        title: row.try_get("title").map_err(StoreError::backend)?,
        description: row.try_get("description").map_err(StoreError::backend)?,
        category: Category::parse(&category)
            .ok_or_else(|| StoreError::Corrupt(format!("bad category {category:?}")))?,
        condition: Condition::parse(&condition)
            .ok_or_else(|| StoreError::Corrupt(format!("bad condition {condition:?}")))?,
        condition_confidence: match confidence.as_str() {
            "matched" => ConditionConfidence::Matched,
            "defaulted" => ConditionConfidence::Defaulted,
            other => return Err(StoreError::Corrupt(format!("bad confidence {other:?}"))),
        },
        brand: row.try_get("brand").map_err(StoreError::backend)?,
        model: row.try_get("model").map_err(StoreError::backend)?,
        price: row.try_get("price").map_err(StoreError::backend)?,
        currency: row.try_get("currency").map_err(StoreError::backend)?,
        warranty_months: row
            .try_get::<i64, _>("warranty_months")
            .map_err(StoreError::backend)? as u32,
        vram_gb: row
            .try_get::<Option<i64>, _>("vram_gb")
            .map_err(StoreError::backend)?
            .map(|gb| gb as u32),
        city: row.try_get("city").map_err(StoreError::backend)?,
        region: row.try_get("region").map_err(StoreError::backend)?,
        url: row.try_get("url").map_err(StoreError::backend)?,
        seller_name: row.try_get("seller_name").map_err(StoreError::backend)?,
        posted_date: posted_date.as_deref().map(parse_ts).transpose()?,
        first_seen: parse_ts(&first_seen)?,
        last_seen: parse_ts(&last_seen)?,
        active: row.try_get::<i64, _>("active").map_err(StoreError::backend)? != 0,
    })
}

#[async_trait]
impl ListingStore for SqliteStore {
    async fn upsert(&self, candidate: &Listing) -> StoreResult<UpsertOutcome> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let existing: Option<SqliteRow> =
            sqlx::query("SELECT id FROM listings WHERE platform = ? AND source_id = ?")
                .bind(candidate.platform.as_str())
                .bind(&candidate.source_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(StoreError::backend)?;

        if let Some(row) = existing {
            let id_text: String = row.try_get("id").map_err(StoreError::backend)?;
            let id = Uuid::parse_str(&id_text)
                .map_err(|e| StoreError::Corrupt(format!("bad id: {e}")))?;

            sqlx::query(
                r#"
                UPDATE listings SET
                    price = ?, condition = ?, condition_confidence = ?,
                    description = ?, warranty_months = ?, vram_gb = ?,
                    last_seen = ?, active = 1
                WHERE id = ?
                "#,
            )
            .bind(candidate.price)
            .bind(candidate.condition.as_str())
            .bind(confidence_str(candidate.condition_confidence))
            .bind(&candidate.description)
            .bind(candidate.warranty_months as i64)
            .bind(candidate.vram_gb.map(|gb| gb as i64))
            .bind(fmt_ts(now))
            .bind(id_text)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;

            tx.commit().await.map_err(StoreError::backend)?;
            return Ok(UpsertOutcome::Updated(id));
        }

        sqlx::query(
            r#"
            INSERT INTO listings (
                id, platform, source_id, title, description,
                category, condition, condition_confidence, brand, model,
                price, currency, warranty_months, vram_gb,
                city, region, url, seller_name,
                posted_date, first_seen, last_seen, active
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(candidate.id.to_string())
        .bind(candidate.platform.as_str())
        .bind(&candidate.source_id)
        .bind(&candidate.title)
        .bind(&candidate.description)
        .bind(candidate.category.as_str())
        .bind(candidate.condition.as_str())
        .bind(confidence_str(candidate.condition_confidence))
        .bind(candidate.brand.as_deref())
        .bind(candidate.model.as_deref())
        .bind(candidate.price)
        .bind(&candidate.currency)
        .bind(candidate.warranty_months as i64)
        .bind(candidate.vram_gb.map(|gb| gb as i64))
        .bind(candidate.city.as_deref())
        .bind(candidate.region.as_deref())
        .bind(candidate.url.as_deref())
        .bind(candidate.seller_name.as_deref())
        .bind(candidate.posted_date.map(fmt_ts))
        .bind(fmt_ts(now))
        .bind(fmt_ts(now))
        .execute(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        tx.commit().await.map_err(StoreError::backend)?;
        Ok(UpsertOutcome::Inserted(candidate.id))
    }

    async fn get(&self, key: &SourceKey) -> StoreResult<Option<Listing>> {
        let row = sqlx::query("SELECT * FROM listings WHERE platform = ? AND source_id = ?")
            .bind(key.platform.as_str())
            .bind(&key.source_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        row.as_ref().map(row_to_listing).transpose()
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        let row = sqlx::query("SELECT * FROM listings WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        row.as_ref().map(row_to_listing).transpose()
    }

    async fn put_score(&self, id: Uuid, score: &Score) -> StoreResult<()> {
        let payload = serde_json::to_string(score)?;
        sqlx::query(
            r#"
            INSERT INTO scores (listing_id, payload) VALUES (?, ?)
            ON CONFLICT(listing_id) DO UPDATE SET payload = excluded.payload
            "#,
        )
        .bind(id.to_string())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn get_score(&self, id: Uuid) -> StoreResult<Option<Score>> {
        let row = sqlx::query("SELECT payload FROM scores WHERE listing_id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        match row {
            Some(row) => {
                let payload: String = row.try_get("payload").map_err(StoreError::backend)?;
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }

    async fn query(
        &self,
        filter: &ListingFilter,
        page: &Page,
        sort: Sort,
    ) -> StoreResult<Vec<ScoredListing>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT l.*, s.payload AS score_payload \
             FROM listings l LEFT JOIN scores s ON s.listing_id = l.id WHERE 1=1",
        );

        if !filter.include_stale {
            qb.push(" AND l.active = 1");
        }
        if let Some(category) = filter.category {
            qb.push(" AND l.category = ").push_bind(category.as_str());
        }
        if let Some(condition) = filter.condition {
            qb.push(" AND l.condition = ").push_bind(condition.as_str());
        }
        if let Some(platform) = filter.platform {
            qb.push(" AND l.platform = ").push_bind(platform.as_str());
        }
        if let Some(city) = &filter.city {
            qb.push(" AND LOWER(l.city) = ").push_bind(city.to_lowercase());
        }
        if let Some(min) = filter.min_price {
            qb.push(" AND l.price >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            qb.push(" AND l.price <= ").push_bind(max);
        }
        if let Some(text) = &filter.text {
            let needle = text.to_lowercase();
            qb.push(" AND (INSTR(LOWER(l.title), ")
                .push_bind(needle.clone())
                .push(") > 0 OR INSTR(LOWER(l.description), ")
                .push_bind(needle)
                .push(") > 0)");
        }

        qb.push(match sort {
            Sort::LastSeenDesc => " ORDER BY l.last_seen DESC",
            Sort::PriceAsc => " ORDER BY l.price ASC",
            Sort::PriceDesc => " ORDER BY l.price DESC",
            Sort::FinalScoreDesc => {
                " ORDER BY json_extract(s.payload, '$.final_score') IS NULL, \
                 json_extract(s.payload, '$.final_score') DESC"
            }
        });

        qb.push(" LIMIT ")
            .push_bind(page.limit.clamp(1, crate::query::MAX_PAGE_SIZE) as i64)
            .push(" OFFSET ")
            .push_bind(page.offset as i64);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            let listing = row_to_listing(row)?;
            let payload: Option<String> =
                row.try_get("score_payload").map_err(StoreError::backend)?;
            let score = payload
                .as_deref()
                .map(serde_json::from_str::<Score>)
                .transpose()?;
            results.push(ScoredListing { listing, score });
        }
        Ok(results)
    }

    async fn scan(&self, include_stale: bool) -> StoreResult<Vec<Listing>> {
        let sql = if include_stale {
            "SELECT * FROM listings"
        } else {
            "SELECT * FROM listings WHERE active = 1"
        };
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        rows.iter().map(row_to_listing).collect()
    }

    async fn count(&self) -> StoreResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM listings")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        let n: i64 = row.try_get("n").map_err(StoreError::backend)?;
        Ok(n as usize)
    }

    async fn mark_stale(&self, platform: Platform, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let result = sqlx::query(
            "UPDATE listings SET active = 0 \
             WHERE platform = ? AND active = 1 AND last_seen < ?",
        )
        .bind(platform.as_str())
        .bind(fmt_ts(cutoff))
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_listing;
    use crate::types::listing::Category;

    #[tokio::test]
    async fn test_insert_roundtrip() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut listing = sample_listing(Category::Gpu, 1500.0);
        listing.brand = Some("nvidia".to_string());
        listing.model = Some("rtx 3070".to_string());
        listing.vram_gb = Some(8);
        listing.city = Some("Tel Aviv".to_string());

        let outcome = store.upsert(&listing).await.unwrap();
        assert!(outcome.is_insert());

        let stored = store.get(&listing.key()).await.unwrap().unwrap();
        assert_eq!(stored.id, listing.id);
        assert_eq!(stored.model.as_deref(), Some("rtx 3070"));
        assert_eq!(stored.vram_gb, Some(8));
        assert_eq!(stored.city.as_deref(), Some("Tel Aviv"));
        assert!(stored.active);
    }

    #[tokio::test]
    async fn test_upsert_merges_and_keeps_first_seen() {
        let store = SqliteStore::in_memory().await.unwrap();
        let listing = sample_listing(Category::Gpu, 1500.0);

        let first = store.upsert(&listing).await.unwrap();
        let first_seen = store.get(&listing.key()).await.unwrap().unwrap().first_seen;

        let mut again = listing.clone();
        again.price = 1400.0;
        let second = store.upsert(&again).await.unwrap();

        assert!(!second.is_insert());
        assert_eq!(first.id(), second.id());
        assert_eq!(store.count().await.unwrap(), 1);

        let merged = store.get(&listing.key()).await.unwrap().unwrap();
        assert_eq!(merged.price, 1400.0);
        assert_eq!(merged.first_seen, first_seen);
        assert!(merged.last_seen >= first_seen);
    }

    #[tokio::test]
    async fn test_score_json_roundtrip() {
        let store = SqliteStore::in_memory().await.unwrap();
        let listing = sample_listing(Category::Gpu, 1500.0);
        let id = store.upsert(&listing).await.unwrap().id();

        let score = crate::scoring::score(
            &listing,
            &crate::ScoringConfig::default(),
            &crate::BenchmarkCatalog::baseline(),
        );
        store.put_score(id, &score).await.unwrap();

        let back = store.get_score(id).await.unwrap().unwrap();
        assert_eq!(back.rvi, score.rvi);
        assert_eq!(back.final_score, score.final_score);
    }

    #[tokio::test]
    async fn test_query_filters_and_sorts() {
        let store = SqliteStore::in_memory().await.unwrap();
        for i in 0..3 {
            let mut listing = sample_listing(Category::Gpu, 1000.0 + i as f64 * 100.0);
            listing.source_id = format!("gpu-{i}");
            listing.title = format!("geforce card {i}");
            store.upsert(&listing).await.unwrap();
        }
        let mut cpu = sample_listing(Category::Cpu, 400.0);
        cpu.source_id = "cpu-1".to_string();
        store.upsert(&cpu).await.unwrap();

        let gpus = store
            .query(
                &ListingFilter::for_category(Category::Gpu),
                &Page::default(),
                Sort::PriceDesc,
            )
            .await
            .unwrap();
        assert_eq!(gpus.len(), 3);
        assert_eq!(gpus[0].listing.price, 1200.0);

        let by_text = store
            .query(
                &ListingFilter::new().with_text("GEFORCE"),
                &Page::default(),
                Sort::LastSeenDesc,
            )
            .await
            .unwrap();
        assert_eq!(by_text.len(), 3);

        let in_range = store
            .query(
                &ListingFilter::new().with_price_range(Some(1050.0), None),
                &Page::default(),
                Sort::PriceAsc,
            )
            .await
            .unwrap();
        assert_eq!(in_range.len(), 2);
    }

    #[tokio::test]
    async fn test_mark_stale() {
        let store = SqliteStore::in_memory().await.unwrap();
        let listing = sample_listing(Category::Gpu, 100.0);
        store.upsert(&listing).await.unwrap();

        // Nothing is old enough yet.
        let marked = store
            .mark_stale(Platform::Yad2, Utc::now() - chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(marked, 0);

        // Everything is older than a future cutoff.
        let marked = store
            .mark_stale(Platform::Yad2, Utc::now() + chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(marked, 1);
        assert!(store.scan(false).await.unwrap().is_empty());
        assert_eq!(store.scan(true).await.unwrap().len(), 1);
    }
}
