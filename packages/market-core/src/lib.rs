//! Secondary-Market Listing Core
//!
//! The normalization → dedup/upsert → scoring → aggregation pipeline behind
//! a computer-parts resale scout. Scraper adapters hand in raw free-text
//! records; this crate turns them into canonical listings, merges repeat
//! sightings by `(platform, source_id)`, prices each listing with the
//! RVI/PVR formula, and serves filtered queries and time-windowed stats to
//! the transport layer.
//!
//! # Design Philosophy
//!
//! - Rule-driven, not model-driven: classification is keyword/regex tables,
//!   unit-testable apart from the matching code
//! - Degrade, don't reject: unknown category, condition, city, or benchmark
//!   all fall back with confidence flags; only a broken identity or price
//!   drops a record
//! - No hidden config: every `score` call takes its [`ScoringConfig`]
//!   explicitly, so weight-set A/B comparison is a plain unit test
//! - Per-key serialization, not global locks: concurrent upserts contend
//!   only when they target the same identity
//!
//! # Usage
//!
//! ```rust,ignore
//! use market_core::{
//!     ingest_batch, BenchmarkCatalog, IngestConfig, MemoryStore, Normalizer,
//!     ScoringConfig,
//! };
//!
//! let store = MemoryStore::new();
//! let normalizer = Normalizer::new();
//! let report = ingest_batch(
//!     records,
//!     &normalizer,
//!     &store,
//!     &ScoringConfig::default(),
//!     &BenchmarkCatalog::baseline(),
//!     &IngestConfig::default(),
//! )
//! .await;
//! println!("{} inserted, {} updated", report.inserted, report.updated);
//! ```
//!
//! # Modules
//!
//! - [`types`] - Listings, scores, and scoring configuration
//! - [`rules`] - Static keyword tables, gazetteer, benchmark catalog
//! - [`normalize`] - Raw record → canonical listing
//! - [`scoring`] - RVI / PVR / final score
//! - [`pipeline`] - Batch ingestion with per-key locking
//! - [`aggregate`] - Grouped stats and daily trends
//! - [`query`] - Filter/pagination/sort model
//! - [`stores`] - Storage backends (memory, sqlite behind a feature)
//! - [`testing`] - Factories and fault-injection helpers

pub mod aggregate;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod rules;
pub mod scoring;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{NormalizeError, NormalizeResult, StoreError, StoreResult};
pub use types::{
    config::ScoringConfig,
    listing::{Category, Condition, ConditionConfidence, Listing, Platform, RawRecord, SourceKey},
    score::{Score, ScoreBreakdown},
};

// Re-export the pipeline surface
pub use normalize::Normalizer;
pub use pipeline::{ingest_batch, IngestConfig, IngestReport, KeyedLocks};
pub use scoring::score;

// Re-export the read side
pub use aggregate::{aggregate_by, aggregate_store, trend, trend_store, Dimension, GroupStats, TrendPoint};
pub use query::{ListingFilter, Page, ScoredListing, Sort, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

// Re-export rule tables and storage
pub use rules::BenchmarkCatalog;
pub use stores::MemoryStore;
pub use traits::{ListingStore, UpsertOutcome};

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;
