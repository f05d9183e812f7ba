//! Domain data types: listings, scores, and scoring configuration.

pub mod config;
pub mod listing;
pub mod score;

pub use config::ScoringConfig;
pub use listing::{
    Category, Condition, ConditionConfidence, Listing, Platform, RawRecord, SourceKey,
};
pub use score::{Score, ScoreBreakdown};
