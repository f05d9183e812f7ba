//! Static rule tables: category and condition keywords, the city
//! gazetteer, and the benchmark catalog.
//!
//! Tables are plain data, separated from the matching code so each can be
//! tested on its own.

pub mod benchmarks;
pub mod category;
pub mod condition;
pub mod gazetteer;

pub use benchmarks::BenchmarkCatalog;
pub use category::{classify_category, longest_match, CategoryRule, KeywordMatch, CATEGORY_RULES};
pub use condition::{classify_condition, ConditionRule, CONDITION_RULES};
pub use gazetteer::{lookup_city, CityEntry, CITY_GAZETTEER};
