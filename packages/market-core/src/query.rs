//! Read-side query model: filters, pagination, and sort order.
//!
//! The matching and ordering logic lives here as pure functions so the
//! in-memory store, the SQL backends, and the tests all share one
//! semantics.

use serde::{Deserialize, Serialize};

use crate::types::listing::{Category, Condition, Listing, Platform};
use crate::types::score::Score;

/// Default page size when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Hard ceiling on page size; larger requests are clamped.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Filter over stored listings. Empty filter matches every active listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingFilter {
    pub category: Option<Category>,
    pub condition: Option<Condition>,
    pub platform: Option<Platform>,

    /// Canonical city name, compared case-insensitively
    pub city: Option<String>,

    pub min_price: Option<f64>,
    pub max_price: Option<f64>,

    /// Case-insensitive substring search over title and description
    pub text: Option<String>,

    /// Include listings marked stale; off by default
    #[serde(default)]
    pub include_stale: bool,
}

impl ListingFilter {
    /// Filter matching all active listings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter to one category.
    pub fn for_category(category: Category) -> Self {
        Self {
            category: Some(category),
            ..Default::default()
        }
    }

    /// Set the condition filter.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Set the platform filter.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Set the city filter.
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Set an inclusive price range; pass `None` to leave a bound open.
    pub fn with_price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Set the free-text search term.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Also match stale listings.
    pub fn including_stale(mut self) -> Self {
        self.include_stale = true;
        self
    }

    /// Whether a listing passes this filter.
    pub fn matches(&self, listing: &Listing) -> bool {
        if !self.include_stale && !listing.active {
            return false;
        }
        if self.category.is_some_and(|c| c != listing.category) {
            return false;
        }
        if self.condition.is_some_and(|c| c != listing.condition) {
            return false;
        }
        if self.platform.is_some_and(|p| p != listing.platform) {
            return false;
        }
        if let Some(city) = &self.city {
            match &listing.city {
                Some(listing_city) if listing_city.eq_ignore_ascii_case(city) => {}
                _ => return false,
            }
        }
        if self.min_price.is_some_and(|min| listing.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| listing.price > max) {
            return false;
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let haystack =
                format!("{} {}", listing.title, listing.description).to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// Offset/limit pagination with a clamped page size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    /// Create a page, clamping the limit to `1..=MAX_PAGE_SIZE`.
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

/// Query result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sort {
    /// Most recently observed first (the default)
    #[default]
    LastSeenDesc,
    PriceAsc,
    PriceDesc,
    /// Best deal first; unrankable scores sort last
    FinalScoreDesc,
}

/// A listing with its current score, as returned by queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredListing {
    pub listing: Listing,
    pub score: Option<Score>,
}

/// Order scored listings in place.
pub fn sort_listings(results: &mut [ScoredListing], sort: Sort) {
    match sort {
        Sort::LastSeenDesc => {
            results.sort_by(|a, b| b.listing.last_seen.cmp(&a.listing.last_seen));
        }
        Sort::PriceAsc => {
            results.sort_by(|a, b| total_cmp(a.listing.price, b.listing.price));
        }
        Sort::PriceDesc => {
            results.sort_by(|a, b| total_cmp(b.listing.price, a.listing.price));
        }
        Sort::FinalScoreDesc => {
            results.sort_by(|a, b| {
                let a_score = a.score.as_ref().and_then(|s| s.final_score);
                let b_score = b.score.as_ref().and_then(|s| s.final_score);
                match (a_score, b_score) {
                    (Some(a), Some(b)) => total_cmp(b, a),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            });
        }
    }
}

/// Apply offset/limit to an already-ordered result set.
pub fn paginate(results: Vec<ScoredListing>, page: &Page) -> Vec<ScoredListing> {
    results
        .into_iter()
        .skip(page.offset)
        .take(page.limit.clamp(1, MAX_PAGE_SIZE))
        .collect()
}

fn total_cmp(a: f64, b: f64) -> std::cmp::Ordering {
    a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
}
