//! Canonical listing types and the raw scraper handoff record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marketplace a listing was observed on.
///
/// Together with the platform-native `source_id` this forms the sole dedup
/// key for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Yad2,
    Facebook,
}

impl Platform {
    /// Parse a platform name as produced by scraper adapters.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "yad2" => Some(Self::Yad2),
            "facebook" => Some(Self::Facebook),
            _ => None,
        }
    }

    /// Stable lowercase name, used as the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yad2 => "yad2",
            Self::Facebook => "facebook",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product category, assigned by the rule-based classifier.
///
/// Closed set: free text that matches no category keyword maps to `Other`,
/// never to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cpu,
    Gpu,
    Motherboard,
    Ram,
    Storage,
    Psu,
    Cooling,
    Case,
    CompleteBuild,
    Other,
}

impl Category {
    /// Stable lowercase name, used as the storage representation and as the
    /// aggregation group key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::Motherboard => "motherboard",
            Self::Ram => "ram",
            Self::Storage => "storage",
            Self::Psu => "psu",
            Self::Cooling => "cooling",
            Self::Case => "case",
            Self::CompleteBuild => "complete_build",
            Self::Other => "other",
        }
    }

    /// Parse the storage representation back into the enum.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cpu" => Some(Self::Cpu),
            "gpu" => Some(Self::Gpu),
            "motherboard" => Some(Self::Motherboard),
            "ram" => Some(Self::Ram),
            "storage" => Some(Self::Storage),
            "psu" => Some(Self::Psu),
            "cooling" => Some(Self::Cooling),
            "case" => Some(Self::Case),
            "complete_build" => Some(Self::CompleteBuild),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Whether listings of this category can carry a dedicated GPU, and
    /// therefore a `vram_gb` reading and the VRAM penalty.
    pub fn carries_gpu(&self) -> bool {
        matches!(self, Self::Gpu | Self::CompleteBuild)
    }

    /// All categories, in classifier priority order.
    pub fn all() -> &'static [Category] {
        &[
            Self::Cpu,
            Self::Gpu,
            Self::Motherboard,
            Self::Ram,
            Self::Storage,
            Self::Psu,
            Self::Cooling,
            Self::Case,
            Self::CompleteBuild,
            Self::Other,
        ]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seller-declared (or inferred) product condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    Excellent,
    Good,
    Fair,
    Poor,
    ForParts,
}

impl Condition {
    /// Stable lowercase name, used as the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::LikeNew => "like_new",
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::ForParts => "for_parts",
        }
    }

    /// Parse the storage representation back into the enum.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "like_new" => Some(Self::LikeNew),
            "excellent" => Some(Self::Excellent),
            "good" => Some(Self::Good),
            "fair" => Some(Self::Fair),
            "poor" => Some(Self::Poor),
            "for_parts" => Some(Self::ForParts),
            _ => None,
        }
    }

    /// Ordinal rank, `ForParts` = 0 up to `New` = 6. The condition factor
    /// table must be monotone in this rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::ForParts => 0,
            Self::Poor => 1,
            Self::Fair => 2,
            Self::Good => 3,
            Self::Excellent => 4,
            Self::LikeNew => 5,
            Self::New => 6,
        }
    }

    /// All conditions, best first.
    pub fn all() -> &'static [Condition] {
        &[
            Self::New,
            Self::LikeNew,
            Self::Excellent,
            Self::Good,
            Self::Fair,
            Self::Poor,
            Self::ForParts,
        ]
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the condition was determined during normalization.
///
/// `Defaulted` means no condition keyword matched and the lowest-confidence
/// default (`Good`) was assumed; the scoring engine discounts the
/// condition/warranty multiplier accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionConfidence {
    Matched,
    Defaulted,
}

/// Dedup identity of a listing: one real-world ad across repeated scrapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceKey {
    pub platform: Platform,
    pub source_id: String,
}

impl SourceKey {
    pub fn new(platform: Platform, source_id: impl Into<String>) -> Self {
        Self {
            platform,
            source_id: source_id.into(),
        }
    }
}

impl std::fmt::Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.platform, self.source_id)
    }
}

/// Canonical listing record.
///
/// Created by the normalizer from a [`RawRecord`], then owned by the merge
/// store. Listings are never deleted; repeated observations of the same
/// [`SourceKey`] merge into the existing row, and listings absent from a
/// platform past the retention window are only marked inactive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Storage row id, assigned at first insert
    pub id: Uuid,

    /// Marketplace the listing was observed on
    pub platform: Platform,

    /// Platform-native listing id; `(platform, source_id)` is globally unique
    pub source_id: String,

    /// Normalized title text
    pub title: String,

    /// Normalized description text
    pub description: String,

    /// Classified product category
    pub category: Category,

    /// Classified product condition
    pub condition: Condition,

    /// Whether the condition was keyword-matched or defaulted
    pub condition_confidence: ConditionConfidence,

    /// Extracted brand, e.g. "nvidia" (None when extraction failed)
    pub brand: Option<String>,

    /// Extracted model, e.g. "rtx 3070" (None when extraction failed)
    pub model: Option<String>,

    /// Asking price, always >= 0
    pub price: f64,

    /// ISO currency code
    pub currency: String,

    /// Advertised warranty, months remaining (0 when not mentioned)
    pub warranty_months: u32,

    /// Video memory in GB; only meaningful for gpu / complete_build
    pub vram_gb: Option<u32>,

    /// Canonical city name (gazetteer hit), None when unrecognized
    pub city: Option<String>,

    /// Region derived from the gazetteer entry
    pub region: Option<String>,

    /// Original listing URL
    pub url: Option<String>,

    /// Seller display name as scraped
    pub seller_name: Option<String>,

    /// Date the ad was posted, when the platform exposed it
    pub posted_date: Option<DateTime<Utc>>,

    /// First time this identity was observed; immutable after insert
    pub first_seen: DateTime<Utc>,

    /// Most recent observation; advances on every merge
    pub last_seen: DateTime<Utc>,

    /// False once the listing fell out of the platform's set past retention
    pub active: bool,
}

impl Listing {
    /// The dedup key for this listing.
    pub fn key(&self) -> SourceKey {
        SourceKey::new(self.platform, self.source_id.clone())
    }

    /// Merge a fresh observation of the same identity into this row.
    ///
    /// Only the mutable fields move: price, condition (with its confidence),
    /// description, warranty, VRAM, and `last_seen`. `id`, `first_seen`, and
    /// the identity pair never change, preserving the time-on-market signal.
    pub fn merge_observation(&mut self, incoming: &Listing, now: DateTime<Utc>) {
        debug_assert_eq!(self.key(), incoming.key());

        self.price = incoming.price;
        self.condition = incoming.condition;
        self.condition_confidence = incoming.condition_confidence;
        self.description = incoming.description.clone();
        self.warranty_months = incoming.warranty_months;
        self.vram_gb = incoming.vram_gb;
        self.last_seen = now;
        self.active = true;
    }

    /// Valid for price aggregation and ranking.
    pub fn has_valid_price(&self) -> bool {
        self.price > 0.0
    }
}

/// Raw listing record as handed off by a scraper adapter.
///
/// The adapter's retry/pagination mechanics are outside this crate; by the
/// time a record arrives here it is plain text fields. Only `platform` and
/// `source_id` are required; everything else degrades gracefully during
/// normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    pub platform: String,
    pub source_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price_text: String,
    #[serde(default)]
    pub location_text: String,
    #[serde(default)]
    pub posted_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub seller_name: Option<String>,
}

impl RawRecord {
    /// Create a record with just its identity pair.
    pub fn new(platform: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            source_id: source_id.into(),
            ..Default::default()
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the raw price text, e.g. `"1,500 ₪"`.
    pub fn with_price_text(mut self, price_text: impl Into<String>) -> Self {
        self.price_text = price_text.into();
        self
    }

    /// Set the raw location text.
    pub fn with_location(mut self, location_text: impl Into<String>) -> Self {
        self.location_text = location_text.into();
        self
    }

    /// Set the posting date.
    pub fn with_posted_date(mut self, posted: DateTime<Utc>) -> Self {
        self.posted_date = Some(posted);
        self
    }

    /// Set the listing URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the seller name.
    pub fn with_seller(mut self, seller: impl Into<String>) -> Self {
        self.seller_name = Some(seller.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse_roundtrip() {
        assert_eq!(Platform::parse("yad2"), Some(Platform::Yad2));
        assert_eq!(Platform::parse("  Facebook "), Some(Platform::Facebook));
        assert_eq!(Platform::parse("ebay"), None);
        assert_eq!(Platform::parse(Platform::Yad2.as_str()), Some(Platform::Yad2));
    }

    #[test]
    fn test_category_parse_roundtrip() {
        for cat in Category::all() {
            assert_eq!(Category::parse(cat.as_str()), Some(*cat));
        }
        assert_eq!(Category::parse("complete_build"), Some(Category::CompleteBuild));
        assert_eq!(Category::parse("bogus"), None);
    }

    #[test]
    fn test_condition_rank_ordering() {
        let ranks: Vec<u8> = Condition::all().iter().map(|c| c.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(ranks, sorted, "Condition::all() must be best-first");
    }

    #[test]
    fn test_carries_gpu() {
        assert!(Category::Gpu.carries_gpu());
        assert!(Category::CompleteBuild.carries_gpu());
        assert!(!Category::Ram.carries_gpu());
    }

    #[test]
    fn test_source_key_display() {
        let key = SourceKey::new(Platform::Yad2, "123");
        assert_eq!(key.to_string(), "yad2:123");
    }
}
