//! Normalization: raw scraper records into canonical [`Listing`]s.
//!
//! `Normalizer` is a pure function of the input record and the static rule
//! tables in [`crate::rules`]; it holds nothing but compiled regexes, so one
//! instance can be shared freely across parallel batch workers.
//!
//! Per-record policy: only a broken identity or an unusable price rejects a
//! record. Everything else degrades: unmatched category text becomes
//! `Other`, an unmatched condition becomes `Good` with a `Defaulted`
//! confidence flag, an unknown city stays `None`, and failed brand/model
//! extraction leaves both fields empty.

use chrono::Utc;
use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{NormalizeError, NormalizeResult};
use crate::rules::{classify_category, classify_condition, lookup_city};
use crate::types::listing::{
    Category, Condition, ConditionConfidence, Listing, Platform, RawRecord,
};

/// Prices above this are treated as typos or scams and rejected.
pub const PRICE_SANITY_CEILING: f64 = 1_000_000.0;

/// Largest VRAM reading we accept as plausible for a consumer GPU.
const VRAM_MAX_GB: u32 = 48;

/// Rule-driven record normalizer.
pub struct Normalizer {
    strip_re: Regex,
    whitespace_re: Regex,
    number_re: Regex,
    intel_re: Regex,
    ryzen_re: Regex,
    nvidia_re: Regex,
    radeon_re: Regex,
    vram_re: Regex,
    warranty_before_re: Regex,
    warranty_after_re: Regex,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Compile all extraction patterns once.
    pub fn new() -> Self {
        Self {
            strip_re: Regex::new(r"[^\w\s.'-]").unwrap(),
            whitespace_re: Regex::new(r"\s+").unwrap(),
            number_re: Regex::new(r"\d+(?:\.\d{1,2})?").unwrap(),
            intel_re: Regex::new(r"\b(i[3579])[\s-]?(\d{4,5}[a-z]{0,2})\b").unwrap(),
            ryzen_re: Regex::new(r"\bryzen\s*([3579])\s*(\d{4}[a-z0-9]{0,3})\b").unwrap(),
            nvidia_re: Regex::new(r"\b(rtx|gtx)\s*(\d{3,4})(?:\s*(ti|super))?\b").unwrap(),
            radeon_re: Regex::new(r"\brx\s*(\d{3,4})(?:\s*(xt|xtx))?\b").unwrap(),
            vram_re: Regex::new(r"\b(\d{1,3})\s*gb\b").unwrap(),
            warranty_before_re: Regex::new(
                r"(?:warranty|אחריות)\D{0,16}?(\d{1,2})\s*(?:months?|חודשים|חודש)",
            )
            .unwrap(),
            warranty_after_re: Regex::new(
                r"(\d{1,2})\s*(?:months?|חודשים|חודש)\s*(?:of\s+)?(?:warranty|אחריות)",
            )
            .unwrap(),
        }
    }

    /// Normalize one raw record into a canonical listing.
    ///
    /// The returned listing carries fresh `first_seen`/`last_seen`
    /// timestamps and a fresh id; the merge store replaces them when the
    /// identity already exists.
    pub fn normalize(&self, raw: &RawRecord) -> NormalizeResult<Listing> {
        let platform_text = raw.platform.trim();
        if platform_text.is_empty() {
            return Err(NormalizeError::MissingIdentity { field: "platform" });
        }
        let platform = Platform::parse(platform_text)
            .ok_or_else(|| NormalizeError::UnknownPlatform(platform_text.to_string()))?;

        let source_id = raw.source_id.trim();
        if source_id.is_empty() {
            return Err(NormalizeError::MissingIdentity { field: "source_id" });
        }

        let price = self.parse_price(&raw.price_text)?;

        let title = self.normalize_text(&raw.title);
        let description = self.normalize_text(&raw.description);
        let haystack = format!("{} {}", title, description).to_lowercase();

        let category = classify_category(&haystack).unwrap_or(Category::Other);
        let (condition, condition_confidence) = match classify_condition(&haystack) {
            Some(condition) => (condition, ConditionConfidence::Matched),
            None => (Condition::Good, ConditionConfidence::Defaulted),
        };

        let (city, region) = match lookup_city(&raw.location_text) {
            Some(entry) => (
                Some(entry.canonical.to_string()),
                Some(entry.region.to_string()),
            ),
            None => (None, None),
        };

        let (brand, model, gpu_match_end) = self.extract_brand_model(category, &haystack);
        let vram_gb = self.extract_vram(category, &title.to_lowercase(), &haystack, gpu_match_end);
        let warranty_months = self.extract_warranty(&haystack);

        debug!(
            platform = %platform,
            source_id,
            category = %category,
            condition = %condition,
            price,
            "record normalized"
        );

        let now = Utc::now();
        Ok(Listing {
            id: Uuid::new_v4(),
            platform,
            source_id: source_id.to_string(),
            title,
            description,
            category,
            condition,
            condition_confidence,
            brand,
            model,
            price,
            currency: detect_currency(&raw.price_text).to_string(),
            warranty_months,
            vram_gb,
            city,
            region,
            url: raw.url.clone(),
            seller_name: raw.seller_name.clone(),
            posted_date: raw.posted_date,
            first_seen: now,
            last_seen: now,
            active: true,
        })
    }

    /// Collapse whitespace and drop symbols, keeping Hebrew/Latin word
    /// characters plus `.`, `'`, and `-` (model numbers, transliterations).
    fn normalize_text(&self, text: &str) -> String {
        let stripped = self.strip_re.replace_all(text, " ");
        self.whitespace_re
            .replace_all(&stripped, " ")
            .trim()
            .to_string()
    }

    /// Parse a price out of free text.
    ///
    /// Strips currency symbols and thousand separators, then takes the
    /// first decimal number. Negative, unparsable, or above
    /// [`PRICE_SANITY_CEILING`] rejects the record; zero is accepted and
    /// handled downstream by the scoring engine.
    fn parse_price(&self, text: &str) -> NormalizeResult<f64> {
        let invalid = || NormalizeError::InvalidPrice {
            text: text.to_string(),
        };

        let cleaned: String = text
            .chars()
            .filter(|c| !matches!(c, '₪' | '$' | '€' | ',') && !c.is_whitespace())
            .collect();

        if cleaned.starts_with('-') {
            return Err(invalid());
        }

        let price = self
            .number_re
            .find(&cleaned)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .ok_or_else(invalid)?;

        if price > PRICE_SANITY_CEILING {
            return Err(invalid());
        }
        Ok(price)
    }

    /// Category-keyed brand/model extraction.
    ///
    /// Returns the brand, the normalized model, and the byte offset just
    /// past a GPU model hit (used to anchor the VRAM scan). Extraction
    /// failure is not an error; both fields stay `None`.
    fn extract_brand_model(
        &self,
        category: Category,
        haystack: &str,
    ) -> (Option<String>, Option<String>, Option<usize>) {
        match category {
            Category::Cpu => {
                let (brand, model) = self.find_cpu(haystack);
                (brand, model, None)
            }
            Category::Gpu => self.find_gpu(haystack),
            Category::CompleteBuild => {
                // The GPU dominates resale value, so it names the build.
                let (brand, model, end) = self.find_gpu(haystack);
                if brand.is_some() {
                    (brand, model, end)
                } else {
                    let (brand, model) = self.find_cpu(haystack);
                    (brand, model, None)
                }
            }
            _ => (None, None, None),
        }
    }

    fn find_cpu(&self, haystack: &str) -> (Option<String>, Option<String>) {
        if let Some(caps) = self.intel_re.captures(haystack) {
            let model = format!("{}-{}", &caps[1], &caps[2]);
            return (Some("intel".to_string()), Some(model));
        }
        if let Some(caps) = self.ryzen_re.captures(haystack) {
            let model = format!("ryzen {} {}", &caps[1], &caps[2]);
            return (Some("amd".to_string()), Some(model));
        }
        (None, None)
    }

    fn find_gpu(&self, haystack: &str) -> (Option<String>, Option<String>, Option<usize>) {
        if let Some(caps) = self.nvidia_re.captures(haystack) {
            let mut model = format!("{} {}", &caps[1], &caps[2]);
            if let Some(suffix) = caps.get(3) {
                model.push(' ');
                model.push_str(suffix.as_str());
            }
            let end = caps.get(0).map(|m| m.end());
            return (Some("nvidia".to_string()), Some(model), end);
        }
        if let Some(caps) = self.radeon_re.captures(haystack) {
            let mut model = format!("rx {}", &caps[1]);
            if let Some(suffix) = caps.get(2) {
                model.push(' ');
                model.push_str(suffix.as_str());
            }
            let end = caps.get(0).map(|m| m.end());
            return (Some("amd".to_string()), Some(model), end);
        }
        (None, None, None)
    }

    /// VRAM extraction, only for GPU-bearing categories.
    ///
    /// Anchored right after the GPU model when one matched (so a build's
    /// "16gb ram" line is not mistaken for VRAM); plain GPU listings fall
    /// back to the first `NN gb` in the title.
    fn extract_vram(
        &self,
        category: Category,
        title_lc: &str,
        haystack: &str,
        gpu_match_end: Option<usize>,
    ) -> Option<u32> {
        if !category.carries_gpu() {
            return None;
        }

        if let Some(end) = gpu_match_end {
            let window: String = haystack[end..].chars().take(24).collect();
            if let Some(gb) = self.first_gb(&window) {
                return Some(gb);
            }
        }

        if category == Category::Gpu {
            return self.first_gb(title_lc);
        }
        None
    }

    fn first_gb(&self, text: &str) -> Option<u32> {
        self.vram_re
            .captures(text)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .filter(|gb| (1..=VRAM_MAX_GB).contains(gb))
    }

    /// Warranty months from phrases like "אחריות 12 חודשים" or
    /// "6 months warranty". Absent means zero.
    fn extract_warranty(&self, haystack: &str) -> u32 {
        self.warranty_before_re
            .captures(haystack)
            .or_else(|| self.warranty_after_re.captures(haystack))
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .unwrap_or(0)
    }
}

fn detect_currency(price_text: &str) -> &'static str {
    if price_text.contains('$') {
        "USD"
    } else if price_text.contains('€') {
        "EUR"
    } else {
        "ILS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gpu_record() -> RawRecord {
        RawRecord::new("yad2", "123")
            .with_title("RTX 3070 8GB")
            .with_price_text("1,500 ₪")
            .with_location("תל אביב")
    }

    #[test]
    fn test_end_to_end_gpu_example() {
        let listing = Normalizer::new().normalize(&gpu_record()).unwrap();
        assert_eq!(listing.platform, Platform::Yad2);
        assert_eq!(listing.source_id, "123");
        assert_eq!(listing.category, Category::Gpu);
        assert_eq!(listing.price, 1500.0);
        assert_eq!(listing.currency, "ILS");
        assert_eq!(listing.city.as_deref(), Some("Tel Aviv"));
        assert_eq!(listing.region.as_deref(), Some("Center"));
        assert_eq!(listing.vram_gb, Some(8));
        assert_eq!(listing.brand.as_deref(), Some("nvidia"));
        assert_eq!(listing.model.as_deref(), Some("rtx 3070"));
    }

    #[test]
    fn test_missing_identity_rejected() {
        let normalizer = Normalizer::new();
        let no_platform = RawRecord::new("", "123").with_price_text("100");
        assert_eq!(
            normalizer.normalize(&no_platform),
            Err(NormalizeError::MissingIdentity { field: "platform" })
        );

        let no_id = RawRecord::new("yad2", "  ").with_price_text("100");
        assert_eq!(
            normalizer.normalize(&no_id),
            Err(NormalizeError::MissingIdentity { field: "source_id" })
        );

        let unknown = RawRecord::new("craigslist", "9").with_price_text("100");
        assert!(matches!(
            normalizer.normalize(&unknown),
            Err(NormalizeError::UnknownPlatform(_))
        ));
    }

    #[test]
    fn test_price_parsing_variants() {
        let normalizer = Normalizer::new();
        assert_eq!(normalizer.parse_price("1,500 ₪").unwrap(), 1500.0);
        assert_eq!(normalizer.parse_price("₪2,345.67").unwrap(), 2345.67);
        assert_eq!(normalizer.parse_price("$300").unwrap(), 300.0);
        assert_eq!(normalizer.parse_price("0 ₪").unwrap(), 0.0);
    }

    #[test]
    fn test_bad_prices_rejected() {
        let normalizer = Normalizer::new();
        for text in ["", "call me", "-500", "9,999,999 ₪"] {
            assert!(
                matches!(
                    normalizer.parse_price(text),
                    Err(NormalizeError::InvalidPrice { .. })
                ),
                "expected InvalidPrice for {text:?}"
            );
        }
    }

    #[test]
    fn test_condition_defaults_with_flag() {
        let listing = Normalizer::new().normalize(&gpu_record()).unwrap();
        assert_eq!(listing.condition, Condition::Good);
        assert_eq!(listing.condition_confidence, ConditionConfidence::Defaulted);

        let described = Normalizer::new()
            .normalize(&gpu_record().with_description("כמו חדש, בקושי בשימוש"))
            .unwrap();
        assert_eq!(described.condition, Condition::LikeNew);
        assert_eq!(described.condition_confidence, ConditionConfidence::Matched);
    }

    #[test]
    fn test_intel_cpu_extraction() {
        let record = RawRecord::new("yad2", "55")
            .with_title("מעבד Intel Core i5-12400F")
            .with_price_text("600 ₪");
        let listing = Normalizer::new().normalize(&record).unwrap();
        assert_eq!(listing.category, Category::Cpu);
        assert_eq!(listing.brand.as_deref(), Some("intel"));
        assert_eq!(listing.model.as_deref(), Some("i5-12400f"));
        assert_eq!(listing.vram_gb, None);
    }

    #[test]
    fn test_ryzen_extraction() {
        let record = RawRecord::new("facebook", "77")
            .with_title("Ryzen 5 5600X processor")
            .with_price_text("550");
        let listing = Normalizer::new().normalize(&record).unwrap();
        assert_eq!(listing.category, Category::Cpu);
        assert_eq!(listing.brand.as_deref(), Some("amd"));
        assert_eq!(listing.model.as_deref(), Some("ryzen 5 5600x"));
    }

    #[test]
    fn test_complete_build_takes_gpu_model_and_anchored_vram() {
        let record = RawRecord::new("yad2", "88")
            .with_title("מחשב גיימינג RTX 3060 Ti 8GB")
            .with_description("16gb ram, 1tb nvme")
            .with_price_text("3,200 ₪");
        let listing = Normalizer::new().normalize(&record).unwrap();
        assert_eq!(listing.category, Category::CompleteBuild);
        assert_eq!(listing.model.as_deref(), Some("rtx 3060 ti"));
        // VRAM comes from right after the GPU model, not the RAM line.
        assert_eq!(listing.vram_gb, Some(8));
    }

    #[test]
    fn test_build_without_gpu_mention_has_no_vram() {
        let record = RawRecord::new("yad2", "89")
            .with_title("מחשב נייח משרדי")
            .with_description("16gb ram, 512gb ssd")
            .with_price_text("900 ₪");
        let listing = Normalizer::new().normalize(&record).unwrap();
        assert_eq!(listing.category, Category::CompleteBuild);
        assert_eq!(listing.vram_gb, None);
        assert_eq!(listing.brand, None);
    }

    #[test]
    fn test_warranty_extraction() {
        let normalizer = Normalizer::new();
        let hebrew = RawRecord::new("yad2", "1")
            .with_description("עם אחריות 12 חודשים")
            .with_price_text("100");
        assert_eq!(normalizer.normalize(&hebrew).unwrap().warranty_months, 12);

        let english = RawRecord::new("yad2", "2")
            .with_description("6 months warranty remaining")
            .with_price_text("100");
        assert_eq!(normalizer.normalize(&english).unwrap().warranty_months, 6);

        let none = RawRecord::new("yad2", "3").with_price_text("100");
        assert_eq!(normalizer.normalize(&none).unwrap().warranty_months, 0);
    }

    #[test]
    fn test_unknown_city_kept_as_none() {
        let record = gpu_record().with_location("middle of nowhere");
        let listing = Normalizer::new().normalize(&record).unwrap();
        assert_eq!(listing.city, None);
        assert_eq!(listing.region, None);
    }

    #[test]
    fn test_currency_detection() {
        assert_eq!(detect_currency("1,500 ₪"), "ILS");
        assert_eq!(detect_currency("$300"), "USD");
        assert_eq!(detect_currency("€250"), "EUR");
        assert_eq!(detect_currency("800"), "ILS");
    }

    #[test]
    fn test_unclassified_title_is_other() {
        let record = RawRecord::new("yad2", "4")
            .with_title("vintage typewriter")
            .with_price_text("100 ₪");
        let listing = Normalizer::new().normalize(&record).unwrap();
        assert_eq!(listing.category, Category::Other);
        assert_eq!(listing.brand, None);
        assert_eq!(listing.model, None);
    }

    proptest! {
        #[test]
        fn prop_parse_price_never_panics(text in ".{0,64}") {
            let _ = Normalizer::new().parse_price(&text);
        }

        #[test]
        fn prop_normalize_never_panics(title in ".{0,48}", desc in ".{0,48}") {
            let record = RawRecord::new("yad2", "p")
                .with_title(title)
                .with_description(desc)
                .with_price_text("100 ₪");
            let _ = Normalizer::new().normalize(&record);
        }
    }
}
