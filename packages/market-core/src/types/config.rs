//! Scoring configuration.
//!
//! Every weight, threshold, and market-factor curve the scoring engine uses
//! lives here and is passed explicitly into each `score` call. There is no
//! hidden global: the same listing scored under two configs yields two
//! deterministic, independently reproducible results, which keeps A/B
//! comparison of weight sets a plain unit test.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::listing::{Category, Condition, ConditionConfidence};

/// Tunable parameters for the scoring engine.
///
/// `Default` is the documented baseline; see DESIGN.md for the rationale
/// behind the curve values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Weight of the CPU benchmark score in the component blend
    pub cpu_weight: f64,

    /// Weight of the GPU benchmark score in the component blend
    pub gpu_weight: f64,

    /// Weight of everything else in the component blend
    pub other_weight: f64,

    /// Stand-in component score when a benchmark lookup misses
    pub default_component_score: f64,

    /// VRAM at or below this many GB triggers the penalty
    pub vram_threshold_gb: u32,

    /// Multiplier applied when the VRAM penalty triggers
    pub vram_penalty_factor: f64,

    /// Platform / upgrade-path factor per category (PLS). Categories
    /// absent from the table default to 1.0.
    pub platform_factors: IndexMap<Category, f64>,

    /// Market liquidity factor per category (MLI). Categories absent from
    /// the table default to 1.0.
    pub liquidity_factors: IndexMap<Category, f64>,

    /// Condition factor table, monotone in `Condition::rank`
    pub condition_factors: IndexMap<Condition, f64>,

    /// Multiplier applied to CWM when the condition was defaulted rather
    /// than keyword-matched
    pub defaulted_condition_discount: f64,

    /// Warranty months at which the warranty bonus saturates
    pub warranty_cap_months: u32,

    /// CWM bonus at the warranty cap; interpolated linearly below it
    pub warranty_max_bonus: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            cpu_weight: 0.4,
            gpu_weight: 0.5,
            other_weight: 0.1,
            default_component_score: 50.0,
            vram_threshold_gb: 8,
            vram_penalty_factor: 0.85,
            platform_factors: IndexMap::from([
                (Category::Cpu, 1.05),
                (Category::Gpu, 1.05),
                (Category::Motherboard, 1.1),
                (Category::Ram, 1.0),
                (Category::Storage, 1.0),
                (Category::Psu, 0.95),
                (Category::Cooling, 0.9),
                (Category::Case, 0.85),
                (Category::CompleteBuild, 1.1),
                (Category::Other, 0.9),
            ]),
            liquidity_factors: IndexMap::from([
                (Category::Cpu, 1.1),
                (Category::Gpu, 1.15),
                (Category::Motherboard, 0.95),
                (Category::Ram, 1.05),
                (Category::Storage, 1.05),
                (Category::Psu, 0.9),
                (Category::Cooling, 0.85),
                (Category::Case, 0.8),
                (Category::CompleteBuild, 1.0),
                (Category::Other, 0.9),
            ]),
            condition_factors: IndexMap::from([
                (Condition::New, 1.1),
                (Condition::LikeNew, 1.05),
                (Condition::Excellent, 1.0),
                (Condition::Good, 0.9),
                (Condition::Fair, 0.75),
                (Condition::Poor, 0.6),
                (Condition::ForParts, 0.4),
            ]),
            defaulted_condition_discount: 0.95,
            warranty_cap_months: 24,
            warranty_max_bonus: 0.15,
        }
    }
}

impl ScoringConfig {
    /// Baseline config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the component weights. Callers are responsible for keeping
    /// the three weights summing to 1.
    pub fn with_weights(mut self, cpu: f64, gpu: f64, other: f64) -> Self {
        self.cpu_weight = cpu;
        self.gpu_weight = gpu;
        self.other_weight = other;
        self
    }

    /// Override the VRAM penalty threshold and factor.
    pub fn with_vram_penalty(mut self, threshold_gb: u32, factor: f64) -> Self {
        self.vram_threshold_gb = threshold_gb;
        self.vram_penalty_factor = factor;
        self
    }

    /// Override a single platform factor.
    pub fn with_platform_factor(mut self, category: Category, factor: f64) -> Self {
        self.platform_factors.insert(category, factor);
        self
    }

    /// Override a single liquidity factor.
    pub fn with_liquidity_factor(mut self, category: Category, factor: f64) -> Self {
        self.liquidity_factors.insert(category, factor);
        self
    }

    /// Override a single condition factor.
    pub fn with_condition_factor(mut self, condition: Condition, factor: f64) -> Self {
        self.condition_factors.insert(condition, factor);
        self
    }

    /// Platform / upgrade-path factor for a category.
    pub fn pls(&self, category: Category) -> f64 {
        self.platform_factors.get(&category).copied().unwrap_or(1.0)
    }

    /// Market liquidity factor for a category.
    pub fn mli(&self, category: Category) -> f64 {
        self.liquidity_factors.get(&category).copied().unwrap_or(1.0)
    }

    /// Condition/warranty multiplier.
    ///
    /// Condition factor from the table, times a warranty bonus interpolated
    /// linearly from 1.0 at zero months to `1.0 + warranty_max_bonus` at the
    /// cap, times the defaulted-condition discount when the normalizer had
    /// to assume a condition.
    pub fn cwm(
        &self,
        condition: Condition,
        confidence: ConditionConfidence,
        warranty_months: u32,
    ) -> f64 {
        let base = self
            .condition_factors
            .get(&condition)
            .copied()
            .unwrap_or(1.0);

        let capped = warranty_months.min(self.warranty_cap_months) as f64;
        let warranty = if self.warranty_cap_months == 0 {
            1.0
        } else {
            1.0 + self.warranty_max_bonus * capped / self.warranty_cap_months as f64
        };

        let discount = match confidence {
            ConditionConfidence::Matched => 1.0,
            ConditionConfidence::Defaulted => self.defaulted_condition_discount,
        };

        base * warranty * discount
    }

    /// Whether the component weights sum to 1 (within float tolerance).
    pub fn weights_normalized(&self) -> bool {
        (self.cpu_weight + self.gpu_weight + self.other_weight - 1.0).abs() < 1e-9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_weights_sum_to_one() {
        assert!(ScoringConfig::default().weights_normalized());
    }

    #[test]
    fn test_condition_factors_monotone_in_rank() {
        let config = ScoringConfig::default();
        let mut factors: Vec<(u8, f64)> = config
            .condition_factors
            .iter()
            .map(|(c, f)| (c.rank(), *f))
            .collect();
        factors.sort_by_key(|(rank, _)| *rank);
        for pair in factors.windows(2) {
            assert!(
                pair[0].1 <= pair[1].1,
                "better condition must never score lower: {:?}",
                pair
            );
        }
    }

    #[test]
    fn test_cwm_increases_with_warranty() {
        let config = ScoringConfig::default();
        let none = config.cwm(Condition::Good, ConditionConfidence::Matched, 0);
        let some = config.cwm(Condition::Good, ConditionConfidence::Matched, 12);
        let capped = config.cwm(Condition::Good, ConditionConfidence::Matched, 24);
        let beyond = config.cwm(Condition::Good, ConditionConfidence::Matched, 60);
        assert!(none < some);
        assert!(some < capped);
        assert_eq!(capped, beyond, "warranty bonus saturates at the cap");
    }

    #[test]
    fn test_cwm_discounts_defaulted_condition() {
        let config = ScoringConfig::default();
        let matched = config.cwm(Condition::Good, ConditionConfidence::Matched, 0);
        let defaulted = config.cwm(Condition::Good, ConditionConfidence::Defaulted, 0);
        assert!(defaulted < matched);
        assert!((defaulted / matched - config.defaulted_condition_discount).abs() < 1e-12);
    }

    #[test]
    fn test_missing_table_entry_defaults_to_unity() {
        let mut config = ScoringConfig::default();
        config.platform_factors.clear();
        config.liquidity_factors.clear();
        assert_eq!(config.pls(Category::Gpu), 1.0);
        assert_eq!(config.mli(Category::Gpu), 1.0);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = ScoringConfig::default().with_weights(0.3, 0.6, 0.1);
        let json = serde_json::to_string(&config).unwrap();
        let back: ScoringConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cpu_weight, 0.3);
        assert_eq!(back.pls(Category::Gpu), config.pls(Category::Gpu));
    }
}
