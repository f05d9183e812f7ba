//! Scoring engine: RVI / PVR / final score.
//!
//! ```text
//! component = cpu·wCPU + gpu·wGPU + other·wOther     (weights sum to 1)
//! RVI       = component × PLS × MLI × CWM × VRAM_penalty
//! PVR       = RVI / price                            (price = 0 → undefined)
//! final     = PVR × 1000
//! ```
//!
//! `score` is a pure function of the listing, the [`ScoringConfig`], and the
//! [`BenchmarkCatalog`]; same inputs always produce the same factors, which
//! is what makes A/B weight comparisons trustworthy. A zero price is not an
//! error here: the score is still produced, just flagged unrankable.

use chrono::Utc;
use tracing::debug;

use crate::rules::BenchmarkCatalog;
use crate::types::config::ScoringConfig;
use crate::types::listing::{Category, Listing};
use crate::types::score::{Score, ScoreBreakdown};

/// Score a listing under an explicit config and benchmark catalog.
pub fn score(listing: &Listing, config: &ScoringConfig, benchmarks: &BenchmarkCatalog) -> Score {
    let (cpu_score, gpu_score, other_score, low_confidence) =
        component_scores(listing, config, benchmarks);

    let component = cpu_score * config.cpu_weight
        + gpu_score * config.gpu_weight
        + other_score * config.other_weight;

    let pls = config.pls(listing.category);
    let mli = config.mli(listing.category);
    let cwm = config.cwm(
        listing.condition,
        listing.condition_confidence,
        listing.warranty_months,
    );

    let vram_penalty_applied = vram_penalty_applies(listing, config);
    let vram_factor = if vram_penalty_applied {
        config.vram_penalty_factor
    } else {
        1.0
    };

    let rvi = component * pls * mli * cwm * vram_factor;

    let (pvr, final_score) = if listing.price > 0.0 {
        let pvr = rvi / listing.price;
        (Some(pvr), Some(pvr * 1000.0))
    } else {
        debug!(key = %listing.key(), "zero price, score marked unrankable");
        (None, None)
    };

    Score {
        rvi,
        pvr,
        final_score,
        vram_penalty_applied,
        low_confidence,
        breakdown: ScoreBreakdown {
            cpu_score,
            gpu_score,
            other_score,
            pls,
            mli,
            cwm,
        },
        computed_at: Utc::now(),
    }
}

/// Benchmark lookups per component slot.
///
/// Returns `(cpu, gpu, other, low_confidence)`. A slot the category does
/// not use stays at zero and does not affect confidence; a slot the
/// category *does* use but the catalog cannot resolve falls back to the
/// configured default and marks the score low-confidence.
fn component_scores(
    listing: &Listing,
    config: &ScoringConfig,
    benchmarks: &BenchmarkCatalog,
) -> (f64, f64, f64, bool) {
    let brand = listing.brand.as_deref();
    let model = listing.model.as_deref();

    let lookup = |table: fn(&BenchmarkCatalog, &str, &str) -> Option<f64>| {
        brand
            .zip(model)
            .and_then(|(brand, model)| table(benchmarks, brand, model))
    };
    let cpu_hit = lookup(BenchmarkCatalog::cpu_score);
    let gpu_hit = lookup(BenchmarkCatalog::gpu_score);

    let default = config.default_component_score;
    match listing.category {
        Category::Cpu => {
            let (cpu, missed) = cpu_hit.map_or((default, true), |s| (s, false));
            (cpu, 0.0, 0.0, missed)
        }
        Category::Gpu => {
            let (gpu, missed) = gpu_hit.map_or((default, true), |s| (s, false));
            (0.0, gpu, 0.0, missed)
        }
        Category::CompleteBuild => {
            // A build gets all three slots; whichever lookup misses is
            // filled with the default and lowers confidence.
            let (cpu, cpu_missed) = cpu_hit.map_or((default, true), |s| (s, false));
            let (gpu, gpu_missed) = gpu_hit.map_or((default, true), |s| (s, false));
            (cpu, gpu, default, cpu_missed || gpu_missed)
        }
        _ => {
            // Commodity parts have no benchmark tables; the default
            // mid-range score stands in and confidence is low.
            (0.0, 0.0, default, true)
        }
    }
}

fn vram_penalty_applies(listing: &Listing, config: &ScoringConfig) -> bool {
    listing.category.carries_gpu()
        && listing
            .vram_gb
            .is_some_and(|gb| gb <= config.vram_threshold_gb)
}
