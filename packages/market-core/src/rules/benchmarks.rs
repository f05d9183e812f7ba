//! Benchmark score catalog for CPUs and GPUs.
//!
//! Scores are relative resale-market standings on a 0..=100 scale, keyed by
//! normalized `brand model`. A miss is never an error: the scoring engine
//! substitutes the configured default mid-range score and flags the result
//! low-confidence.

use std::collections::HashMap;

/// Baseline CPU scores, `(brand, model, score)`.
const CPU_SCORES: &[(&str, &str, f64)] = &[
    ("intel", "i3-12100f", 72.0),
    ("intel", "i5-12400f", 85.0),
    ("intel", "i5-13600k", 93.0),
    ("intel", "i7-12700k", 92.0),
    ("intel", "i7-13700k", 95.0),
    ("intel", "i9-12900k", 96.0),
    ("intel", "i9-13900k", 98.0),
    ("amd", "ryzen 5 3600", 78.0),
    ("amd", "ryzen 5 5600x", 87.0),
    ("amd", "ryzen 7 5800x", 91.0),
    ("amd", "ryzen 7 5800x3d", 94.0),
    ("amd", "ryzen 7 7800x3d", 98.0),
    ("amd", "ryzen 9 5950x", 96.0),
];

/// Baseline GPU scores, `(brand, model, score)`.
const GPU_SCORES: &[(&str, &str, f64)] = &[
    ("nvidia", "gtx 1060", 58.0),
    ("nvidia", "gtx 1660", 68.0),
    ("nvidia", "gtx 1080", 72.0),
    ("nvidia", "rtx 2060", 75.0),
    ("nvidia", "rtx 3060", 83.0),
    ("nvidia", "rtx 3060 ti", 87.0),
    ("nvidia", "rtx 3070", 92.0),
    ("nvidia", "rtx 3080", 96.0),
    ("nvidia", "rtx 3090", 98.0),
    ("nvidia", "rtx 4070", 95.0),
    ("nvidia", "rtx 4080", 98.0),
    ("amd", "rx 580", 55.0),
    ("amd", "rx 6600", 78.0),
    ("amd", "rx 6700 xt", 86.0),
    ("amd", "rx 6800 xt", 93.0),
];

/// In-memory benchmark lookup tables.
#[derive(Debug, Clone)]
pub struct BenchmarkCatalog {
    cpus: HashMap<String, f64>,
    gpus: HashMap<String, f64>,
}

impl Default for BenchmarkCatalog {
    fn default() -> Self {
        Self::baseline()
    }
}

impl BenchmarkCatalog {
    /// Empty catalog; every lookup will miss.
    pub fn empty() -> Self {
        Self {
            cpus: HashMap::new(),
            gpus: HashMap::new(),
        }
    }

    /// The built-in baseline tables.
    pub fn baseline() -> Self {
        let mut catalog = Self::empty();
        for (brand, model, score) in CPU_SCORES {
            catalog.insert_cpu(brand, model, *score);
        }
        for (brand, model, score) in GPU_SCORES {
            catalog.insert_gpu(brand, model, *score);
        }
        catalog
    }

    /// Add or replace a CPU entry.
    pub fn insert_cpu(&mut self, brand: &str, model: &str, score: f64) {
        self.cpus.insert(Self::key(brand, model), score);
    }

    /// Add or replace a GPU entry.
    pub fn insert_gpu(&mut self, brand: &str, model: &str, score: f64) {
        self.gpus.insert(Self::key(brand, model), score);
    }

    /// CPU benchmark score for a normalized brand+model pair.
    pub fn cpu_score(&self, brand: &str, model: &str) -> Option<f64> {
        self.cpus.get(&Self::key(brand, model)).copied()
    }

    /// GPU benchmark score for a normalized brand+model pair.
    pub fn gpu_score(&self, brand: &str, model: &str) -> Option<f64> {
        self.gpus.get(&Self::key(brand, model)).copied()
    }

    fn key(brand: &str, model: &str) -> String {
        format!("{} {}", brand.trim().to_lowercase(), model.trim().to_lowercase())
    }
}
