//! Category keyword table and the longest-match scanner.
//!
//! The table is plain data so it can be unit-tested apart from the matching
//! code. Rules are ordered: when two keywords of equal length match, the
//! earlier rule wins. The scanner itself prefers the *longest* matching
//! keyword overall, so `"כרטיס מסך"` beats `"מחשב"` inside the same title
//! and an RTX listing is a GPU even when the ad also says "gaming pc".

use crate::types::listing::Category;

/// One category with its match keywords (all lowercase).
///
/// Single-word keywords match whole tokens only; keywords containing a
/// space or punctuation match as substrings of the normalized text. That
/// keeps `"ram"` from firing inside "program" while `"כרטיס מסך"` still
/// matches as a phrase.
#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: &'static [&'static str],
}

/// Category rules in priority order. Specific component categories come
/// before `CompleteBuild` so its broad keywords ("מחשב", "pc") only win
/// when nothing more specific matched at equal or greater length.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::Cpu,
        keywords: &[
            "cpu",
            "processor",
            "מעבד",
            "intel core",
            "ryzen",
            "threadripper",
        ],
    },
    CategoryRule {
        category: Category::Gpu,
        keywords: &[
            "gpu",
            "graphics card",
            "video card",
            "כרטיס מסך",
            "geforce",
            "nvidia",
            "radeon",
            "rtx",
            "gtx",
        ],
    },
    CategoryRule {
        category: Category::Motherboard,
        keywords: &["motherboard", "mainboard", "mobo", "לוח אם"],
    },
    CategoryRule {
        category: Category::Ram,
        keywords: &["ram", "memory", "זיכרון", "ddr4", "ddr5", "dimm", "sodimm"],
    },
    CategoryRule {
        category: Category::Storage,
        keywords: &[
            "ssd",
            "nvme",
            "hdd",
            "hard drive",
            "דיסק קשיח",
            "אחסון",
            "m.2",
        ],
    },
    CategoryRule {
        category: Category::Psu,
        keywords: &["psu", "power supply", "ספק כוח"],
    },
    CategoryRule {
        category: Category::Cooling,
        keywords: &["cooler", "cooling", "קירור", "radiator", "heatsink", "aio", "fan"],
    },
    CategoryRule {
        category: Category::Case,
        keywords: &["case", "chassis", "מארז", "mid tower", "full tower", "tower"],
    },
    CategoryRule {
        category: Category::CompleteBuild,
        keywords: &[
            "complete build",
            "gaming pc",
            "desktop pc",
            "full system",
            "מחשב גיימינג",
            "מחשב נייח",
            "מחשב",
            "pc",
        ],
    },
];

/// A single keyword hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordMatch {
    pub category: Category,
    pub keyword: &'static str,
}

/// Scan `text` (already lowercased/normalized) against a rule table.
///
/// Returns the rule owning the longest matching keyword; length ties go to
/// the rule listed first. `None` when nothing matches, which callers map to
/// `Category::Other`.
pub fn longest_match(text: &str, rules: &[CategoryRule]) -> Option<KeywordMatch> {
    let tokens: Vec<&str> = tokenize(text).collect();
    let mut best: Option<(usize, KeywordMatch)> = None;

    for rule in rules {
        for keyword in rule.keywords {
            if !keyword_hits(text, &tokens, keyword) {
                continue;
            }
            let len = keyword.chars().count();
            // Strictly-greater keeps the earlier rule on ties.
            if best.map_or(true, |(best_len, _)| len > best_len) {
                best = Some((
                    len,
                    KeywordMatch {
                        category: rule.category,
                        keyword,
                    },
                ));
            }
        }
    }

    best.map(|(_, m)| m)
}

/// Classify against the built-in table.
pub fn classify_category(text: &str) -> Option<Category> {
    longest_match(text, CATEGORY_RULES).map(|m| m.category)
}

pub(crate) fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\u{05F4}')
        .filter(|t| !t.is_empty())
}

pub(crate) fn keyword_hits(text: &str, tokens: &[&str], keyword: &str) -> bool {
    if keyword.chars().all(|c| c.is_alphanumeric()) {
        tokens.iter().any(|t| *t == keyword)
    } else {
        text.contains(keyword)
    }
}
