//! Condition keyword table.
//!
//! Same longest-match scan as the category table. Longest-match matters
//! here even more: "כמו חדש" (like new) contains "חדש" (new), and
//! "brand new" contains "new", so a first-match scan would misgrade used
//! goods as new.

use crate::rules::category::{keyword_hits, tokenize};
use crate::types::listing::Condition;

/// One condition with its match keywords (all lowercase).
#[derive(Debug, Clone, Copy)]
pub struct ConditionRule {
    pub condition: Condition,
    pub keywords: &'static [&'static str],
}

/// Condition rules, best condition first.
pub const CONDITION_RULES: &[ConditionRule] = &[
    ConditionRule {
        condition: Condition::New,
        keywords: &["brand new", "חדש באריזה", "sealed", "new"],
    },
    ConditionRule {
        condition: Condition::LikeNew,
        keywords: &["like new", "כמו חדש", "open box"],
    },
    ConditionRule {
        condition: Condition::Excellent,
        keywords: &["excellent", "מצוין", "מעולה"],
    },
    ConditionRule {
        condition: Condition::Good,
        keywords: &["good condition", "מצב טוב", "good", "טוב"],
    },
    ConditionRule {
        condition: Condition::Fair,
        keywords: &["fair", "average", "סביר"],
    },
    ConditionRule {
        condition: Condition::Poor,
        keywords: &["poor", "bad condition", "worn", "גרוע"],
    },
    ConditionRule {
        condition: Condition::ForParts,
        keywords: &[
            "for parts",
            "not working",
            "broken",
            "faulty",
            "לחלקים",
            "חלקים",
            "לא עובד",
        ],
    },
];

/// Scan normalized lowercase text for a condition keyword.
///
/// Longest keyword wins; ties go to the better condition (earlier rule).
/// `None` means no keyword matched and the caller should assume the
/// lowest-confidence default (`Good`).
pub fn classify_condition(text: &str) -> Option<Condition> {
    let tokens: Vec<&str> = tokenize(text).collect();
    let mut best: Option<(usize, Condition)> = None;

    for rule in CONDITION_RULES {
        for keyword in rule.keywords {
            if !keyword_hits(text, &tokens, keyword) {
                continue;
            }
            let len = keyword.chars().count();
            if best.map_or(true, |(best_len, _)| len > best_len) {
                best = Some((len, rule.condition));
            }
        }
    }

    best.map(|(_, c)| c)
}
