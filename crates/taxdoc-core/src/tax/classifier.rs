//! Document-type classification by ordered first-match rules.

use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use super::issuers::IssuerTable;
use super::rules::patterns::{
    FEDERAL_WITHHELD_PHRASE, FORM_1098, INTEREST_PHRASE, W2_BOX_LABELS, W2_HEADER, WAGE_PHRASE,
    WAGES_TIPS_COMPENSATION,
};
use crate::models::document::DocumentType;

/// How a rule decides whether it applies.
enum Predicate {
    /// Form identifier appearing verbatim.
    Contains(&'static str),
    /// Header or box-label regex.
    Matches(&'static Regex),
    /// Content heuristic: either the first pattern, or both of the pair.
    Heuristic {
        any: &'static Regex,
        all: [&'static Regex; 2],
    },
}

impl Predicate {
    fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Contains(token) => text.contains(*token),
            Self::Matches(re) => re.is_match(text),
            Self::Heuristic { any, all } => {
                any.is_match(text) || all.iter().all(|re| re.is_match(text))
            }
        }
    }
}

struct Rule {
    name: &'static str,
    predicate: Predicate,
    label: DocumentType,
}

/// Built-in rules, evaluated top to bottom.
fn builtin_rules() -> Vec<Rule> {
    use DocumentType::*;
    vec![
        Rule {
            name: "W-2 header",
            predicate: Predicate::Matches(&*W2_HEADER),
            label: WageStatement,
        },
        Rule {
            name: "W-2 box labels",
            predicate: Predicate::Matches(&*W2_BOX_LABELS),
            label: WageStatement,
        },
        Rule {
            name: "1099-INT",
            predicate: Predicate::Contains("1099-INT"),
            label: InterestStatement,
        },
        Rule {
            name: "1099-DIV",
            predicate: Predicate::Contains("1099-DIV"),
            label: DividendStatement,
        },
        Rule {
            name: "1099-MISC",
            predicate: Predicate::Contains("1099-MISC"),
            label: MiscCompensation,
        },
        Rule {
            name: "1099-NEC",
            predicate: Predicate::Contains("1099-NEC"),
            label: MiscCompensation,
        },
        Rule {
            name: "1099-R",
            predicate: Predicate::Contains("1099-R"),
            label: RetirementDistribution,
        },
        Rule {
            name: "1098",
            predicate: Predicate::Matches(&*FORM_1098),
            label: MortgageInterest,
        },
        Rule {
            name: "Schedule K-1",
            predicate: Predicate::Contains("Schedule K-1"),
            label: PartnershipShare,
        },
        Rule {
            name: "wage content",
            predicate: Predicate::Heuristic {
                any: &*WAGES_TIPS_COMPENSATION,
                all: [&*WAGE_PHRASE, &*FEDERAL_WITHHELD_PHRASE],
            },
            label: WageStatement,
        },
        Rule {
            name: "interest content",
            predicate: Predicate::Matches(&*INTEREST_PHRASE),
            label: InterestStatement,
        },
    ]
}

/// Assigns a [`DocumentType`] to extracted text.
///
/// Pure: the same text always yields the same type. Non-fallback issuer
/// overrides run before the built-in rules; fallback-only overrides run after
/// them.
pub struct DocumentClassifier {
    issuers: Arc<IssuerTable>,
    rules: Vec<Rule>,
}

impl DocumentClassifier {
    pub fn new(issuers: Arc<IssuerTable>) -> Self {
        Self {
            issuers,
            rules: builtin_rules(),
        }
    }

    pub fn classify(&self, text: &str) -> DocumentType {
        if let Some(entry) = self.issuers.override_for(text) {
            debug!("Classified as {} by issuer override {:?}", entry.forced_type, entry.name);
            return entry.forced_type;
        }

        if let Some(rule) = self.rules.iter().find(|r| r.predicate.is_match(text)) {
            debug!("Classified as {} by rule {:?}", rule.label, rule.name);
            return rule.label;
        }

        if let Some(entry) = self.issuers.fallback_for(text) {
            debug!("Classified as {} by issuer fallback {:?}", entry.forced_type, entry.name);
            return entry.forced_type;
        }

        debug!("No classification rule matched");
        DocumentType::Unclassified
    }
}

impl Default for DocumentClassifier {
    fn default() -> Self {
        Self::new(Arc::new(IssuerTable::empty()))
    }
}
