//! Rule based resolution of builtin entities over normalized tokens

mod datetime;
mod numbers;
mod quantities;

use std::ops::Range;

use chrono::{DateTime, FixedOffset};

use crate::language::Language;
use crate::nlu_utils::range::ranges_overlap;
use crate::ontology::{BuiltinEntityKind, SlotValue};
use crate::utils::deduplicate_overlapping_items;

#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    /// Range of token indexes
    pub tokens: Range<usize>,
    pub kind: BuiltinEntityKind,
    pub value: SlotValue,
    pub alternatives: Vec<SlotValue>,
}

impl RuleMatch {
    pub fn new(tokens: Range<usize>, kind: BuiltinEntityKind, value: SlotValue) -> Self {
        Self {
            tokens,
            kind,
            value,
            alternatives: vec![],
        }
    }

    pub fn with_alternatives(self, alternatives: Vec<SlotValue>) -> Self {
        Self {
            alternatives,
            ..self
        }
    }
}

/// Extracts the builtin entities of the requested kinds
///
/// Matches of a given kind never overlap: the longest one wins, then the leftmost one. Matches
/// of different kinds may overlap.
pub fn extract_rule_matches(
    tokens: &[String],
    language: Language,
    reference_time: DateTime<FixedOffset>,
    kinds: &[BuiltinEntityKind],
) -> Vec<RuleMatch> {
    let mut all_matches = vec![];
    for kind in kinds {
        let matches = match kind {
            BuiltinEntityKind::Number => quantities::numbers(tokens, language),
            BuiltinEntityKind::Ordinal => quantities::ordinals(tokens, language),
            BuiltinEntityKind::Percentage => quantities::percentages(tokens, language),
            BuiltinEntityKind::Temperature => quantities::temperatures(tokens, language),
            BuiltinEntityKind::AmountOfMoney => quantities::amounts_of_money(tokens, language),
            BuiltinEntityKind::Duration => quantities::durations(tokens, language),
            BuiltinEntityKind::Datetime => datetime::datetimes(tokens, language, reference_time),
        };
        all_matches.extend(deduplicate_overlapping_items(
            matches,
            |lhs, rhs| ranges_overlap(&lhs.tokens, &rhs.tokens),
            |rule_match| (-(rule_match.tokens.len() as i64), rule_match.tokens.start),
        ));
    }
    all_matches.sort_by_key(|rule_match| (rule_match.tokens.start, rule_match.kind));
    all_matches
}
