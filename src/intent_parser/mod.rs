mod deterministic_intent_parser;
mod lookup_intent_parser;
mod probabilistic_intent_parser;

use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

pub use self::deterministic_intent_parser::DeterministicIntentParser;
pub use self::lookup_intent_parser::LookupIntentParser;
pub use self::probabilistic_intent_parser::ProbabilisticIntentParser;
use crate::errors::*;
use crate::language::Language;
use crate::models::ProcessingUnitMetadata;
use crate::nlu_utils::range::ranges_overlap;
use crate::nlu_utils::token::tokenize;
use crate::ontology::IntentClassifierResult;
use crate::resources::SharedResources;
pub use crate::slot_utils::InternalSlot;
use crate::utils::{deduplicate_overlapping_items, load_json_file, IntentName};

/// Intent and raw slots found by an intent parser, before slot resolution
#[derive(Debug, Clone, PartialEq)]
pub struct InternalParsingResult {
    pub intent: IntentClassifierResult,
    pub slots: Vec<InternalSlot>,
}

impl InternalParsingResult {
    pub fn new(
        intent_name: Option<IntentName>,
        confidence_score: f32,
        slots: Vec<InternalSlot>,
    ) -> Self {
        Self {
            intent: IntentClassifierResult {
                intent_name,
                confidence_score,
            },
            slots,
        }
    }

    /// Null intent with full confidence
    pub fn empty() -> Self {
        Self::new(None, 1.0, vec![])
    }
}

pub trait IntentParser: Send + Sync {
    /// Parses `input`, considering only the intents of `intents_filter` when provided
    fn parse(
        &self,
        input: &str,
        intents_filter: Option<&HashSet<IntentName>>,
    ) -> Result<InternalParsingResult>;

    /// Ranks the intents of `intents_filter` along with the null intent, by decreasing
    /// confidence
    fn get_intents(
        &self,
        input: &str,
        intents_filter: Option<&HashSet<IntentName>>,
    ) -> Result<Vec<IntentClassifierResult>>;

    fn get_slots(&self, input: &str, intent: &str) -> Result<Vec<InternalSlot>>;
}

/// Instantiates the intent parser persisted in `path`, as named by its metadata file
pub fn build_intent_parser<P: AsRef<Path>>(
    path: P,
    shared_resources: Arc<SharedResources>,
) -> Result<Box<dyn IntentParser>> {
    let path = path.as_ref();
    let metadata: ProcessingUnitMetadata =
        load_json_file(&path.join("metadata.json"), "intent parser metadata")?;
    let parser: Box<dyn IntentParser> = match metadata {
        ProcessingUnitMetadata::DeterministicIntentParser => Box::new(
            DeterministicIntentParser::from_path(path, shared_resources)?,
        ),
        ProcessingUnitMetadata::ProbabilisticIntentParser => Box::new(
            ProbabilisticIntentParser::from_path(path, shared_resources)?,
        ),
        ProcessingUnitMetadata::LookupIntentParser => {
            Box::new(LookupIntentParser::from_path(path, shared_resources)?)
        }
        other => {
            return Err(NluError::CorruptModel(format!(
                "expected an intent parser in {:?} but found {:?}",
                path, other
            ))
            .into())
        }
    };
    Ok(parser)
}

/// Removes overlapping slots, keeping the longest ones first and then the earliest ones
///
/// The remaining slots are sorted by start offset.
pub fn deduplicate_overlapping_slots(
    slots: Vec<InternalSlot>,
    language: Language,
) -> Vec<InternalSlot> {
    let mut kept_slots = deduplicate_overlapping_items(
        slots,
        |lhs, rhs| ranges_overlap(&lhs.char_range, &rhs.char_range),
        |slot| {
            let size = tokenize(&slot.value, language).len() + slot.value.chars().count();
            (Reverse(size), slot.char_range.start)
        },
    );
    kept_slots.sort_by_key(|slot| slot.char_range.start);
    kept_slots
}
