use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::utils::{EntityName, IntentName, SlotName};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeterministicParserModel {
    pub language_code: String,
    pub patterns: HashMap<IntentName, Vec<String>>,
    pub group_names_to_slot_names: HashMap<String, SlotName>,
    pub slot_names_to_entities: HashMap<IntentName, HashMap<SlotName, EntityName>>,
    #[serde(default)]
    pub stop_words_whitelist: HashMap<IntentName, Vec<String>>,
    pub config: DeterministicParserConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeterministicParserConfig {
    #[serde(default)]
    pub ignore_stop_words: bool,
}

/// Exact match parser, keyed by canonical forms of the training utterances
///
/// A canonical form is the lowercased sequence of normalized tokens, separated by spaces, in
/// which every entity is replaced by its placeholder, such as `"make me % snipsnumber % cups"`.
/// Each value holds the index of the intent in `intents_names` and the indexes in
/// `slots_names` of the slots of the entities, in order of appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupParserModel {
    pub language_code: String,
    pub slots_names: Vec<SlotName>,
    pub intents_names: Vec<IntentName>,
    pub map: HashMap<String, (usize, Vec<usize>)>,
    #[serde(default)]
    pub entity_scopes: Vec<GroupedEntityScope>,
    pub config: LookupParserConfig,
}

/// Entities to look for when parsing with any intent of `intent_group`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedEntityScope {
    pub intent_group: Vec<IntentName>,
    pub entity_scope: EntityScope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityScope {
    pub builtin: Vec<EntityName>,
    pub custom: Vec<EntityName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupParserConfig {
    #[serde(default)]
    pub ignore_stop_words: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilisticParserModel {
    pub slot_fillers: Vec<SlotFillerMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotFillerMetadata {
    pub intent: IntentName,
    pub slot_filler_name: String,
}
