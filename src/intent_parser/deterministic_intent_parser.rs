use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use failure::ResultExt;
use itertools::Itertools;
use log::{debug, info};
use regex::{Regex, RegexBuilder};

use crate::errors::*;
use crate::intent_classifier::entity_placeholder;
use crate::language::Language;
use crate::models::DeterministicParserModel;
use crate::nlu_utils::range::convert_to_char_range;
use crate::nlu_utils::string::substring_with_char_range;
use crate::nlu_utils::token::tokenize;
use crate::ontology::{BuiltinEntityKind, IntentClassifierResult};
use crate::resources::SharedResources;
use crate::slot_utils::*;
use crate::utils::{
    load_json_file, replace_entities, EntityName, IntentName, MatchedEntity, SlotName,
};

use super::{deduplicate_overlapping_slots, IntentParser, InternalParsingResult};

/// Intent parser matching the input against the regex patterns generated from the
/// training utterances
pub struct DeterministicIntentParser {
    language: Language,
    regexes_per_intent: BTreeMap<IntentName, Vec<Regex>>,
    group_names_to_slot_names: HashMap<String, SlotName>,
    slot_names_to_entities: HashMap<IntentName, HashMap<SlotName, EntityName>>,
    stop_words: HashSet<String>,
    specific_stop_words: HashMap<IntentName, HashSet<String>>,
    entity_scopes: HashMap<IntentName, (Vec<BuiltinEntityKind>, Vec<EntityName>)>,
    shared_resources: Arc<SharedResources>,
}

impl DeterministicIntentParser {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        info!(
            "Loading deterministic intent parser ({:?}) ...",
            path.as_ref()
        );
        let model: DeterministicParserModel = load_json_file(
            &path.as_ref().join("intent_parser.json"),
            "deterministic intent parser",
        )?;
        let parser = Self::new(model, shared_resources)?;
        info!("Deterministic intent parser loaded");
        Ok(parser)
    }
}

impl DeterministicIntentParser {
    pub fn new(
        model: DeterministicParserModel,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        let language: Language = model.language_code.parse()?;
        let regexes_per_intent = compile_regexes_per_intent(model.patterns)?;
        check_group_names(
            &regexes_per_intent,
            &model.group_names_to_slot_names,
            &model.slot_names_to_entities,
        )?;
        let entity_scopes = model
            .slot_names_to_entities
            .iter()
            .map(|(intent, mapping)| {
                let builtin_entities = mapping
                    .values()
                    .flat_map(|entity| BuiltinEntityKind::from_identifier(entity).ok())
                    .sorted()
                    .dedup()
                    .collect();
                let custom_entities = mapping
                    .values()
                    .filter(|entity| BuiltinEntityKind::from_identifier(entity).is_err())
                    .cloned()
                    .sorted()
                    .dedup()
                    .collect();
                (intent.to_string(), (builtin_entities, custom_entities))
            })
            .collect();
        let stop_words = if model.config.ignore_stop_words {
            shared_resources.stop_words.clone()
        } else {
            HashSet::new()
        };
        let specific_stop_words = model
            .stop_words_whitelist
            .into_iter()
            .map(|(intent, intent_stop_words)| {
                (
                    intent,
                    stop_words
                        .difference(&intent_stop_words.into_iter().collect())
                        .cloned()
                        .collect(),
                )
            })
            .collect();
        Ok(DeterministicIntentParser {
            language,
            regexes_per_intent,
            group_names_to_slot_names: model.group_names_to_slot_names,
            slot_names_to_entities: model.slot_names_to_entities,
            stop_words,
            specific_stop_words,
            entity_scopes,
            shared_resources,
        })
    }
}

impl IntentParser for DeterministicIntentParser {
    fn parse(
        &self,
        input: &str,
        intents_filter: Option<&HashSet<IntentName>>,
    ) -> Result<InternalParsingResult> {
        debug!("Extracting intents and slots with deterministic intent parser...");
        let result = self
            .parse_top_intents(input, 1, intents_filter)?
            .into_iter()
            .next()
            // an utterance matching several intents is ambiguous
            .filter(|res| res.intent.confidence_score > 0.5)
            .unwrap_or_else(InternalParsingResult::empty);
        debug!("Intent found: '{:?}'", result.intent.intent_name);
        debug!("{} slots extracted", result.slots.len());
        Ok(result)
    }

    fn get_intents(
        &self,
        input: &str,
        intents_filter: Option<&HashSet<IntentName>>,
    ) -> Result<Vec<IntentClassifierResult>> {
        let nb_intents = self.regexes_per_intent.len();
        let mut top_intents: Vec<IntentClassifierResult> = self
            .parse_top_intents(input, nb_intents, intents_filter)?
            .into_iter()
            .map(|res| res.intent)
            .collect();
        let matched_intents: HashSet<String> = top_intents
            .iter()
            .filter_map(|res| res.intent_name.clone())
            .collect();
        for intent in self.regexes_per_intent.keys() {
            let in_scope = intents_filter
                .map(|filter| filter.contains(intent))
                .unwrap_or(true);
            if in_scope && !matched_intents.contains(intent) {
                top_intents.push(IntentClassifierResult {
                    intent_name: Some(intent.to_string()),
                    confidence_score: 0.0,
                });
            }
        }
        // Patterns never match the null intent
        top_intents.push(IntentClassifierResult {
            intent_name: None,
            confidence_score: 0.0,
        });
        Ok(top_intents)
    }

    fn get_slots(&self, input: &str, intent: &str) -> Result<Vec<InternalSlot>> {
        if !self.regexes_per_intent.contains_key(intent) {
            return Err(NluError::UnknownIntent(intent.to_string()).into());
        }
        let filter: HashSet<IntentName> = vec![intent.to_string()].into_iter().collect();
        self.parse(input, Some(&filter)).map(|result| result.slots)
    }
}

impl DeterministicIntentParser {
    fn parse_top_intents(
        &self,
        input: &str,
        top_n: usize,
        intents_filter: Option<&HashSet<IntentName>>,
    ) -> Result<Vec<InternalParsingResult>> {
        let mut results = vec![];
        let empty_scope = (vec![], vec![]);
        let intents_in_scope = self.regexes_per_intent.iter().filter(|(intent, _)| {
            intents_filter
                .map(|filter| filter.contains(*intent))
                .unwrap_or(true)
        });

        for (intent, regexes) in intents_in_scope {
            let (builtin_scope, custom_scope) =
                self.entity_scopes.get(intent).unwrap_or(&empty_scope);
            let builtin_entities = self
                .shared_resources
                .builtin_entity_parser
                .extract_entities(input, Some(builtin_scope.as_slice()), 0)?
                .into_iter()
                .map(|entity| entity.into());

            let custom_entities = self
                .shared_resources
                .custom_entity_parser
                .extract_entities(input, Some(custom_scope.as_slice()), 0)?
                .into_iter()
                .map(|entity| entity.into());

            let mut matched_entities: Vec<MatchedEntity> = vec![];
            matched_entities.extend(builtin_entities);
            matched_entities.extend(custom_entities);

            let (ranges_mapping, formatted_input) =
                replace_entities(input, matched_entities, |entity_name| {
                    format!("%{}%", entity_placeholder(entity_name))
                });
            let cleaned_input = self.preprocess_text(input, intent);
            let cleaned_formatted_input = self.preprocess_text(&formatted_input, intent);
            if let Some(matching_result) = regexes.iter().find_map(|regex| {
                self.get_matching_result(input, &cleaned_input, regex, intent, None)
                    .or_else(|| {
                        self.get_matching_result(
                            input,
                            &cleaned_formatted_input,
                            regex,
                            intent,
                            Some(&ranges_mapping),
                        )
                    })
            }) {
                results.push(matching_result);
            }
        }

        // Ambiguous matches favor the results having fewer slots
        let weights = results
            .iter()
            .map(|res| 1. / (1. + res.slots.len() as f32))
            .collect::<Vec<_>>();
        let total_weight: f32 = weights.iter().sum();

        let mut results: Vec<InternalParsingResult> = results
            .into_iter()
            .zip(weights.into_iter())
            .map(|(mut res, weight)| {
                res.intent.confidence_score = weight / total_weight;
                res
            })
            .collect();
        results.sort_by(|res1, res2| {
            res2.intent
                .confidence_score
                .partial_cmp(&res1.intent.confidence_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_n);
        Ok(results)
    }

    /// Blanks out the stop words of `string`, preserving its char offsets
    fn preprocess_text(&self, string: &str, intent: &str) -> String {
        let stop_words = self
            .specific_stop_words
            .get(intent)
            .unwrap_or(&self.stop_words);
        let tokens = tokenize(string, self.language);
        let mut current_idx = 0;
        let mut cleaned_string = String::with_capacity(string.len());
        for token in tokens {
            let prefix_length = token.char_range.start - current_idx;
            cleaned_string.extend((0..prefix_length).map(|_| ' '));
            if stop_words.contains(&token.normalized_value()) {
                cleaned_string.extend(token.value.chars().map(|_| ' '));
            } else {
                cleaned_string.push_str(&token.value);
            }
            current_idx = token.char_range.end;
        }
        let suffix_length = string.chars().count() - current_idx;
        cleaned_string.extend((0..suffix_length).map(|_| ' '));
        cleaned_string
    }

    fn get_matching_result(
        &self,
        input: &str,
        formatted_input: &str,
        regex: &Regex,
        intent: &str,
        entities_ranges_mapping: Option<&HashMap<Range<usize>, Range<usize>>>,
    ) -> Option<InternalParsingResult> {
        let caps = regex.captures(formatted_input)?;
        let slots = caps
            .iter()
            .zip(regex.capture_names())
            .skip(1)
            .filter_map(|(opt_match, opt_group_name)| opt_match.zip(opt_group_name))
            .filter_map(|(a_match, group_name)| {
                let slot_name = self.group_names_to_slot_names.get(group_prefix(group_name))?;
                let entity = self.slot_names_to_entities.get(intent)?.get(slot_name)?;
                let byte_range = a_match.start()..a_match.end();
                let mut char_range = convert_to_char_range(formatted_input, &byte_range);
                if let Some(ranges_mapping) = entities_ranges_mapping {
                    char_range = ranges_mapping.get(&char_range).cloned().unwrap_or_else(|| {
                        let shift = get_range_shift(&char_range, ranges_mapping);
                        let range_start = (char_range.start as i64 + shift) as usize;
                        let range_end = (char_range.end as i64 + shift) as usize;
                        range_start..range_end
                    });
                }
                let value = substring_with_char_range(input, &char_range);
                Some(InternalSlot {
                    value,
                    char_range,
                    entity: entity.to_string(),
                    slot_name: slot_name.to_string(),
                })
            })
            .collect();
        let deduplicated_slots = deduplicate_overlapping_slots(slots, self.language);
        Some(InternalParsingResult::new(
            Some(intent.to_string()),
            1.0,
            deduplicated_slots,
        ))
    }
}

/// Patterns may reuse a slot several times, in which case the groups are named
/// `group0`, `group0_2`, ...
fn group_prefix(group_name: &str) -> &str {
    group_name.split('_').next().unwrap_or(group_name)
}

fn compile_regexes_per_intent(
    patterns: HashMap<IntentName, Vec<String>>,
) -> Result<BTreeMap<IntentName, Vec<Regex>>> {
    patterns
        .into_iter()
        .map(|(intent, patterns)| {
            let regexes = patterns
                .into_iter()
                .map(|p| {
                    RegexBuilder::new(&p)
                        .case_insensitive(true)
                        .build()
                        .with_context(|_| {
                            NluError::CorruptModel(format!(
                                "invalid pattern of intent '{}'",
                                intent
                            ))
                        })
                        .map_err(failure::Error::from)
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((intent, regexes))
        })
        .collect()
}

fn check_group_names(
    regexes_per_intent: &BTreeMap<IntentName, Vec<Regex>>,
    group_names_to_slot_names: &HashMap<String, SlotName>,
    slot_names_to_entities: &HashMap<IntentName, HashMap<SlotName, EntityName>>,
) -> Result<()> {
    for (intent, regexes) in regexes_per_intent {
        for group_name in regexes.iter().flat_map(|regex| regex.capture_names().flatten()) {
            let slot_name = group_names_to_slot_names
                .get(group_prefix(group_name))
                .ok_or_else(|| {
                    NluError::CorruptModel(format!(
                        "unknown group '{}' in patterns of intent '{}'",
                        group_name, intent
                    ))
                })?;
            let has_entity = slot_names_to_entities
                .get(intent)
                .map(|mapping| mapping.contains_key(slot_name))
                .unwrap_or(false);
            if !has_entity {
                return Err(NluError::CorruptModel(format!(
                    "slot '{}' of intent '{}' has no entity",
                    slot_name, intent
                ))
                .into());
            }
        }
    }
    Ok(())
}

fn get_range_shift(
    matched_range: &Range<usize>,
    ranges_mapping: &HashMap<Range<usize>, Range<usize>>,
) -> i64 {
    let mut shift: i64 = 0;
    let mut previous_replaced_range_end: usize = 0;
    let match_start = matched_range.start;
    for (replaced_range, orig_range) in ranges_mapping.iter() {
        if replaced_range.end <= match_start && replaced_range.end > previous_replaced_range_end {
            previous_replaced_range_end = replaced_range.end;
            shift = orig_range.end as i64 - replaced_range.end as i64;
        }
    }
    shift
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]

    use std::iter::FromIterator;

    use maplit::hashmap;
    use serde_json::json;

    use super::*;
    use crate::entity_parser::{CustomEntity, CustomEntityParser};
    use crate::ontology::*;
    use crate::testutils::*;

    /// Builds an english model out of the json fields which differ from one test to another
    fn model(
        patterns: serde_json::Value,
        group_names_to_slot_names: serde_json::Value,
        slot_names_to_entities: serde_json::Value,
        ignore_stop_words: bool,
    ) -> DeterministicParserModel {
        model_with_whitelist(
            patterns,
            group_names_to_slot_names,
            slot_names_to_entities,
            ignore_stop_words,
            json!({}),
        )
    }

    fn model_with_whitelist(
        patterns: serde_json::Value,
        group_names_to_slot_names: serde_json::Value,
        slot_names_to_entities: serde_json::Value,
        ignore_stop_words: bool,
        stop_words_whitelist: serde_json::Value,
    ) -> DeterministicParserModel {
        serde_json::from_value(json!({
            "language_code": "en",
            "patterns": patterns,
            "group_names_to_slot_names": group_names_to_slot_names,
            "slot_names_to_entities": slot_names_to_entities,
            "stop_words_whitelist": stop_words_whitelist,
            "config": {"ignore_stop_words": ignore_stop_words}
        }))
        .unwrap()
    }

    /// Two intents without slots: `MakeCoffee` on "brew coffee now", `MakeTea` on "brew tea now"
    fn beverages_model(ignore_stop_words: bool) -> DeterministicParserModel {
        model(
            json!({
                "MakeCoffee": [r"^\s*brew\s*coffee\s*now\s*$"],
                "MakeTea": [r"^\s*brew\s*tea\s*now\s*$"]
            }),
            json!({}),
            json!({"MakeCoffee": {}, "MakeTea": {}}),
            ignore_stop_words,
        )
    }

    fn parser_with_stop_words(
        model: DeterministicParserModel,
        stop_words: &[&str],
    ) -> DeterministicIntentParser {
        let resources = SharedResourcesBuilder::default()
            .stop_words(stop_words.iter().map(|word| word.to_string()).collect())
            .build();
        DeterministicIntentParser::new(model, Arc::new(resources)).unwrap()
    }

    fn scope(intents: &[&str]) -> HashSet<IntentName> {
        intents.iter().map(|intent| intent.to_string()).collect()
    }

    fn number(value: &str, range: Range<usize>, number: f64) -> BuiltinEntity {
        BuiltinEntity {
            value: value.to_string(),
            range,
            entity: SlotValue::Number(NumberValue { value: number }),
            alternatives: vec![],
            entity_kind: BuiltinEntityKind::Number,
        }
    }

    fn slot(value: &str, char_range: Range<usize>, entity: &str, slot_name: &str) -> InternalSlot {
        InternalSlot {
            value: value.to_string(),
            char_range,
            entity: entity.to_string(),
            slot_name: slot_name.to_string(),
        }
    }

    fn intent(name: Option<&str>, confidence_score: f32) -> IntentClassifierResult {
        IntentClassifierResult {
            intent_name: name.map(|name| name.to_string()),
            confidence_score,
        }
    }

    #[test]
    fn test_load_from_path() {
        // Given
        let parser_path = fixture_engine_dir().join("deterministic_intent_parser");
        let parser =
            DeterministicIntentParser::from_path(parser_path, load_fixture_shared_resources())
                .unwrap();

        // When
        let result = parser.parse("make me two cups of coffee", None).unwrap();

        // Then
        assert_eq!(Some("MakeCoffee".to_string()), result.intent.intent_name);
        assert_eq!(
            vec![slot("two", 8..11, "snips/number", "number_of_cups")],
            result.slots
        );
    }

    #[test]
    fn test_parse_intent() {
        // Given
        let parser = parser_with_stop_words(beverages_model(false), &[]);

        // When
        let result = parser.parse("Brew tea now", None).unwrap();

        // Then
        assert_eq!(
            InternalParsingResult::new(Some("MakeTea".to_string()), 1.0, vec![]),
            result
        );
    }

    #[test]
    fn test_parse_intent_outside_of_scope_returns_empty_result() {
        // Given
        let parser = parser_with_stop_words(beverages_model(false), &[]);

        // When
        let result = parser
            .parse("brew tea now", Some(&scope(&["MakeCoffee"])))
            .unwrap();

        // Then
        assert_eq!(InternalParsingResult::empty(), result);
    }

    #[test]
    fn test_parse_intent_ignores_stop_words() {
        // Given
        let parser = parser_with_stop_words(beverages_model(true), &["please", "the"]);

        // When
        let result = parser.parse("please brew the tea now", None).unwrap();

        // Then
        assert_eq!(Some("MakeTea".to_string()), result.intent.intent_name);
    }

    #[test]
    fn test_stop_words_are_kept_when_not_ignored() {
        // Given
        let parser = parser_with_stop_words(beverages_model(false), &["please"]);

        // When
        let result = parser.parse("please brew tea now", None).unwrap();

        // Then
        assert_eq!(InternalParsingResult::empty(), result);
    }

    #[test]
    fn test_stop_words_whitelist_is_specific_to_intent() {
        // Given
        let model = model_with_whitelist(
            json!({
                "MakeCoffee": [r"^\s*coffee\s*please\s*$"],
                "MakeTea": [r"^\s*coffee\s*$"]
            }),
            json!({}),
            json!({"MakeCoffee": {}, "MakeTea": {}}),
            true,
            json!({"MakeCoffee": ["please"]}),
        );
        let parser = parser_with_stop_words(model, &["please"]);

        // When
        let coffee_result = parser
            .parse("coffee please", Some(&scope(&["MakeCoffee"])))
            .unwrap();
        let tea_result = parser
            .parse("coffee please", Some(&scope(&["MakeTea"])))
            .unwrap();

        // Then
        assert_eq!(Some("MakeCoffee".to_string()), coffee_result.intent.intent_name);
        assert_eq!(Some("MakeTea".to_string()), tea_result.intent.intent_name);
    }

    #[test]
    fn test_parse_slots_with_entity_placeholders() {
        // Given
        let text = "make me two hot cups of tea";
        let model = model(
            json!({
                "MakeTea": [
                    r"^\s*make\s*me\s*(?P<group0>%SNIPSNUMBER%)\s*(?P<group1>%TEMPERATURE%)\s*cups?\s*of\s*tea\s*$"
                ]
            }),
            json!({"group0": "number_of_cups", "group1": "beverage_temperature"}),
            json!({
                "MakeTea": {
                    "number_of_cups": "snips/number",
                    "beverage_temperature": "Temperature"
                }
            }),
            false,
        );
        let builtin_entity_parser = MockedBuiltinEntityParser::from_iter(vec![(
            text.to_string(),
            vec![number("two", 8..11, 2.0)],
        )]);
        let custom_entity_parser = MockedCustomEntityParser::from_iter(vec![(
            text.to_string(),
            vec![CustomEntity {
                value: "hot".to_string(),
                resolved_value: "hot".to_string(),
                alternative_resolved_values: vec![],
                range: 12..15,
                entity_identifier: "Temperature".to_string(),
            }],
        )]);
        let resources = SharedResourcesBuilder::default()
            .builtin_entity_parser(builtin_entity_parser)
            .custom_entity_parser(custom_entity_parser)
            .build();
        let parser = DeterministicIntentParser::new(model, Arc::new(resources)).unwrap();

        // When
        let result = parser.parse(text, None).unwrap();

        // Then
        assert_eq!(Some("MakeTea".to_string()), result.intent.intent_name);
        assert_eq!(
            vec![
                slot("two", 8..11, "snips/number", "number_of_cups"),
                slot("hot", 12..15, "Temperature", "beverage_temperature"),
            ],
            result.slots
        );
    }

    #[test]
    fn test_parse_slot_used_twice_in_pattern() {
        // Given
        let text = "add one sugar and one milk";
        let model = model(
            json!({
                "Sweeten": [
                    r"^\s*add\s*(?P<group0>%SNIPSNUMBER%)\s*sugar\s*and\s*(?P<group0_2>%SNIPSNUMBER%)\s*milk\s*$"
                ]
            }),
            json!({"group0": "quantity"}),
            json!({"Sweeten": {"quantity": "snips/number"}}),
            false,
        );
        let builtin_entity_parser = MockedBuiltinEntityParser::from_iter(vec![(
            text.to_string(),
            vec![number("one", 4..7, 1.0), number("one", 18..21, 1.0)],
        )]);
        let resources = SharedResourcesBuilder::default()
            .builtin_entity_parser(builtin_entity_parser)
            .build();
        let parser = DeterministicIntentParser::new(model, Arc::new(resources)).unwrap();

        // When
        let result = parser.parse(text, None).unwrap();

        // Then
        let expected_result = InternalParsingResult::new(
            Some("Sweeten".to_string()),
            1.0,
            vec![
                slot("one", 4..7, "snips/number", "quantity"),
                slot("one", 18..21, "snips/number", "quantity"),
            ],
        );
        assert_eq!(expected_result, result);
    }

    #[test]
    fn test_ambiguous_utterance_is_not_parsed() {
        // Given
        let text = "order tomorrow";
        let model = model(
            json!({
                "OrderBeverage": [r"^\s*(?P<group0>%ORDER%)\s*tomorrow\s*$"],
                "ScheduleDelivery": [r"^\s*order\s*(?P<group1>%SNIPSDATETIME%)\s*$"]
            }),
            json!({"group0": "action", "group1": "date"}),
            json!({
                "OrderBeverage": {"action": "Order"},
                "ScheduleDelivery": {"date": "snips/datetime"}
            }),
            false,
        );
        let builtin_entity_parser = MockedBuiltinEntityParser::from_iter(vec![(
            text.to_string(),
            vec![BuiltinEntity {
                value: "tomorrow".to_string(),
                range: 6..14,
                entity: SlotValue::InstantTime(InstantTimeValue {
                    value: "2021-03-02 00:00:00 +01:00".to_string(),
                    grain: Grain::Day,
                    precision: Precision::Exact,
                }),
                alternatives: vec![],
                entity_kind: BuiltinEntityKind::Datetime,
            }],
        )]);

        struct ScopedCustomEntityParser;

        impl CustomEntityParser for ScopedCustomEntityParser {
            fn extract_entities(
                &self,
                sentence: &str,
                filter_entity_kinds: Option<&[String]>,
                _max_alternative_resolved_values: usize,
            ) -> Result<Vec<CustomEntity>> {
                let order_in_scope = filter_entity_kinds
                    .map(|kinds| kinds.iter().any(|kind| kind == "Order"))
                    .unwrap_or(true);
                if sentence != "order tomorrow" || !order_in_scope {
                    return Ok(vec![]);
                }
                Ok(vec![CustomEntity {
                    value: "order".to_string(),
                    resolved_value: "order".to_string(),
                    alternative_resolved_values: vec![],
                    range: 0..5,
                    entity_identifier: "Order".to_string(),
                }])
            }
        }

        let resources = SharedResourcesBuilder::default()
            .builtin_entity_parser(builtin_entity_parser)
            .custom_entity_parser(ScopedCustomEntityParser)
            .build();
        let parser = DeterministicIntentParser::new(model, Arc::new(resources)).unwrap();

        // When
        let result = parser.parse(text, None).unwrap();
        let intents = parser.get_intents(text, None).unwrap();

        // Then
        assert_eq!(InternalParsingResult::empty(), result);
        let scores: Vec<f32> = intents.iter().map(|res| res.confidence_score).collect();
        assert_eq!(vec![0.5, 0.5, 0.0], scores);
    }

    #[test]
    fn test_get_intents() {
        // Given
        let parser = parser_with_stop_words(beverages_model(false), &[]);

        // When
        let intents = parser.get_intents("brew tea now", None).unwrap();
        let scoped_intents = parser
            .get_intents("brew tea now", Some(&scope(&["MakeCoffee"])))
            .unwrap();

        // Then
        assert_eq!(
            vec![
                intent(Some("MakeTea"), 1.0),
                intent(Some("MakeCoffee"), 0.0),
                intent(None, 0.0),
            ],
            intents
        );
        assert_eq!(
            vec![intent(Some("MakeCoffee"), 0.0), intent(None, 0.0)],
            scoped_intents
        );
    }

    #[test]
    fn test_get_slots_of_unknown_intent_fails() {
        // Given
        let parser = parser_with_stop_words(beverages_model(false), &[]);

        // When
        let result = parser.get_slots("brew tea now", "MakeChocolate");

        // Then
        let error = result.err().unwrap();
        assert_eq!(
            Some(&NluError::UnknownIntent("MakeChocolate".to_string())),
            error.nlu_error()
        );
    }

    #[test]
    fn test_new_rejects_unknown_group_name() {
        // Given
        let model = model(
            json!({"MakeTea": [r"^\s*brew\s*(?P<group3>%SNIPSNUMBER%)\s*teas?\s*$"]}),
            json!({}),
            json!({"MakeTea": {}}),
            false,
        );

        // When
        let result =
            DeterministicIntentParser::new(model, Arc::new(SharedResourcesBuilder::default().build()));

        // Then
        let error = result.err().unwrap();
        assert!(matches!(error.nlu_error(), Some(NluError::CorruptModel(_))));
    }

    #[test]
    fn test_new_rejects_invalid_pattern() {
        // Given
        let model = model(
            json!({"MakeTea": [r"^\s*brew(\s*$"]}),
            json!({}),
            json!({"MakeTea": {}}),
            false,
        );

        // When
        let result =
            DeterministicIntentParser::new(model, Arc::new(SharedResourcesBuilder::default().build()));

        // Then
        let error = result.err().unwrap();
        assert!(matches!(error.nlu_error(), Some(NluError::CorruptModel(_))));
    }

    #[test]
    fn test_get_range_shift() {
        // Given
        let ranges_mapping = hashmap! {
            2..5 => 2..4,
            8..9 => 7..11,
        };

        // When / Then
        assert_eq!(-1, get_range_shift(&(6..7), &ranges_mapping));
        assert_eq!(2, get_range_shift(&(12..13), &ranges_mapping));
        assert_eq!(0, get_range_shift(&(0..1), &ranges_mapping));
    }

    #[test]
    fn test_preprocess_text_blanks_stop_words() {
        // Given
        let parser = parser_with_stop_words(beverages_model(true), &["hey", "please"]);

        // When
        let cleaned = parser.preprocess_text("Hey tea, please! ", "MakeTea");

        // Then
        assert_eq!("    tea,       ! ", cleaned);
    }
}
