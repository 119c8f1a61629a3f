use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use failure::ResultExt;
use log::{debug, info};

use crate::errors::*;
use crate::intent_classifier::entity_placeholder;
use crate::language::Language;
use crate::models::{GroupedEntityScope, LookupParserModel};
use crate::nlu_utils::string::substring_with_char_range;
use crate::nlu_utils::token::tokenize_light;
use crate::ontology::{BuiltinEntityKind, IntentClassifierResult};
use crate::resources::SharedResources;
use crate::slot_utils::InternalSlot;
use crate::utils::{
    deduplicate_overlapping_entities, load_json_file, replace_entities, EntityName, IntentName,
    MatchedEntity, SlotName,
};

use super::{IntentParser, InternalParsingResult};

/// Intent parser looking up the canonical form of the input among the ones of the training
/// utterances
pub struct LookupIntentParser {
    language: Language,
    slots_names: Vec<SlotName>,
    intents_names: Vec<IntentName>,
    map: HashMap<String, (usize, Vec<usize>)>,
    entity_scopes: Vec<IntentGroupScope>,
    stop_words: HashSet<String>,
    shared_resources: Arc<SharedResources>,
}

struct IntentGroupScope {
    intents: HashSet<IntentName>,
    builtin_entities: Vec<BuiltinEntityKind>,
    custom_entities: Vec<EntityName>,
}

impl LookupIntentParser {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        info!("Loading lookup intent parser ({:?}) ...", path.as_ref());
        let model: LookupParserModel = load_json_file(
            &path.as_ref().join("intent_parser.json"),
            "lookup intent parser",
        )?;
        let parser = Self::new(model, shared_resources)?;
        info!("Lookup intent parser loaded");
        Ok(parser)
    }

    pub fn new(model: LookupParserModel, shared_resources: Arc<SharedResources>) -> Result<Self> {
        let language: Language = model.language_code.parse()?;
        for (key, (intent_id, slot_ids)) in model.map.iter() {
            let unknown_id = *intent_id >= model.intents_names.len()
                || slot_ids.iter().any(|id| *id >= model.slots_names.len());
            if unknown_id {
                return Err(NluError::CorruptModel(format!(
                    "lookup entry '{}' refers to an unknown intent or slot",
                    key
                ))
                .into());
            }
        }
        let entity_scopes = if model.entity_scopes.is_empty() {
            vec![IntentGroupScope {
                intents: model.intents_names.iter().cloned().collect(),
                builtin_entities: vec![],
                custom_entities: vec![],
            }]
        } else {
            model
                .entity_scopes
                .into_iter()
                .map(IntentGroupScope::from_model)
                .collect::<Result<Vec<_>>>()?
        };
        let stop_words = if model.config.ignore_stop_words {
            shared_resources.stop_words.clone()
        } else {
            HashSet::new()
        };
        Ok(Self {
            language,
            slots_names: model.slots_names,
            intents_names: model.intents_names,
            map: model.map,
            entity_scopes,
            stop_words,
            shared_resources,
        })
    }
}

impl IntentGroupScope {
    fn from_model(scope: GroupedEntityScope) -> Result<Self> {
        let builtin_entities = scope
            .entity_scope
            .builtin
            .iter()
            .map(|entity| BuiltinEntityKind::from_identifier(entity))
            .collect::<Result<Vec<_>>>()
            .with_context(|_| {
                NluError::CorruptModel("unknown builtin entity in lookup scope".to_string())
            })?;
        Ok(Self {
            intents: scope.intent_group.into_iter().collect(),
            builtin_entities,
            custom_entities: scope.entity_scope.custom,
        })
    }
}

impl IntentParser for LookupIntentParser {
    fn parse(
        &self,
        input: &str,
        intents_filter: Option<&HashSet<IntentName>>,
    ) -> Result<InternalParsingResult> {
        debug!("Extracting intents and slots with lookup intent parser...");
        let in_scope =
            |intent: &IntentName| intents_filter.map_or(true, |filter| filter.contains(intent));
        let cleaned_input = self.preprocess_text(input);
        let group_scopes = self
            .entity_scopes
            .iter()
            .filter(|scope| scope.intents.iter().any(|intent| in_scope(intent)));
        for scope in group_scopes {
            let entities = self.extract_entities(input, scope)?;
            let (_, formatted_input) = replace_entities(input, entities.clone(), |entity_name| {
                format!("%{}%", entity_placeholder(entity_name))
            });
            let lookup = self
                .map
                .get(&self.preprocess_text(&formatted_input))
                .map(|entry| (entry, entities.as_slice()))
                .or_else(|| self.map.get(&cleaned_input).map(|entry| (entry, &[][..])));
            let ((intent_id, slot_ids), matched_entities) = match lookup {
                Some(lookup) => lookup,
                None => continue,
            };
            let intent = &self.intents_names[*intent_id];
            if !scope.intents.contains(intent)
                || !in_scope(intent)
                || slot_ids.len() != matched_entities.len()
            {
                continue;
            }
            let slots = slot_ids
                .iter()
                .zip(matched_entities)
                .map(|(slot_id, entity)| InternalSlot {
                    value: substring_with_char_range(input, &entity.range),
                    char_range: entity.range.clone(),
                    entity: entity.entity_name.clone(),
                    slot_name: self.slots_names[*slot_id].clone(),
                })
                .collect();
            debug!("Intent found: '{}'", intent);
            return Ok(InternalParsingResult::new(Some(intent.clone()), 1.0, slots));
        }
        Ok(InternalParsingResult::empty())
    }

    fn get_intents(
        &self,
        input: &str,
        intents_filter: Option<&HashSet<IntentName>>,
    ) -> Result<Vec<IntentClassifierResult>> {
        let parsing_result = self.parse(input, intents_filter)?;
        let matched_intent = parsing_result.intent.intent_name.clone();
        let mut intents = vec![];
        if matched_intent.is_some() {
            intents.push(parsing_result.intent);
        }
        for intent in self.intents_names.iter() {
            let in_scope = intents_filter.map_or(true, |filter| filter.contains(intent));
            if in_scope && matched_intent.as_ref() != Some(intent) {
                intents.push(IntentClassifierResult {
                    intent_name: Some(intent.clone()),
                    confidence_score: 0.0,
                });
            }
        }
        intents.push(IntentClassifierResult {
            intent_name: None,
            confidence_score: 0.0,
        });
        Ok(intents)
    }

    fn get_slots(&self, input: &str, intent: &str) -> Result<Vec<InternalSlot>> {
        if !self.intents_names.iter().any(|name| name == intent) {
            return Err(NluError::UnknownIntent(intent.to_string()).into());
        }
        let filter: HashSet<IntentName> = vec![intent.to_string()].into_iter().collect();
        self.parse(input, Some(&filter)).map(|result| result.slots)
    }
}

impl LookupIntentParser {
    /// Entities of the scope, without overlap and sorted by position
    fn extract_entities(&self, input: &str, scope: &IntentGroupScope) -> Result<Vec<MatchedEntity>> {
        let builtin_entities = self
            .shared_resources
            .builtin_entity_parser
            .extract_entities(input, Some(scope.builtin_entities.as_slice()), 0)?
            .into_iter()
            .map(MatchedEntity::from);
        let custom_entities = self
            .shared_resources
            .custom_entity_parser
            .extract_entities(input, Some(scope.custom_entities.as_slice()), 0)?
            .into_iter()
            .map(MatchedEntity::from);
        Ok(deduplicate_overlapping_entities(
            builtin_entities.chain(custom_entities).collect(),
        ))
    }

    fn preprocess_text(&self, string: &str) -> String {
        tokenize_light(string, self.language)
            .into_iter()
            .filter(|token| !self.stop_words.contains(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::iter::FromIterator;

    use maplit::{hashmap, hashset};

    use super::*;
    use crate::entity_parser::CustomEntity;
    use crate::intent_parser::build_intent_parser;
    use crate::models::{EntityScope, LookupParserConfig};
    use crate::ontology::{BuiltinEntity, NumberValue, SlotValue};
    use crate::testutils::*;

    const COFFEE_QUERY: &str = "make me two cups of coffee please";
    const TEA_QUERY: &str = "make me two hot cups of tea";

    fn beverages_model() -> LookupParserModel {
        LookupParserModel {
            language_code: "en".to_string(),
            slots_names: vec![
                "number_of_cups".to_string(),
                "beverage_temperature".to_string(),
            ],
            intents_names: vec!["MakeCoffee".to_string(), "MakeTea".to_string()],
            map: hashmap! {
                "make me % snipsnumber % cups of coffee".to_string() => (0, vec![0]),
                "make me % snipsnumber % % temperature % cups of tea".to_string() => (1, vec![0, 1]),
                "coffee".to_string() => (0, vec![]),
            },
            entity_scopes: vec![GroupedEntityScope {
                intent_group: vec!["MakeCoffee".to_string(), "MakeTea".to_string()],
                entity_scope: EntityScope {
                    builtin: vec!["snips/number".to_string()],
                    custom: vec!["Temperature".to_string()],
                },
            }],
            config: LookupParserConfig {
                ignore_stop_words: true,
            },
        }
    }

    fn number(value: &str, range: std::ops::Range<usize>, resolved: f64) -> BuiltinEntity {
        BuiltinEntity {
            value: value.to_string(),
            range,
            entity: SlotValue::Number(NumberValue { value: resolved }),
            alternatives: vec![],
            entity_kind: BuiltinEntityKind::Number,
        }
    }

    fn beverages_resources() -> Arc<SharedResources> {
        let builtin_entity_parser = MockedBuiltinEntityParser::from_iter(vec![
            (COFFEE_QUERY.to_string(), vec![number("two", 8..11, 2.0)]),
            (TEA_QUERY.to_string(), vec![number("two", 8..11, 2.0)]),
        ]);
        let custom_entity_parser = MockedCustomEntityParser::from_iter(vec![(
            TEA_QUERY.to_string(),
            vec![CustomEntity {
                value: "hot".to_string(),
                resolved_value: "hot".to_string(),
                alternative_resolved_values: vec![],
                range: 12..15,
                entity_identifier: "Temperature".to_string(),
            }],
        )]);
        Arc::new(
            SharedResourcesBuilder::default()
                .builtin_entity_parser(builtin_entity_parser)
                .custom_entity_parser(custom_entity_parser)
                .stop_words(hashset! {"please".to_string()})
                .build(),
        )
    }

    fn parser() -> LookupIntentParser {
        LookupIntentParser::new(beverages_model(), beverages_resources()).unwrap()
    }

    fn cups_slot() -> InternalSlot {
        InternalSlot {
            value: "two".to_string(),
            char_range: 8..11,
            entity: "snips/number".to_string(),
            slot_name: "number_of_cups".to_string(),
        }
    }

    #[test]
    fn test_parse_with_builtin_entity() {
        // When
        let result = parser().parse(COFFEE_QUERY, None).unwrap();

        // Then
        let expected_result =
            InternalParsingResult::new(Some("MakeCoffee".to_string()), 1.0, vec![cups_slot()]);
        assert_eq!(expected_result, result);
    }

    #[test]
    fn test_parse_with_builtin_and_custom_entities() {
        // When
        let result = parser().parse(TEA_QUERY, None).unwrap();

        // Then
        let expected_slots = vec![
            cups_slot(),
            InternalSlot {
                value: "hot".to_string(),
                char_range: 12..15,
                entity: "Temperature".to_string(),
                slot_name: "beverage_temperature".to_string(),
            },
        ];
        assert_eq!(Some("MakeTea".to_string()), result.intent.intent_name);
        assert_eq!(expected_slots, result.slots);
    }

    #[test]
    fn test_parse_without_entity() {
        // When
        let result = parser().parse("Coffee please", None).unwrap();

        // Then
        let expected_result =
            InternalParsingResult::new(Some("MakeCoffee".to_string()), 1.0, vec![]);
        assert_eq!(expected_result, result);
    }

    #[test]
    fn test_parse_respects_intents_filter() {
        // Given
        let filter = hashset! {"MakeTea".to_string()};

        // When
        let result = parser().parse(COFFEE_QUERY, Some(&filter)).unwrap();

        // Then
        assert_eq!(InternalParsingResult::empty(), result);
    }

    #[test]
    fn test_parse_unknown_sentence() {
        // When
        let result = parser().parse("make me a cup of chocolate", None).unwrap();

        // Then
        assert_eq!(InternalParsingResult::empty(), result);
    }

    #[test]
    fn test_get_intents() {
        // When
        let intents = parser().get_intents(COFFEE_QUERY, None).unwrap();

        // Then
        let names_and_scores: Vec<(Option<&str>, f32)> = intents
            .iter()
            .map(|res| (res.intent_name.as_deref(), res.confidence_score))
            .collect();
        assert_eq!(
            vec![(Some("MakeCoffee"), 1.0), (Some("MakeTea"), 0.0), (None, 0.0)],
            names_and_scores
        );
    }

    #[test]
    fn test_get_slots() {
        // When
        let slots = parser().get_slots(COFFEE_QUERY, "MakeCoffee").unwrap();
        let unknown = parser().get_slots(COFFEE_QUERY, "MakeChocolate");

        // Then
        assert_eq!(vec![cups_slot()], slots);
        let error = unknown.err().unwrap();
        assert!(matches!(error.nlu_error(), Some(NluError::UnknownIntent(_))));
    }

    #[test]
    fn test_new_rejects_unknown_ids() {
        // Given
        let mut model = beverages_model();
        model
            .map
            .insert("make me a tea".to_string(), (2, vec![]));

        // When
        let result = LookupIntentParser::new(model, beverages_resources());

        // Then
        let error = result.err().unwrap();
        assert!(matches!(error.nlu_error(), Some(NluError::CorruptModel(_))));
    }

    #[test]
    fn test_build_from_path() {
        // Given
        let parser_dir = tempfile::tempdir().unwrap();
        fs::write(
            parser_dir.path().join("metadata.json"),
            r#"{"unit_name": "lookup_intent_parser"}"#,
        )
        .unwrap();
        fs::write(
            parser_dir.path().join("intent_parser.json"),
            serde_json::to_string(&beverages_model()).unwrap(),
        )
        .unwrap();

        // When
        let parser = build_intent_parser(parser_dir.path(), beverages_resources()).unwrap();
        let result = parser.parse(COFFEE_QUERY, None).unwrap();

        // Then
        assert_eq!(Some("MakeCoffee".to_string()), result.intent.intent_name);
        assert_eq!(vec![cups_slot()], result.slots);
    }
}
