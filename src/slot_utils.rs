use std::ops::Range;

use crate::entity_parser::{BuiltinEntityParser, CustomEntity, CustomEntityParser};
use crate::errors::*;
use crate::models::Entity;
use crate::ontology::{BuiltinEntity, BuiltinEntityKind, Slot, SlotValue};
use crate::utils::{EntityName, SlotName};

/// A slot as extracted by an intent parser, before the resolution of its value
#[derive(Debug, Clone, PartialEq)]
pub struct InternalSlot {
    pub value: String,
    pub char_range: Range<usize>,
    pub entity: EntityName,
    pub slot_name: SlotName,
}

impl InternalSlot {
    fn into_slot(self, value: SlotValue, alternatives: Vec<SlotValue>) -> Slot {
        Slot {
            raw_value: self.value,
            value,
            alternatives,
            range: self.char_range,
            entity: self.entity,
            slot_name: self.slot_name,
            confidence_score: None,
        }
    }
}

/// Resolves a builtin slot, first against the entities found in the whole input, then by
/// parsing the slot value alone
pub fn resolve_builtin_slot(
    internal_slot: InternalSlot,
    builtin_entities: &[BuiltinEntity],
    builtin_entity_parser: &dyn BuiltinEntityParser,
    slots_alternatives: usize,
) -> Result<Option<Slot>> {
    let kind = BuiltinEntityKind::from_identifier(&internal_slot.entity)?;
    let found_in_input = builtin_entities
        .iter()
        .find(|entity| entity.entity_kind == kind && entity.range == internal_slot.char_range)
        .cloned();
    let entity = match found_in_input {
        Some(entity) => Some(entity),
        None => builtin_entity_parser
            .extract_entities(&internal_slot.value, Some(&[kind][..]), slots_alternatives)?
            .pop(),
    };
    Ok(entity.map(|entity| {
        let alternatives = entity
            .alternatives
            .into_iter()
            .take(slots_alternatives)
            .collect();
        internal_slot.into_slot(entity.entity, alternatives)
    }))
}

/// Resolves a custom slot, first against the entities found in the whole input, then by
/// parsing the slot value alone which must then match entirely
///
/// Values of automatically extensible entities which cannot be resolved are kept as is.
pub fn resolve_custom_slot(
    internal_slot: InternalSlot,
    entity: &Entity,
    custom_entities: &[CustomEntity],
    custom_entity_parser: &dyn CustomEntityParser,
    slots_alternatives: usize,
) -> Result<Option<Slot>> {
    let found_in_input = custom_entities
        .iter()
        .find(|custom_entity| {
            custom_entity.entity_identifier == internal_slot.entity
                && custom_entity.range == internal_slot.char_range
        })
        .cloned();
    let matching_entity = match found_in_input {
        Some(custom_entity) => Some(custom_entity),
        None => {
            let scope = [internal_slot.entity.clone()];
            let slot_length = internal_slot.value.chars().count();
            custom_entity_parser
                .extract_entities(&internal_slot.value, Some(&scope[..]), slots_alternatives)?
                .pop()
                .filter(|custom_entity| custom_entity.value.chars().count() == slot_length)
        }
    };
    let (resolved_value, alternatives) = match matching_entity {
        Some(custom_entity) => (
            custom_entity.resolved_value,
            custom_entity.alternative_resolved_values,
        ),
        None if entity.automatically_extensible => (internal_slot.value.clone(), vec![]),
        None => return Ok(None),
    };
    let alternatives = alternatives
        .into_iter()
        .take(slots_alternatives)
        .map(SlotValue::custom)
        .collect();
    Ok(Some(
        internal_slot.into_slot(SlotValue::custom(resolved_value), alternatives),
    ))
}

#[cfg(test)]
mod tests {
    use std::iter::FromIterator;

    use super::*;
    use crate::ontology::NumberValue;
    use crate::testutils::*;

    fn number(value: f64) -> SlotValue {
        SlotValue::Number(NumberValue { value })
    }

    fn number_entity(value: &str, range: Range<usize>, resolved: f64) -> BuiltinEntity {
        BuiltinEntity {
            value: value.to_string(),
            range,
            entity: number(resolved),
            alternatives: vec![],
            entity_kind: BuiltinEntityKind::Number,
        }
    }

    fn temperature_entity(
        value: &str,
        range: Range<usize>,
        resolved_value: &str,
        alternatives: &[&str],
    ) -> CustomEntity {
        CustomEntity {
            value: value.to_string(),
            resolved_value: resolved_value.to_string(),
            alternative_resolved_values: alternatives.iter().map(|a| a.to_string()).collect(),
            range,
            entity_identifier: "Temperature".to_string(),
        }
    }

    fn cups_slot(value: &str, char_range: Range<usize>) -> InternalSlot {
        InternalSlot {
            value: value.to_string(),
            char_range,
            entity: "snips/number".to_string(),
            slot_name: "number_of_cups".to_string(),
        }
    }

    /// "boiling" slot of "make me two boiling cups of tea"
    fn boiling_slot() -> InternalSlot {
        InternalSlot {
            value: "boiling".to_string(),
            char_range: 12..19,
            entity: "Temperature".to_string(),
            slot_name: "beverage_temperature".to_string(),
        }
    }

    fn temperature_slot(value: &str, alternatives: &[&str]) -> Slot {
        Slot {
            raw_value: "boiling".to_string(),
            value: SlotValue::custom(value),
            alternatives: alternatives.iter().map(|a| SlotValue::custom(*a)).collect(),
            range: 12..19,
            entity: "Temperature".to_string(),
            slot_name: "beverage_temperature".to_string(),
            confidence_score: None,
        }
    }

    fn temperature(automatically_extensible: bool) -> Entity {
        Entity {
            automatically_extensible,
        }
    }

    #[test]
    fn test_resolve_builtin_slot_from_input_entities() {
        // Given
        let builtin_entities = vec![
            number_entity("one", 0..3, 1.0),
            number_entity("two", 8..11, 2.0),
        ];
        let parser = MockedBuiltinEntityParser::default();

        // When
        let slot = resolve_builtin_slot(cups_slot("two", 8..11), &builtin_entities, &parser, 5)
            .unwrap();

        // Then
        let expected_slot = Slot {
            raw_value: "two".to_string(),
            value: number(2.0),
            alternatives: vec![],
            range: 8..11,
            entity: "snips/number".to_string(),
            slot_name: "number_of_cups".to_string(),
            confidence_score: None,
        };
        assert_eq!(Some(expected_slot), slot);
    }

    #[test]
    fn test_resolve_builtin_slot_by_parsing_its_value() {
        // Given
        let parser = MockedBuiltinEntityParser::from_iter(vec![(
            "three".to_string(),
            vec![number_entity("three", 0..5, 3.0)],
        )]);

        // When
        let slot = resolve_builtin_slot(cups_slot("three", 8..13), &[], &parser, 5).unwrap();

        // Then
        let slot = slot.unwrap();
        assert_eq!(number(3.0), slot.value);
        assert_eq!(8..13, slot.range);
    }

    #[test]
    fn test_resolve_builtin_slot_truncates_alternatives() {
        // Given
        let mut entity = number_entity("two", 8..11, 2.0);
        entity.alternatives = vec![number(12.0), number(22.0)];
        let parser = MockedBuiltinEntityParser::default();

        // When
        let slot = resolve_builtin_slot(cups_slot("two", 8..11), &[entity], &parser, 1).unwrap();

        // Then
        assert_eq!(vec![number(12.0)], slot.unwrap().alternatives);
    }

    #[test]
    fn test_unresolvable_builtin_slot_is_dropped() {
        // Given
        let parser = MockedBuiltinEntityParser::default();

        // When
        let slot = resolve_builtin_slot(cups_slot("a few", 8..13), &[], &parser, 5).unwrap();

        // Then
        assert_eq!(None, slot);
    }

    #[test]
    fn test_resolve_builtin_slot_with_unknown_kind_fails() {
        // Given
        let mut internal_slot = cups_slot("two", 8..11);
        internal_slot.entity = "snips/weight".to_string();
        let parser = MockedBuiltinEntityParser::default();

        // When
        let result = resolve_builtin_slot(internal_slot, &[], &parser, 5);

        // Then
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_custom_slot_from_input_entities() {
        // Given
        let custom_entities = vec![
            temperature_entity("cold", 0..4, "cold", &[]),
            temperature_entity("boiling", 12..19, "hot", &["very hot", "warm"]),
        ];
        let parser = MockedCustomEntityParser::default();

        // When
        let slot = resolve_custom_slot(
            boiling_slot(),
            &temperature(false),
            &custom_entities,
            &parser,
            1,
        )
        .unwrap();

        // Then
        assert_eq!(Some(temperature_slot("hot", &["very hot"])), slot);
    }

    #[test]
    fn test_resolve_custom_slot_by_parsing_its_value() {
        // Given
        let parser = MockedCustomEntityParser::from_iter(vec![(
            "boiling".to_string(),
            vec![temperature_entity("boiling", 0..7, "hot", &[])],
        )]);

        // When
        let slot =
            resolve_custom_slot(boiling_slot(), &temperature(false), &[], &parser, 5).unwrap();

        // Then
        assert_eq!(Some(temperature_slot("hot", &[])), slot);
    }

    #[test]
    fn test_custom_slot_partially_matched_is_not_resolved() {
        // Given
        let parser = MockedCustomEntityParser::from_iter(vec![(
            "boiling".to_string(),
            vec![temperature_entity("boil", 0..4, "hot", &[])],
        )]);

        // When
        let slot =
            resolve_custom_slot(boiling_slot(), &temperature(false), &[], &parser, 5).unwrap();

        // Then
        assert_eq!(None, slot);
    }

    #[test]
    fn test_unknown_custom_value_depends_on_extensibility() {
        // Given
        let parser = MockedCustomEntityParser::default();

        // When
        let extensible =
            resolve_custom_slot(boiling_slot(), &temperature(true), &[], &parser, 5).unwrap();
        let closed =
            resolve_custom_slot(boiling_slot(), &temperature(false), &[], &parser, 5).unwrap();

        // Then
        assert_eq!(Some(temperature_slot("boiling", &[])), extensible);
        assert_eq!(None, closed);
    }
}
