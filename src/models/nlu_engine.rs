use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::utils::{EntityName, IntentName, SlotName};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub model_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NluEngineModel {
    pub dataset_metadata: DatasetMetadata,
    pub intent_parsers: Vec<String>,
    pub model_version: String,
    pub training_package_version: String,
    pub builtin_entity_parser: String,
    pub custom_entity_parser: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub language_code: String,
    /// Intents in declaration order
    pub intents: Vec<IntentMetadata>,
    pub entities: BTreeMap<EntityName, Entity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentMetadata {
    pub name: IntentName,
    #[serde(default)]
    pub slots: Vec<SlotMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotMetadata {
    pub name: SlotName,
    pub entity: EntityName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub automatically_extensible: bool,
}

impl DatasetMetadata {
    pub fn intent(&self, intent_name: &str) -> Option<&IntentMetadata> {
        self.intents.iter().find(|intent| intent.name == intent_name)
    }
}

impl IntentMetadata {
    pub fn slot(&self, slot_name: &str) -> Option<&SlotMetadata> {
        self.slots.iter().find(|slot| slot.name == slot_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::Path;

    #[test]
    fn test_manifest_round_trip() {
        // Given
        let manifest_path = Path::new("data")
            .join("tests")
            .join("models")
            .join("nlu_engine")
            .join("nlu_engine.json");
        let manifest: NluEngineModel =
            serde_json::from_reader(File::open(manifest_path).unwrap()).unwrap();

        // When
        let serialized = serde_json::to_string(&manifest).unwrap();
        let deserialized: NluEngineModel = serde_json::from_str(&serialized).unwrap();

        // Then
        assert_eq!(manifest, deserialized);
        assert_eq!(
            vec!["MakeCoffee", "MakeTea"],
            manifest
                .dataset_metadata
                .intents
                .iter()
                .map(|intent| intent.name.as_str())
                .collect::<Vec<_>>()
        );
    }
}
