use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq)]
#[serde(tag = "unit_name")]
#[serde(rename_all = "snake_case")]
pub enum ProcessingUnitMetadata {
    DeterministicIntentParser,
    LookupIntentParser,
    ProbabilisticIntentParser,
    CrfSlotFiller,
    LogRegIntentClassifier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize() {
        let data = r#"{
                        "unit_name": "crf_slot_filler"
                      }"#;
        let metadata: ProcessingUnitMetadata = serde_json::from_str(data).unwrap();
        assert_eq!(ProcessingUnitMetadata::CrfSlotFiller, metadata);
    }

    #[test]
    fn test_deserialize_lookup_intent_parser() {
        let data = r#"{"unit_name": "lookup_intent_parser"}"#;
        let metadata: ProcessingUnitMetadata = serde_json::from_str(data).unwrap();
        assert_eq!(ProcessingUnitMetadata::LookupIntentParser, metadata);
    }

    #[test]
    fn test_deserialize_unknown_unit_fails() {
        let data = r#"{"unit_name": "keyword_spotting_intent_parser"}"#;
        let metadata: Result<ProcessingUnitMetadata, _> = serde_json::from_str(data);
        assert!(metadata.is_err());
    }
}
