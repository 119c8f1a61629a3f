use std::path::Path;

use chrono::{DateTime, FixedOffset, Local};
use log::info;
use serde::{Deserialize, Serialize};

use super::builtin::extract_rule_matches;
use crate::errors::*;
use crate::language::Language;
use crate::nlu_utils::string::substring_with_char_range;
use crate::nlu_utils::token::tokenize;
use crate::ontology::{BuiltinEntity, BuiltinEntityKind};
use crate::utils::load_json_file;

pub trait BuiltinEntityParser: Send + Sync {
    /// Extracts the builtin entities of `sentence`, restricted to `filter_entity_kinds` when
    /// provided
    ///
    /// Ranges are char ranges in `sentence`. Finding no entity is not an error.
    fn extract_entities(
        &self,
        sentence: &str,
        filter_entity_kinds: Option<&[BuiltinEntityKind]>,
        max_alternative_resolved_values: usize,
    ) -> Result<Vec<BuiltinEntity>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BuiltinEntityParserMetadata {
    language: String,
}

pub struct RuleBasedBuiltinEntityParser {
    language: Language,
    reference_time: Option<DateTime<FixedOffset>>,
}

impl RuleBasedBuiltinEntityParser {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            reference_time: None,
        }
    }

    /// Resolves relative dates and times against `reference_time` instead of the current time
    pub fn with_reference_time(self, reference_time: DateTime<FixedOffset>) -> Self {
        Self {
            reference_time: Some(reference_time),
            ..self
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Loading builtin entity parser ({:?}) ...", path.as_ref());
        let metadata: BuiltinEntityParserMetadata = load_json_file(
            &path.as_ref().join("metadata.json"),
            "builtin entity parser metadata",
        )?;
        let language = metadata.language.parse()?;
        info!("Builtin entity parser loaded");
        Ok(Self::new(language))
    }

    fn reference_time(&self) -> DateTime<FixedOffset> {
        self.reference_time.unwrap_or_else(|| {
            let now = Local::now();
            now.with_timezone(now.offset())
        })
    }
}

impl BuiltinEntityParser for RuleBasedBuiltinEntityParser {
    fn extract_entities(
        &self,
        sentence: &str,
        filter_entity_kinds: Option<&[BuiltinEntityKind]>,
        max_alternative_resolved_values: usize,
    ) -> Result<Vec<BuiltinEntity>> {
        let tokens = tokenize(sentence, self.language);
        let normalized_tokens: Vec<String> =
            tokens.iter().map(|token| token.normalized_value()).collect();
        let kinds = filter_entity_kinds.unwrap_or_else(|| BuiltinEntityKind::all());
        let entities = extract_rule_matches(
            &normalized_tokens,
            self.language,
            self.reference_time(),
            kinds,
        )
        .into_iter()
        .map(|rule_match| {
            let char_range = tokens[rule_match.tokens.start].char_range.start
                ..tokens[rule_match.tokens.end - 1].char_range.end;
            BuiltinEntity {
                value: substring_with_char_range(sentence, &char_range),
                range: char_range,
                entity: rule_match.value,
                alternatives: rule_match
                    .alternatives
                    .into_iter()
                    .take(max_alternative_resolved_values)
                    .collect(),
                entity_kind: rule_match.kind,
            }
        })
        .collect();
        Ok(entities)
    }
}
