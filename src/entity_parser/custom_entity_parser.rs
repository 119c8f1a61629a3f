use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use failure::{bail, format_err};
use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::*;
use crate::language::Language;
use crate::nlu_utils::range::ranges_overlap;
use crate::nlu_utils::string::{normalize, substring_with_char_range};
use crate::nlu_utils::token::{tokenize, tokenize_light};
use crate::resources::stemmer::Stemmer;
use crate::utils::{deduplicate_overlapping_items, load_json_file, EntityName};

#[derive(Debug, Clone, PartialEq)]
pub struct CustomEntity {
    pub value: String,
    pub resolved_value: String,
    pub alternative_resolved_values: Vec<String>,
    pub range: Range<usize>,
    pub entity_identifier: String,
}

pub trait CustomEntityParser: Send + Sync {
    /// Extracts the values of custom entities found in `sentence`, restricted to
    /// `filter_entity_kinds` when provided
    fn extract_entities(
        &self,
        sentence: &str,
        filter_entity_kinds: Option<&[String]>,
        max_alternative_resolved_values: usize,
    ) -> Result<Vec<CustomEntity>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomEntityParserUsage {
    WithStems,
    WithoutStems,
    WithAndWithoutStems,
}

impl CustomEntityParserUsage {
    pub fn from_u8(i: u8) -> Result<CustomEntityParserUsage> {
        match i {
            0 => Ok(CustomEntityParserUsage::WithStems),
            1 => Ok(CustomEntityParserUsage::WithoutStems),
            2 => Ok(CustomEntityParserUsage::WithAndWithoutStems),
            _ => bail!("Unknown parser usage identifier: {}", i),
        }
    }

    fn uses_raw_values(self) -> bool {
        self != CustomEntityParserUsage::WithStems
    }

    fn uses_stems(self) -> bool {
        self != CustomEntityParserUsage::WithoutStems
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomEntityParserMetadata {
    pub language: String,
    pub entities_file: String,
    pub parser_usage: u8,
}

/// A value of a custom entity as listed in the trained model, synonyms being listed as
/// additional raw values sharing the same resolved value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityValue {
    pub raw_value: String,
    pub resolved_value: String,
}

struct EntityTable {
    /// Matching key of a value, then resolved values in declaration order
    values: HashMap<String, Vec<String>>,
    max_ngram_size: usize,
}

/// Matches custom entity values on normalized, and possibly stemmed, token ngrams
pub struct TableCustomEntityParser {
    language: Language,
    usage: CustomEntityParserUsage,
    stemmer: Option<Arc<dyn Stemmer>>,
    entities: BTreeMap<EntityName, EntityTable>,
}

impl TableCustomEntityParser {
    pub fn from_path<P: AsRef<Path>>(path: P, stemmer: Option<Arc<dyn Stemmer>>) -> Result<Self> {
        info!("Loading custom entity parser ({:?}) ...", path.as_ref());
        let dir = path.as_ref();
        let metadata: CustomEntityParserMetadata =
            load_json_file(&dir.join("metadata.json"), "custom entity parser metadata")?;
        let entities: BTreeMap<EntityName, Vec<EntityValue>> =
            load_json_file(&dir.join(&metadata.entities_file), "custom entities")?;
        let parser = Self::new(
            metadata.language.parse()?,
            CustomEntityParserUsage::from_u8(metadata.parser_usage)?,
            entities,
            stemmer,
        )?;
        info!("Custom entity parser loaded");
        Ok(parser)
    }

    pub fn new(
        language: Language,
        usage: CustomEntityParserUsage,
        entities: BTreeMap<EntityName, Vec<EntityValue>>,
        stemmer: Option<Arc<dyn Stemmer>>,
    ) -> Result<Self> {
        if usage.uses_stems() && stemmer.is_none() {
            return Err(format_err!(
                "Custom entity parser requires a stemmer with usage {:?}",
                usage
            ));
        }
        let mut parser = Self {
            language,
            usage,
            stemmer,
            entities: BTreeMap::new(),
        };
        for (entity_name, values) in entities {
            let mut table = EntityTable {
                values: HashMap::new(),
                max_ngram_size: 0,
            };
            for entity_value in values {
                let tokens = tokenize_light(&entity_value.raw_value, language);
                table.max_ngram_size = table.max_ngram_size.max(tokens.len());
                for key in parser.matching_keys(&tokens) {
                    let resolved_values = table.values.entry(key).or_insert_with(Vec::new);
                    if !resolved_values.contains(&entity_value.resolved_value) {
                        resolved_values.push(entity_value.resolved_value.clone());
                    }
                }
            }
            parser.entities.insert(entity_name, table);
        }
        Ok(parser)
    }

    fn stem(&self, token: &str) -> String {
        self.stemmer
            .as_ref()
            .map(|stemmer| stemmer.stem(token))
            .unwrap_or_else(|| token.to_string())
    }

    /// Keys under which a sequence of normalized tokens is looked up, raw form first
    fn matching_keys(&self, normalized_tokens: &[String]) -> Vec<String> {
        let mut keys = vec![];
        if self.usage.uses_raw_values() {
            keys.push(normalized_tokens.join(" "));
        }
        if self.usage.uses_stems() {
            let stemmed_key = normalized_tokens
                .iter()
                .map(|token| self.stem(token))
                .collect::<Vec<_>>()
                .join(" ");
            if !keys.contains(&stemmed_key) {
                keys.push(stemmed_key);
            }
        }
        keys
    }
}

impl CustomEntityParser for TableCustomEntityParser {
    fn extract_entities(
        &self,
        sentence: &str,
        filter_entity_kinds: Option<&[String]>,
        max_alternative_resolved_values: usize,
    ) -> Result<Vec<CustomEntity>> {
        let tokens = tokenize(sentence, self.language);
        let normalized_tokens: Vec<String> = tokens
            .iter()
            .map(|token| normalize(&token.value))
            .collect();
        let mut candidates = vec![];
        for (entity_name, table) in self.entities.iter() {
            if let Some(kinds) = filter_entity_kinds {
                if !kinds.contains(entity_name) {
                    continue;
                }
            }
            for start in 0..tokens.len() {
                let max_end = (start + table.max_ngram_size).min(tokens.len());
                for end in start + 1..=max_end {
                    let resolved_values = self
                        .matching_keys(&normalized_tokens[start..end])
                        .into_iter()
                        .find_map(|key| table.values.get(&key));
                    if let Some(resolved_values) = resolved_values {
                        let range = tokens[start].char_range.start..tokens[end - 1].char_range.end;
                        candidates.push(CustomEntity {
                            value: substring_with_char_range(sentence, &range),
                            resolved_value: resolved_values[0].clone(),
                            alternative_resolved_values: resolved_values
                                .iter()
                                .skip(1)
                                .take(max_alternative_resolved_values)
                                .cloned()
                                .collect(),
                            range,
                            entity_identifier: entity_name.clone(),
                        });
                    }
                }
            }
        }
        let mut entities = deduplicate_overlapping_items(
            candidates,
            |lhs, rhs| lhs.range != rhs.range && ranges_overlap(&lhs.range, &rhs.range),
            |entity| (-(entity.range.len() as i64), entity.range.start),
        );
        entities.sort_by_key(|entity| entity.range.start);
        Ok(entities)
    }
}
