use std::cmp::Ordering;
use std::collections::HashSet;
use std::io;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use failure::ResultExt;
use itertools::Itertools;
use log::{debug, info};

use crate::entity_parser::{BuiltinEntityParser, CustomEntityParser};
use crate::errors::*;
use crate::intent_parser::*;
use crate::language::Language;
use crate::models::{DatasetMetadata, Entity, ModelVersion, NluEngineModel, SlotMetadata};
use crate::nlu_utils::string::substring_with_char_range;
use crate::ontology::{
    BuiltinEntityKind, IntentClassifierResult, IntentParserAlternative, IntentParserResult, Slot,
    SlotValue,
};
use crate::resources::loading::load_engine_shared_resources;
use crate::resources::SharedResources;
use crate::slot_utils::*;
use crate::utils::{
    extract_nlu_engine_zip_archive, load_json_file, EntityName, IntentName, MANIFEST_FILENAME,
};
use crate::{
    DEFAULT_INTENTS_ALTERNATIVES, DEFAULT_SLOTS_ALTERNATIVES, MIN_MODEL_VERSION, MODEL_VERSION,
};

/// Trained nlu engine, immutable once loaded and safe to share between threads
pub struct NluEngine {
    language: Language,
    dataset_metadata: DatasetMetadata,
    intent_parsers: Vec<Box<dyn IntentParser>>,
    shared_resources: Arc<SharedResources>,
}

impl NluEngine {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(path, None)
    }

    /// Loads an engine whose builtin entities are extracted by `builtin_entity_parser` rather
    /// than by the parser of the bundle
    pub fn from_path_with_builtin_entity_parser<P: AsRef<Path>>(
        path: P,
        builtin_entity_parser: Arc<dyn BuiltinEntityParser>,
    ) -> Result<Self> {
        Self::load(path, Some(builtin_entity_parser))
    }

    fn load<P: AsRef<Path>>(
        path: P,
        builtin_entity_parser: Option<Arc<dyn BuiltinEntityParser>>,
    ) -> Result<Self> {
        info!("Loading nlu engine ({:?}) ...", path.as_ref());
        let model = Self::load_model(&path)?;
        let shared_resources = load_engine_shared_resources(&path, &model, builtin_entity_parser)
            .with_context(|_| {
                NluError::CorruptModel("cannot load the shared resources".to_string())
            })?;
        let engine = Self::from_model(path, model, shared_resources)?;
        info!("Nlu engine loaded");
        Ok(engine)
    }

    fn from_model<P: AsRef<Path>>(
        path: P,
        model: NluEngineModel,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        let language: Language = model
            .dataset_metadata
            .language_code
            .parse::<Language>()
            .with_context(|_| NluError::CorruptModel("unsupported language".to_string()))?;
        let intent_parsers = Self::load_intent_parsers(path, &model, shared_resources.clone())?;
        Ok(NluEngine {
            language,
            dataset_metadata: model.dataset_metadata,
            intent_parsers,
            shared_resources,
        })
    }

    fn load_model<P: AsRef<Path>>(path: P) -> Result<NluEngineModel> {
        let engine_dir = path.as_ref();
        if !engine_dir.is_dir() {
            return Err(NluError::ModelNotFound(format!("{:?}", engine_dir)).into());
        }
        let engine_model_path = engine_dir.join(MANIFEST_FILENAME);
        if !engine_model_path.is_file() {
            return Err(NluError::ModelNotFound(format!("{:?}", engine_model_path)).into());
        }

        // the version is checked first since older manifests may not match the current format
        let model_version: ModelVersion = load_json_file(&engine_model_path, "nlu engine")?;
        check_model_version(&model_version.model_version)?;
        let model: NluEngineModel = load_json_file(&engine_model_path, "nlu engine")?;
        validate_dataset_metadata(&model.dataset_metadata)?;
        Ok(model)
    }

    fn load_intent_parsers<P: AsRef<Path>>(
        engine_dir: P,
        model: &NluEngineModel,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn IntentParser>>> {
        model
            .intent_parsers
            .iter()
            .map(|parser_name| -> Result<Box<dyn IntentParser>> {
                let parser_path = engine_dir.as_ref().join(parser_name);
                let parser = build_intent_parser(parser_path, shared_resources.clone())
                    .with_context(|_| {
                        NluError::CorruptModel(format!(
                            "cannot load intent parser '{}'",
                            parser_name
                        ))
                    })?;
                Ok(parser)
            })
            .collect::<Result<Vec<_>>>()
    }
}

impl NluEngine {
    /// Loads an engine from a zipped bundle, extracted in a temporary directory
    pub fn from_zip<R: io::Read + io::Seek>(reader: R) -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("temp_dir_nlu_")
            .tempdir()
            .with_context(|_| {
                NluError::InternalError("cannot create a directory to extract into".to_string())
            })?;
        let engine_dir_path = extract_nlu_engine_zip_archive(reader, temp_dir.path())?;
        NluEngine::from_path(engine_dir_path)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(NluError::InvalidArchive("no data".to_string()).into());
        }
        NluEngine::from_zip(io::Cursor::new(bytes))
    }
}

impl NluEngine {
    pub fn language(&self) -> Language {
        self.language
    }

    /// Names of the intents, in declaration order
    pub fn intents(&self) -> Vec<&str> {
        self.dataset_metadata
            .intents
            .iter()
            .map(|intent| intent.name.as_str())
            .collect()
    }
}

impl NluEngine {
    pub fn parse<'a, 'b, W, B>(
        &self,
        input: &str,
        intents_whitelist: W,
        intents_blacklist: B,
    ) -> Result<IntentParserResult>
    where
        W: Into<Option<Vec<&'a str>>>,
        B: Into<Option<Vec<&'b str>>>,
    {
        self.parse_with_alternatives(
            input,
            intents_whitelist,
            intents_blacklist,
            DEFAULT_INTENTS_ALTERNATIVES,
            DEFAULT_SLOTS_ALTERNATIVES,
        )
    }

    /// Parses `input`, listing up to `intents_alternatives` other intents along with their
    /// slots, each slot carrying up to `slots_alternatives` alternative values
    pub fn parse_with_alternatives<'a, 'b, W, B>(
        &self,
        input: &str,
        intents_whitelist: W,
        intents_blacklist: B,
        intents_alternatives: usize,
        slots_alternatives: usize,
    ) -> Result<IntentParserResult>
    where
        W: Into<Option<Vec<&'a str>>>,
        B: Into<Option<Vec<&'b str>>>,
    {
        let scope = self.get_intents_scope(intents_whitelist, intents_blacklist)?;
        if scope.as_ref().map(|intents| intents.is_empty()).unwrap_or(false) {
            debug!("No intent left in scope, '{}' is not parsed", input);
            return Ok(empty_result(input));
        }
        let scope = scope.as_ref();

        let (parser, parsing_result) = match self.run_intent_parsers(input, scope)? {
            Some(decision) => decision,
            None => return Ok(empty_result(input)),
        };
        let top_intent_name = parsing_result.intent.intent_name.clone();
        let slots = self
            .resolve_slots(input, parsing_result.slots, slots_alternatives)
            .with_context(|_| "Cannot resolve slots".to_string())?;
        let alternatives = if intents_alternatives > 0 {
            self.sort_by_confidence(parser.get_intents(input, scope)?)
                .into_iter()
                .filter(|res| res.intent_name != top_intent_name)
                .take(intents_alternatives)
                .map(|res| -> Result<IntentParserAlternative> {
                    let slots = match res.intent_name.as_ref() {
                        Some(intent_name) => {
                            self.get_slots_with_alternatives(input, intent_name, slots_alternatives)?
                        }
                        None => vec![],
                    };
                    Ok(IntentParserAlternative { intent: res, slots })
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            vec![]
        };

        Ok(IntentParserResult {
            input: input.to_string(),
            intent: parsing_result.intent,
            slots,
            alternatives,
        })
    }

    /// Runs the intent parsers in order until one of them finds an intent
    ///
    /// When none does, the result of the last parser is returned.
    fn run_intent_parsers(
        &self,
        input: &str,
        scope: Option<&HashSet<IntentName>>,
    ) -> Result<Option<(&dyn IntentParser, InternalParsingResult)>> {
        let mut decision = None;
        for parser in self.intent_parsers.iter() {
            let parsing_result = parser.parse(input, scope)?;
            let found_intent = parsing_result.intent.intent_name.is_some();
            decision = Some((&**parser, parsing_result));
            if found_intent {
                break;
            }
        }
        Ok(decision)
    }

    fn get_intents_scope<'a, 'b, W, B>(
        &self,
        intents_whitelist: W,
        intents_blacklist: B,
    ) -> Result<Option<HashSet<IntentName>>>
    where
        W: Into<Option<Vec<&'a str>>>,
        B: Into<Option<Vec<&'b str>>>,
    {
        let all_intents = self.dataset_metadata.intents.iter().map(|intent| &intent.name);
        match (intents_whitelist.into(), intents_blacklist.into()) {
            (Some(_), Some(_)) => Err(NluError::InvalidFilterCombination.into()),
            (Some(whitelist), None) => Ok(Some(
                all_intents
                    .filter(|intent| whitelist.contains(&intent.as_str()))
                    .cloned()
                    .collect(),
            )),
            (None, Some(blacklist)) => Ok(Some(
                all_intents
                    .filter(|intent| !blacklist.contains(&intent.as_str()))
                    .cloned()
                    .collect(),
            )),
            (None, None) => Ok(None),
        }
    }

    /// Ranks every intent along with the null intent, by decreasing confidence
    pub fn get_intents(&self, input: &str) -> Result<Vec<IntentClassifierResult>> {
        match self.run_intent_parsers(input, None)? {
            Some((parser, _)) => Ok(self.sort_by_confidence(parser.get_intents(input, None)?)),
            None => Ok(vec![IntentClassifierResult {
                intent_name: None,
                confidence_score: 1.0,
            }]
            .into_iter()
            .chain(self.dataset_metadata.intents.iter().map(|intent| {
                IntentClassifierResult {
                    intent_name: Some(intent.name.clone()),
                    confidence_score: 0.0,
                }
            }))
            .collect()),
        }
    }

    /// Equal confidences are ordered by intent declaration, the null intent coming last
    fn sort_by_confidence(
        &self,
        results: Vec<IntentClassifierResult>,
    ) -> Vec<IntentClassifierResult> {
        let nb_intents = self.dataset_metadata.intents.len();
        let declaration_rank = |res: &IntentClassifierResult| {
            res.intent_name
                .as_ref()
                .and_then(|name| {
                    self.dataset_metadata
                        .intents
                        .iter()
                        .position(|intent| &intent.name == name)
                })
                .unwrap_or(nb_intents)
        };
        results
            .into_iter()
            .sorted_by(|a, b| {
                b.confidence_score
                    .partial_cmp(&a.confidence_score)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| declaration_rank(a).cmp(&declaration_rank(b)))
            })
            .collect()
    }

    pub fn get_slots(&self, input: &str, intent: &str) -> Result<Vec<Slot>> {
        self.get_slots_with_alternatives(input, intent, DEFAULT_SLOTS_ALTERNATIVES)
    }

    pub fn get_slots_with_alternatives(
        &self,
        input: &str,
        intent: &str,
        slots_alternatives: usize,
    ) -> Result<Vec<Slot>> {
        if self.dataset_metadata.intent(intent).is_none() {
            return Err(NluError::UnknownIntent(intent.to_string()).into());
        }
        for parser in &self.intent_parsers {
            let slots = parser.get_slots(input, intent)?;
            if !slots.is_empty() {
                return self.resolve_slots(input, slots, slots_alternatives);
            }
        }
        Ok(vec![])
    }

    fn resolve_slots(
        &self,
        text: &str,
        slots: Vec<InternalSlot>,
        slots_alternatives: usize,
    ) -> Result<Vec<Slot>> {
        if slots.is_empty() {
            return Ok(vec![]);
        }
        let builtin_entity_scope: Vec<BuiltinEntityKind> = slots
            .iter()
            .filter_map(|slot| BuiltinEntityKind::from_identifier(&slot.entity).ok())
            .sorted()
            .dedup()
            .collect();
        let custom_entity_scope: Vec<EntityName> = slots
            .iter()
            .filter(|slot| self.dataset_metadata.entities.contains_key(&slot.entity))
            .map(|slot| slot.entity.to_string())
            .sorted()
            .dedup()
            .collect();
        let builtin_entities = self
            .shared_resources
            .builtin_entity_parser
            .extract_entities(text, Some(&*builtin_entity_scope), slots_alternatives)?;
        let custom_entities = self
            .shared_resources
            .custom_entity_parser
            .extract_entities(text, Some(&*custom_entity_scope), slots_alternatives)?;

        let mut resolved_slots = Vec::with_capacity(slots.len());
        for slot in slots.into_iter() {
            let opt_resolved_slot =
                if let Some(entity) = self.dataset_metadata.entities.get(&slot.entity) {
                    resolve_custom_slot(
                        slot,
                        entity,
                        &custom_entities,
                        self.shared_resources.custom_entity_parser.as_ref(),
                        slots_alternatives,
                    )?
                } else {
                    resolve_builtin_slot(
                        slot,
                        &builtin_entities,
                        self.shared_resources.builtin_entity_parser.as_ref(),
                        slots_alternatives,
                    )?
                };
            match opt_resolved_slot {
                Some(resolved_slot) => resolved_slots.push(resolved_slot),
                None => debug!("Dropping unresolved slot of '{}'", text),
            }
        }
        resolved_slots.sort_by_key(|slot| slot.range.start);
        Ok(resolved_slots)
    }
}

impl NluEngine {
    /// Extracts the value of a single slot from a bare answer, such as "two" when the number
    /// of cups has been asked for
    pub fn extract_slot(
        &self,
        input: &str,
        intent_name: &str,
        slot_name: &str,
    ) -> Result<Option<Slot>> {
        let intent = self
            .dataset_metadata
            .intent(intent_name)
            .ok_or_else(|| NluError::UnknownIntent(intent_name.to_string()))?;
        let slot = intent
            .slot(slot_name)
            .ok_or_else(|| NluError::UnknownSlot(intent_name.to_string(), slot_name.to_string()))?;
        match self.dataset_metadata.entities.get(&slot.entity) {
            Some(entity) => extract_custom_slot(
                input,
                slot,
                entity,
                self.shared_resources.custom_entity_parser.as_ref(),
                DEFAULT_SLOTS_ALTERNATIVES,
            ),
            None => extract_builtin_slot(
                input,
                slot,
                self.shared_resources.builtin_entity_parser.as_ref(),
                DEFAULT_SLOTS_ALTERNATIVES,
            ),
        }
    }
}

fn empty_result(input: &str) -> IntentParserResult {
    IntentParserResult {
        input: input.to_string(),
        intent: IntentClassifierResult {
            intent_name: None,
            confidence_score: 1.0,
        },
        slots: vec![],
        alternatives: vec![],
    }
}

/// Returns the `(major, minor)` part of a `major.minor.patch` version
fn parse_version(version: &str) -> Option<(u64, u64)> {
    let parts = version
        .trim()
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [major, minor, _patch] => Some((*major, *minor)),
        _ => None,
    }
}

fn check_model_version(model_version: &str) -> Result<()> {
    let unsupported_version = || {
        NluError::UnsupportedSchemaVersion(
            model_version.to_string(),
            MIN_MODEL_VERSION,
            MODEL_VERSION,
        )
    };
    let version = parse_version(model_version).ok_or_else(unsupported_version)?;
    let min_version = parse_version(MIN_MODEL_VERSION).ok_or_else(unsupported_version)?;
    let max_version = parse_version(MODEL_VERSION).ok_or_else(unsupported_version)?;
    if version < min_version || version > max_version {
        return Err(unsupported_version().into());
    }
    Ok(())
}

fn validate_dataset_metadata(dataset_metadata: &DatasetMetadata) -> Result<()> {
    let mut intent_names = HashSet::new();
    for intent in dataset_metadata.intents.iter() {
        if !intent_names.insert(&intent.name) {
            return Err(NluError::CorruptModel(format!(
                "intent '{}' is declared several times",
                intent.name
            ))
            .into());
        }
        for slot in intent.slots.iter() {
            let is_builtin = BuiltinEntityKind::from_identifier(&slot.entity).is_ok();
            if !is_builtin && !dataset_metadata.entities.contains_key(&slot.entity) {
                return Err(NluError::CorruptModel(format!(
                    "slot '{}' of intent '{}' refers to unknown entity '{}'",
                    slot.name, intent.name, slot.entity
                ))
                .into());
            }
        }
    }
    Ok(())
}

fn answer_slot(
    slot: &SlotMetadata,
    raw_value: String,
    value: SlotValue,
    alternatives: Vec<SlotValue>,
    range: Range<usize>,
) -> Slot {
    Slot {
        raw_value,
        value,
        alternatives,
        range,
        entity: slot.entity.clone(),
        slot_name: slot.name.clone(),
        confidence_score: None,
    }
}

/// The last value found in the answer wins, an extensible entity falling back to the whole
/// answer
fn extract_custom_slot(
    input: &str,
    slot: &SlotMetadata,
    entity: &Entity,
    custom_entity_parser: &dyn CustomEntityParser,
    slots_alternatives: usize,
) -> Result<Option<Slot>> {
    let scope = [slot.entity.clone()];
    let last_match = custom_entity_parser
        .extract_entities(input, Some(&scope[..]), slots_alternatives)?
        .pop();
    let extracted_slot = match last_match {
        Some(custom_entity) => answer_slot(
            slot,
            custom_entity.value,
            SlotValue::custom(custom_entity.resolved_value),
            custom_entity
                .alternative_resolved_values
                .into_iter()
                .take(slots_alternatives)
                .map(SlotValue::custom)
                .collect(),
            custom_entity.range,
        ),
        None if entity.automatically_extensible => answer_slot(
            slot,
            input.to_string(),
            SlotValue::custom(input),
            vec![],
            0..input.chars().count(),
        ),
        None => return Ok(None),
    };
    Ok(Some(extracted_slot))
}

/// The first value of the slot kind found in the answer wins
fn extract_builtin_slot(
    input: &str,
    slot: &SlotMetadata,
    builtin_entity_parser: &dyn BuiltinEntityParser,
    slots_alternatives: usize,
) -> Result<Option<Slot>> {
    let kind = BuiltinEntityKind::from_identifier(&slot.entity)?;
    let first_match = builtin_entity_parser
        .extract_entities(input, Some(&[kind][..]), slots_alternatives)?
        .into_iter()
        .next();
    Ok(first_match.map(|builtin_entity| {
        answer_slot(
            slot,
            substring_with_char_range(input, &builtin_entity.range),
            builtin_entity.entity,
            builtin_entity.alternatives,
            builtin_entity.range,
        )
    }))
}
