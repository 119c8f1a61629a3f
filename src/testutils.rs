use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::iter::FromIterator;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lazy_static::lazy_static;
use ndarray::prelude::*;
use tempfile::TempDir;

use crate::entity_parser::{BuiltinEntityParser, CustomEntity, CustomEntityParser};
use crate::errors::*;
use crate::models::{NluEngineModel, SlotFillerModel};
use crate::ontology::{BuiltinEntity, BuiltinEntityKind};
use crate::resources::gazetteer::Gazetteer;
use crate::resources::loading::load_engine_shared_resources;
use crate::resources::stemmer::Stemmer;
use crate::resources::word_clusterer::WordClusterer;
use crate::resources::SharedResources;
use crate::slot_filler::{train_crf_model, TaggedUtterance};

pub fn epsilon_eq(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}

pub fn assert_epsilon_eq_array1(a: &Array1<f32>, b: &Array1<f32>, epsilon: f32) {
    assert_eq!(a.len(), b.len(), "{} != {}", a, b);
    for (index, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        assert!(epsilon_eq(*x, *y, epsilon), "{} != {} at index {}", x, y, index);
    }
}

pub fn file_path(filename: &str) -> PathBuf {
    Path::new("data").join("tests").join(filename)
}

lazy_static! {
    static ref TRAINED_ENGINE_DIR: TempDir = build_fixture_engine().unwrap();
}

/// Directory of the trained beverages engine used across the tests
///
/// The bundle of `data/tests/models/nlu_engine` is copied once per test run, and its crfsuite
/// models are trained from the utterances of `data/tests/crf_training`.
pub fn fixture_engine_dir() -> PathBuf {
    TRAINED_ENGINE_DIR.path().join("nlu_engine")
}

pub fn load_fixture_shared_resources() -> Arc<SharedResources> {
    load_shared_resources(&fixture_engine_dir()).unwrap()
}

fn load_shared_resources(engine_dir: &Path) -> Result<Arc<SharedResources>> {
    let manifest = File::open(engine_dir.join("nlu_engine.json"))?;
    let model: NluEngineModel = serde_json::from_reader(manifest)?;
    load_engine_shared_resources(engine_dir, &model, None)
}

fn build_fixture_engine() -> Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let engine_dir = temp_dir.path().join("nlu_engine");
    copy_dir(&file_path("models").join("nlu_engine"), &engine_dir)?;
    let shared_resources = load_shared_resources(&engine_dir)?;
    for entry in fs::read_dir(engine_dir.join("probabilistic_intent_parser"))? {
        let slot_filler_dir = entry?.path();
        if !slot_filler_dir.join("slot_filler.json").exists() {
            continue;
        }
        let model: SlotFillerModel =
            serde_json::from_reader(File::open(slot_filler_dir.join("slot_filler.json"))?)?;
        let crf_model_file = match model.crf_model_file.as_ref() {
            Some(crf_model_file) => crf_model_file,
            None => continue,
        };
        let training_file = file_path("crf_training").join(format!("{}.json", model.intent));
        let utterances: Vec<TaggedUtterance> =
            serde_json::from_reader(File::open(training_file)?)?;
        train_crf_model(
            &model,
            shared_resources.clone(),
            &utterances,
            &slot_filler_dir.join(crf_model_file),
        )?;
    }
    Ok(temp_dir)
}

fn copy_dir(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

/// Shared resources made of mocked entity parsers and no lexical resource, unless specified
pub struct SharedResourcesBuilder {
    resources: SharedResources,
}

impl Default for SharedResourcesBuilder {
    fn default() -> Self {
        Self {
            resources: SharedResources {
                builtin_entity_parser: Arc::new(MockedBuiltinEntityParser::default()),
                custom_entity_parser: Arc::new(MockedCustomEntityParser::default()),
                gazetteers: HashMap::new(),
                stemmer: None,
                word_clusterers: HashMap::new(),
                stop_words: HashSet::new(),
            },
        }
    }
}

impl SharedResourcesBuilder {
    pub fn builtin_entity_parser<P: BuiltinEntityParser + 'static>(mut self, parser: P) -> Self {
        self.resources.builtin_entity_parser = Arc::new(parser);
        self
    }

    pub fn custom_entity_parser<P: CustomEntityParser + 'static>(mut self, parser: P) -> Self {
        self.resources.custom_entity_parser = Arc::new(parser);
        self
    }

    pub fn gazetteer<G: Gazetteer + 'static>(mut self, name: &str, gazetteer: G) -> Self {
        self.resources
            .gazetteers
            .insert(name.to_string(), Arc::new(gazetteer));
        self
    }

    pub fn stemmer<S: Stemmer + 'static>(mut self, stemmer: S) -> Self {
        self.resources.stemmer = Some(Arc::new(stemmer));
        self
    }

    pub fn word_clusterer<W: WordClusterer + 'static>(mut self, name: &str, clusterer: W) -> Self {
        self.resources
            .word_clusterers
            .insert(name.to_string(), Arc::new(clusterer));
        self
    }

    pub fn stop_words(mut self, stop_words: HashSet<String>) -> Self {
        self.resources.stop_words = stop_words;
        self
    }

    pub fn build(self) -> SharedResources {
        self.resources
    }
}

pub trait MockedEntity: Clone {
    type Kind: PartialEq;

    fn kind(&self) -> &Self::Kind;
}

impl MockedEntity for BuiltinEntity {
    type Kind = BuiltinEntityKind;

    fn kind(&self) -> &BuiltinEntityKind {
        &self.entity_kind
    }
}

impl MockedEntity for CustomEntity {
    type Kind = String;

    fn kind(&self) -> &String {
        &self.entity_identifier
    }
}

/// Entity parser returning the entities registered for a sentence, restricted to the
/// requested kinds
pub struct MockedEntityParser<E> {
    entities_per_sentence: HashMap<String, Vec<E>>,
}

pub type MockedBuiltinEntityParser = MockedEntityParser<BuiltinEntity>;
pub type MockedCustomEntityParser = MockedEntityParser<CustomEntity>;

impl<E: MockedEntity> MockedEntityParser<E> {
    fn lookup(&self, sentence: &str, kinds: Option<&[E::Kind]>) -> Vec<E> {
        self.entities_per_sentence
            .get(sentence)
            .into_iter()
            .flatten()
            .filter(|entity| kinds.map_or(true, |kinds| kinds.contains(entity.kind())))
            .cloned()
            .collect()
    }
}

impl<E> Default for MockedEntityParser<E> {
    fn default() -> Self {
        Self {
            entities_per_sentence: HashMap::new(),
        }
    }
}

impl<E> FromIterator<(String, Vec<E>)> for MockedEntityParser<E> {
    fn from_iter<T: IntoIterator<Item = (String, Vec<E>)>>(iter: T) -> Self {
        Self {
            entities_per_sentence: iter.into_iter().collect(),
        }
    }
}

impl BuiltinEntityParser for MockedBuiltinEntityParser {
    fn extract_entities(
        &self,
        sentence: &str,
        filter_entity_kinds: Option<&[BuiltinEntityKind]>,
        _max_alternative_resolved_values: usize,
    ) -> Result<Vec<BuiltinEntity>> {
        Ok(self.lookup(sentence, filter_entity_kinds))
    }
}

impl CustomEntityParser for MockedCustomEntityParser {
    fn extract_entities(
        &self,
        sentence: &str,
        filter_entity_kinds: Option<&[String]>,
        _max_alternative_resolved_values: usize,
    ) -> Result<Vec<CustomEntity>> {
        Ok(self.lookup(sentence, filter_entity_kinds))
    }
}
