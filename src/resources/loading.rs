use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use failure::ResultExt;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::entity_parser::{
    BuiltinEntityParser, CustomEntityParser, RuleBasedBuiltinEntityParser,
    TableCustomEntityParser,
};
use crate::errors::*;
use crate::language::Language;
use crate::models::NluEngineModel;
use crate::resources::gazetteer::{read_word_set, Gazetteer, HashSetGazetteer};
use crate::resources::stemmer::{HashMapStemmer, Stemmer};
use crate::resources::word_clusterer::{HashMapWordClusterer, WordClusterer};
use crate::resources::SharedResources;

const STEMMING_DIR: &str = "stemming";
const GAZETTEERS_DIR: &str = "gazetteers";
const WORD_CLUSTERS_DIR: &str = "word_clusters";

/// Content of `resources/<language>/metadata.json`, naming the text files to load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ResourcesMetadata {
    language: String,
    gazetteers: Option<Vec<String>>,
    word_clusters: Option<Vec<String>>,
    stems: Option<String>,
    stop_words: Option<String>,
}

/// Loads the resources of an engine bundle, along with its entity parsers
///
/// The builtin entity parser of the bundle is used unless `builtin_entity_parser` is provided.
pub fn load_engine_shared_resources<P: AsRef<Path>>(
    engine_dir: P,
    model: &NluEngineModel,
    builtin_entity_parser: Option<Arc<dyn BuiltinEntityParser>>,
) -> Result<Arc<SharedResources>> {
    let engine_dir = engine_dir.as_ref();
    let language: Language = model.dataset_metadata.language_code.parse()?;
    let builtin_entity_parser = match builtin_entity_parser {
        Some(parser) => parser,
        None => Arc::new(RuleBasedBuiltinEntityParser::from_path(
            engine_dir.join(&model.builtin_entity_parser),
        )?),
    };
    load_shared_resources(
        engine_dir.join("resources").join(language.to_string()),
        builtin_entity_parser,
        engine_dir.join(&model.custom_entity_parser),
    )
}

pub fn load_shared_resources<P: AsRef<Path>, Q: AsRef<Path>>(
    resources_dir: P,
    builtin_entity_parser: Arc<dyn BuiltinEntityParser>,
    custom_entity_parser_path: Q,
) -> Result<Arc<SharedResources>> {
    let resources_dir = resources_dir.as_ref();
    let metadata: ResourcesMetadata = load_resource(
        &resources_dir.join("metadata.json"),
        "resources metadata",
        |file| Ok(serde_json::from_reader(file)?),
    )?;
    let language: Language = metadata.language.parse()?;
    info!("Loading shared resources for language '{}' ...", language);

    let stemmer = metadata
        .stems
        .as_ref()
        .map(|stems_name| -> Result<Arc<dyn Stemmer>> {
            let path = text_file_path(resources_dir, Some(STEMMING_DIR), stems_name);
            let stemmer = load_resource(&path, "stems", HashMapStemmer::from_reader)?;
            Ok(Arc::new(stemmer))
        })
        .transpose()?;

    let gazetteers = metadata
        .gazetteers
        .iter()
        .flatten()
        .map(|name| -> Result<(String, Arc<dyn Gazetteer>)> {
            let path = text_file_path(resources_dir, Some(GAZETTEERS_DIR), name);
            let gazetteer = load_resource(&path, "gazetteer", HashSetGazetteer::from_reader)?;
            Ok((name.to_string(), Arc::new(gazetteer)))
        })
        .collect::<Result<HashMap<_, _>>>()?;

    let word_clusterers = metadata
        .word_clusters
        .iter()
        .flatten()
        .map(|name| -> Result<(String, Arc<dyn WordClusterer>)> {
            let path = text_file_path(resources_dir, Some(WORD_CLUSTERS_DIR), name);
            let clusterer =
                load_resource(&path, "word clusters", HashMapWordClusterer::from_reader)?;
            Ok((name.to_string(), Arc::new(clusterer)))
        })
        .collect::<Result<HashMap<_, _>>>()?;

    let stop_words = match metadata.stop_words.as_ref() {
        Some(name) => load_resource(
            &text_file_path(resources_dir, None, name),
            "stop words",
            read_word_set,
        )?,
        None => HashSet::new(),
    };

    let custom_entity_parser: Arc<dyn CustomEntityParser> = Arc::new(
        TableCustomEntityParser::from_path(custom_entity_parser_path, stemmer.clone())?,
    );
    info!("Shared resources loaded");

    Ok(Arc::new(SharedResources {
        builtin_entity_parser,
        custom_entity_parser,
        gazetteers,
        stemmer,
        word_clusterers,
        stop_words,
    }))
}

fn text_file_path(resources_dir: &Path, sub_dir: Option<&str>, name: &str) -> PathBuf {
    let dir = match sub_dir {
        Some(sub_dir) => resources_dir.join(sub_dir),
        None => resources_dir.to_path_buf(),
    };
    dir.join(name).with_extension("txt")
}

fn load_resource<T, F>(path: &Path, description: &str, read: F) -> Result<T>
where
    F: FnOnce(File) -> Result<T>,
{
    debug!("Loading {} ({:?})", description, path);
    let file = File::open(path).with_context(|_| {
        NluError::CorruptModel(format!("cannot open {} file {:?}", description, path))
    })?;
    let resource = read(file).with_context(|_| {
        NluError::CorruptModel(format!("cannot read {} file {:?}", description, path))
    })?;
    Ok(resource)
}
