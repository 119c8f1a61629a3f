use std::collections::HashMap;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use failure::ResultExt;
use serde::de::DeserializeOwned;
use zip::read::ZipFile;
use zip::ZipArchive;

use crate::entity_parser::CustomEntity;
use crate::errors::*;
use crate::nlu_utils::range::ranges_overlap;
use crate::nlu_utils::string::{substring_with_char_range, suffix_from_char_index};
use crate::ontology::BuiltinEntity;

pub type IntentName = String;
pub type SlotName = String;
pub type EntityName = String;

pub const MANIFEST_FILENAME: &str = "nlu_engine.json";

/// Deserializes the json file at `path`, any failure meaning that the model is corrupted
pub fn load_json_file<T: DeserializeOwned>(path: &Path, description: &str) -> Result<T> {
    let file = fs::File::open(path).with_context(|_| {
        NluError::CorruptModel(format!("cannot open {} file {:?}", description, path))
    })?;
    let value = serde_json::from_reader(io::BufReader::new(file)).with_context(|_| {
        NluError::CorruptModel(format!("cannot deserialize {} file {:?}", description, path))
    })?;
    Ok(value)
}

pub fn deduplicate_overlapping_items<I, O, S, K>(
    items: Vec<I>,
    overlap: O,
    sort_key_fn: S,
) -> Vec<I>
where
    O: Fn(&I, &I) -> bool,
    S: FnMut(&I) -> K,
    K: Ord,
{
    let mut sorted_items = items;
    sorted_items.sort_by_key(sort_key_fn);
    let mut deduplicated_items: Vec<I> = Vec::with_capacity(sorted_items.len());
    for item in sorted_items {
        if !deduplicated_items
            .iter()
            .any(|dedup_item| overlap(dedup_item, &item))
        {
            deduplicated_items.push(item);
        }
    }
    deduplicated_items
}

/// Extracts a zipped nlu engine into `dest_path` and returns the directory holding the manifest
///
/// The manifest may either sit at the root of the archive or inside a single top level
/// directory.
pub fn extract_nlu_engine_zip_archive<R: io::Read + io::Seek>(
    zip_reader: R,
    dest_path: &Path,
) -> Result<PathBuf> {
    let mut archive = ZipArchive::new(zip_reader).with_context(|_| {
        NluError::InvalidArchive("could not read nlu engine zip data".to_string())
    })?;
    if archive.len() == 0 {
        return Err(NluError::InvalidArchive("archive is empty".to_string()).into());
    }
    for file_index in 0..archive.len() {
        let mut file = archive.by_index(file_index).with_context(|_| {
            NluError::InvalidArchive(format!("could not read archive entry {}", file_index))
        })?;
        let relative_path = file.enclosed_name().map(Path::to_path_buf).ok_or_else(|| {
            NluError::InvalidArchive(format!(
                "entry '{}' points outside of the archive",
                file.name()
            ))
        })?;
        let outpath = dest_path.join(relative_path);
        write_archive_entry(&mut file, &outpath).with_context(|_| {
            NluError::InvalidArchive(format!("could not extract '{}'", file.name()))
        })?;
    }
    find_engine_dir(dest_path)
}

fn write_archive_entry(file: &mut ZipFile<'_>, outpath: &Path) -> io::Result<()> {
    if file.is_dir() {
        return fs::create_dir_all(outpath);
    }
    if let Some(parent) = outpath.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut outfile = fs::File::create(outpath)?;
    io::copy(file, &mut outfile)?;
    Ok(())
}

fn find_engine_dir(extracted_path: &Path) -> Result<PathBuf> {
    if extracted_path.join(MANIFEST_FILENAME).is_file() {
        return Ok(extracted_path.to_path_buf());
    }
    let sub_dirs = list_sub_dirs(extracted_path).with_context(|_| {
        NluError::InvalidArchive(format!("cannot list extracted files in {:?}", extracted_path))
    })?;
    match sub_dirs.as_slice() {
        [engine_dir] if engine_dir.join(MANIFEST_FILENAME).is_file() => Ok(engine_dir.clone()),
        _ => Err(NluError::ModelNotFound(format!(
            "no '{}' found in nlu engine archive",
            MANIFEST_FILENAME
        ))
        .into()),
    }
}

fn list_sub_dirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut sub_dirs = vec![];
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            sub_dirs.push(path);
        }
    }
    Ok(sub_dirs)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchedEntity {
    pub range: Range<usize>,
    pub entity_name: String,
}

impl From<BuiltinEntity> for MatchedEntity {
    fn from(entity: BuiltinEntity) -> Self {
        MatchedEntity {
            range: entity.range,
            entity_name: entity.entity_kind.identifier().to_string(),
        }
    }
}

impl From<CustomEntity> for MatchedEntity {
    fn from(entity: CustomEntity) -> Self {
        MatchedEntity {
            range: entity.range,
            entity_name: entity.entity_identifier,
        }
    }
}

/// Replaces the matched entities of `text` with placeholders
///
/// Returns the mapping from the ranges of the placeholders in the new text to the ranges of
/// the entities in the original text, along with the new text. Ranges are char ranges.
pub fn replace_entities<F>(
    text: &str,
    matched_entities: Vec<MatchedEntity>,
    placeholder_fn: F,
) -> (HashMap<Range<usize>, Range<usize>>, String)
where
    F: Fn(&str) -> String,
{
    if matched_entities.is_empty() {
        return (HashMap::new(), text.to_string());
    }

    let dedup_matches = deduplicate_overlapping_entities(matched_entities);

    let mut range_mapping: HashMap<Range<usize>, Range<usize>> = HashMap::new();
    let mut processed_text = String::new();
    let mut offset: i64 = 0;
    let mut current_ix = 0;

    for matched_entity in dedup_matches {
        let range_start = (matched_entity.range.start as i64 + offset) as usize;
        processed_text.push_str(&substring_with_char_range(
            text,
            &(current_ix..matched_entity.range.start),
        ));
        let entity_text = placeholder_fn(&*matched_entity.entity_name);
        processed_text.push_str(&entity_text);
        offset += entity_text.chars().count() as i64 - matched_entity.range.len() as i64;
        let range_end = (matched_entity.range.end as i64 + offset) as usize;
        current_ix = matched_entity.range.end;
        range_mapping.insert(range_start..range_end, matched_entity.range);
    }

    processed_text.push_str(&suffix_from_char_index(text, current_ix));
    (range_mapping, processed_text)
}

/// Keeps the longest entities first, then the earliest ones, sorted by start offset
pub fn deduplicate_overlapping_entities(entities: Vec<MatchedEntity>) -> Vec<MatchedEntity> {
    let entities_overlap = |lhs_entity: &MatchedEntity, rhs_entity: &MatchedEntity| {
        ranges_overlap(&lhs_entity.range, &rhs_entity.range)
    };
    let entity_sort_key =
        |entity: &MatchedEntity| (-(entity.range.len() as i64), entity.range.start);
    let mut deduped = deduplicate_overlapping_items(entities, entities_overlap, entity_sort_key);
    deduped.sort_by_key(|entity| entity.range.start);
    deduped
}
