use std::sync::Arc;

use failure::format_err;
use itertools::Itertools;

use super::crf_utils::{get_scheme_prefix, TaggingScheme};
use super::feature_processor::{Feature, FeatureArgs, FeatureKind};
use super::features_utils::{char_prefix, char_suffix, initial_string_from_tokens};
use crate::entity_parser::{BuiltinEntityParser, CustomEntityParser};
use crate::errors::*;
use crate::nlu_utils::range::ranges_overlap;
use crate::nlu_utils::string::{get_shape, normalize};
use crate::nlu_utils::token::Token;
use crate::ontology::BuiltinEntityKind;
use crate::resources::gazetteer::Gazetteer;
use crate::resources::stemmer::Stemmer;
use crate::resources::word_clusterer::WordClusterer;
use crate::resources::SharedResources;

pub struct IsDigitFeature {}

impl Feature for IsDigitFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::IsDigit
    }

    fn build_features(
        _args: &FeatureArgs,
        _shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        Ok(vec![Box::new(Self {})])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Result<Option<String>> {
        let value = &tokens[token_index].value;
        Ok(if value.chars().all(|c| c.is_digit(10)) {
            Some("1".to_string())
        } else {
            None
        })
    }
}

pub struct LengthFeature {}

impl Feature for LengthFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Length
    }

    fn build_features(
        _args: &FeatureArgs,
        _shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        Ok(vec![Box::new(Self {})])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Result<Option<String>> {
        Ok(Some(format!(
            "{}",
            tokens[token_index].value.chars().count()
        )))
    }
}

pub struct IsFirstFeature {}

impl Feature for IsFirstFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::IsFirst
    }

    fn build_features(
        _args: &FeatureArgs,
        _shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        Ok(vec![Box::new(Self {})])
    }

    fn compute(&self, _tokens: &[Token], token_index: usize) -> Result<Option<String>> {
        Ok(if token_index == 0 {
            Some("1".to_string())
        } else {
            None
        })
    }
}

pub struct IsLastFeature {}

impl Feature for IsLastFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::IsLast
    }

    fn build_features(
        _args: &FeatureArgs,
        _shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        Ok(vec![Box::new(Self {})])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Result<Option<String>> {
        Ok(if token_index + 1 == tokens.len() {
            Some("1".to_string())
        } else {
            None
        })
    }
}

pub struct NgramFeature {
    ngram_size: usize,
    opt_common_words_gazetteer: Option<Arc<dyn Gazetteer>>,
    opt_stemmer: Option<Arc<dyn Stemmer>>,
}

impl Feature for NgramFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Ngram
    }

    fn name(&self) -> String {
        format!("{}_{}", self.kind().identifier(), self.ngram_size)
    }

    fn build_features(
        args: &FeatureArgs,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        let ngram_size = parse_as_u64(args, "n")? as usize;
        let common_words_gazetteer_name = parse_as_opt_string(args, "common_words_gazetteer_name")?;
        let opt_common_words_gazetteer = if let Some(gazetteer_name) = common_words_gazetteer_name
        {
            Some(
                shared_resources
                    .gazetteers
                    .get(&gazetteer_name)
                    .cloned()
                    .ok_or_else(|| {
                        format_err!(
                            "Cannot find gazetteer '{}' in shared resources",
                            gazetteer_name
                        )
                    })?,
            )
        } else {
            None
        };
        let use_stemming = parse_as_bool(args, "use_stemming")?;
        let opt_stemmer = if use_stemming {
            Some(get_stemmer(&shared_resources)?)
        } else {
            None
        };
        Ok(vec![Box::new(Self {
            ngram_size,
            opt_common_words_gazetteer,
            opt_stemmer,
        })])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Result<Option<String>> {
        if self.ngram_size == 0 || token_index + self.ngram_size > tokens.len() {
            return Ok(None);
        }
        let result = tokens[token_index..token_index + self.ngram_size]
            .iter()
            .map(|token| {
                let normalized_value = normalize(&token.value);
                let stemmed_value = self
                    .opt_stemmer
                    .as_ref()
                    .map(|stemmer| stemmer.stem(&normalized_value))
                    .unwrap_or(normalized_value);
                match self.opt_common_words_gazetteer.as_ref() {
                    Some(gazetteer) if !gazetteer.contains(&stemmed_value) => {
                        "rare_word".to_string()
                    }
                    _ => stemmed_value,
                }
            })
            .join(" ");
        Ok(Some(result))
    }
}

pub struct ShapeNgramFeature {
    ngram_size: usize,
}

impl Feature for ShapeNgramFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::ShapeNgram
    }

    fn name(&self) -> String {
        format!("{}_{}", self.kind().identifier(), self.ngram_size)
    }

    fn build_features(
        args: &FeatureArgs,
        _shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        let ngram_size = parse_as_u64(args, "n")? as usize;
        Ok(vec![Box::new(Self { ngram_size })])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Result<Option<String>> {
        let end = token_index + self.ngram_size;
        Ok(if token_index < end && end <= tokens.len() {
            Some(
                tokens[token_index..end]
                    .iter()
                    .map(|token| get_shape(&token.value))
                    .join(" "),
            )
        } else {
            None
        })
    }
}

pub struct PrefixFeature {
    prefix_size: usize,
}

impl Feature for PrefixFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Prefix
    }

    fn name(&self) -> String {
        format!("{}_{}", self.kind().identifier(), self.prefix_size)
    }

    fn build_features(
        args: &FeatureArgs,
        _shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        let prefix_size = parse_as_u64(args, "prefix_size")? as usize;
        Ok(vec![Box::new(Self { prefix_size })])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Result<Option<String>> {
        let normalized = normalize(&tokens[token_index].value);
        Ok(char_prefix(&normalized, self.prefix_size))
    }
}

pub struct SuffixFeature {
    suffix_size: usize,
}

impl Feature for SuffixFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Suffix
    }

    fn name(&self) -> String {
        format!("{}_{}", self.kind().identifier(), self.suffix_size)
    }

    fn build_features(
        args: &FeatureArgs,
        _shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        let suffix_size = parse_as_u64(args, "suffix_size")? as usize;
        Ok(vec![Box::new(Self { suffix_size })])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Result<Option<String>> {
        let normalized = normalize(&tokens[token_index].value);
        Ok(char_suffix(&normalized, self.suffix_size))
    }
}

/// Tags the tokens covered by a value of a custom entity, as found by the custom entity
/// parser on the normalized (and possibly stemmed) tokens
pub struct CustomEntityMatchFeature {
    entity_name: String,
    tagging_scheme: TaggingScheme,
    opt_stemmer: Option<Arc<dyn Stemmer>>,
    custom_entity_parser: Arc<dyn CustomEntityParser>,
}

impl CustomEntityMatchFeature {
    fn transform_tokens(&self, tokens: &[Token]) -> Vec<Token> {
        let mut current_index = 0;
        tokens
            .iter()
            .map(|token| {
                let normalized_value = normalize(&token.value);
                let value = self
                    .opt_stemmer
                    .as_ref()
                    .map(|stemmer| stemmer.stem(&normalized_value))
                    .unwrap_or(normalized_value);
                let byte_start = current_index;
                let char_len = value.chars().count();
                let transformed = Token::new(
                    value.clone(),
                    byte_start..byte_start + value.len(),
                    current_index..current_index + char_len,
                );
                current_index += char_len + 1;
                transformed
            })
            .collect()
    }
}

impl Feature for CustomEntityMatchFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::EntityMatch
    }

    fn name(&self) -> String {
        format!("{}_{}", self.kind().identifier(), self.entity_name)
    }

    fn build_features(
        args: &FeatureArgs,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        let entities = parse_as_vec_string(args, "entities")?;
        let tagging_scheme_code = parse_as_u64(args, "tagging_scheme_code")? as u8;
        let tagging_scheme = TaggingScheme::from_u8(tagging_scheme_code)?;
        let use_stemming = parse_as_bool(args, "use_stemming")?;
        let opt_stemmer = if use_stemming {
            Some(get_stemmer(&shared_resources)?)
        } else {
            None
        };
        Ok(entities
            .into_iter()
            .map(|entity_name| {
                Box::new(Self {
                    entity_name,
                    tagging_scheme,
                    opt_stemmer: opt_stemmer.clone(),
                    custom_entity_parser: shared_resources.custom_entity_parser.clone(),
                }) as Box<_>
            })
            .collect())
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Result<Option<String>> {
        Ok(self
            .compute_all(tokens)?
            .into_iter()
            .nth(token_index)
            .and_then(|value| value))
    }

    fn compute_all(&self, tokens: &[Token]) -> Result<Vec<Option<String>>> {
        let transformed_tokens = self.transform_tokens(tokens);
        let text = initial_string_from_tokens(&transformed_tokens);
        let entities = self.custom_entity_parser.extract_entities(
            &text,
            Some(&[self.entity_name.clone()]),
            0,
        )?;
        Ok(tag_entity_tokens(
            &transformed_tokens,
            entities.into_iter().map(|entity| entity.range),
            self.tagging_scheme,
        ))
    }
}

/// Tags the tokens covered by a builtin entity of a given kind
pub struct BuiltinEntityMatchFeature {
    tagging_scheme: TaggingScheme,
    builtin_entity_kind: BuiltinEntityKind,
    builtin_entity_parser: Arc<dyn BuiltinEntityParser>,
}

impl Feature for BuiltinEntityMatchFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::BuiltinEntityMatch
    }

    fn name(&self) -> String {
        format!(
            "{}_{}",
            self.kind().identifier(),
            self.builtin_entity_kind.identifier()
        )
    }

    fn build_features(
        args: &FeatureArgs,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        let builtin_entity_labels = parse_as_vec_string(args, "entity_labels")?;
        let tagging_scheme_code = parse_as_u64(args, "tagging_scheme_code")? as u8;
        let tagging_scheme = TaggingScheme::from_u8(tagging_scheme_code)?;
        builtin_entity_labels
            .into_iter()
            .map(|label| {
                let builtin_entity_kind = BuiltinEntityKind::from_identifier(&label)?;
                Ok(Box::new(Self {
                    tagging_scheme,
                    builtin_entity_kind,
                    builtin_entity_parser: shared_resources.builtin_entity_parser.clone(),
                }) as Box<_>)
            })
            .collect()
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Result<Option<String>> {
        Ok(self
            .compute_all(tokens)?
            .into_iter()
            .nth(token_index)
            .and_then(|value| value))
    }

    fn compute_all(&self, tokens: &[Token]) -> Result<Vec<Option<String>>> {
        let text = initial_string_from_tokens(tokens);
        let entities = self.builtin_entity_parser.extract_entities(
            &text,
            Some(&[self.builtin_entity_kind]),
            0,
        )?;
        Ok(tag_entity_tokens(
            tokens,
            entities.into_iter().map(|entity| entity.range),
            self.tagging_scheme,
        ))
    }
}

pub struct WordClusterFeature {
    cluster_name: String,
    word_clusterer: Arc<dyn WordClusterer>,
}

impl Feature for WordClusterFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::WordCluster
    }

    fn name(&self) -> String {
        format!("{}_{}", self.kind().identifier(), self.cluster_name)
    }

    fn build_features(
        args: &FeatureArgs,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        let cluster_name = parse_as_string(args, "cluster_name")?;
        let word_clusterer = shared_resources
            .word_clusterers
            .get(&cluster_name)
            .cloned()
            .ok_or_else(|| {
                format_err!(
                    "Cannot find word clusters '{}' in shared resources",
                    cluster_name
                )
            })?;
        Ok(vec![Box::new(Self {
            cluster_name,
            word_clusterer,
        })])
    }

    fn compute(&self, tokens: &[Token], token_index: usize) -> Result<Option<String>> {
        Ok(self
            .word_clusterer
            .get_cluster(&normalize(&tokens[token_index].value)))
    }
}

/// Tags each token with the scheme prefix of the first entity it overlaps
fn tag_entity_tokens<I>(
    tokens: &[Token],
    entity_ranges: I,
    tagging_scheme: TaggingScheme,
) -> Vec<Option<String>>
where
    I: Iterator<Item = std::ops::Range<usize>>,
{
    let mut tags = vec![None; tokens.len()];
    for entity_range in entity_ranges {
        let entity_token_indexes = (0..tokens.len())
            .filter(|i| ranges_overlap(&tokens[*i].char_range, &entity_range))
            .collect_vec();
        for token_index in entity_token_indexes.iter() {
            if tags[*token_index].is_none() {
                tags[*token_index] = Some(
                    get_scheme_prefix(*token_index, &entity_token_indexes, tagging_scheme)
                        .to_string(),
                );
            }
        }
    }
    tags
}

fn get_stemmer(shared_resources: &SharedResources) -> Result<Arc<dyn Stemmer>> {
    shared_resources
        .stemmer
        .as_ref()
        .cloned()
        .ok_or_else(|| format_err!("Cannot find stemmer in shared resources"))
}

fn parse_as_string(args: &FeatureArgs, arg_name: &str) -> Result<String> {
    Ok(args
        .get(arg_name)
        .ok_or_else(|| format_err!("can't retrieve '{}' parameter", arg_name))?
        .as_str()
        .ok_or_else(|| format_err!("'{}' isn't a string", arg_name))?
        .to_string())
}

fn parse_as_opt_string(args: &FeatureArgs, arg_name: &str) -> Result<Option<String>> {
    Ok(args
        .get(arg_name)
        .and_then(|value| value.as_str())
        .map(|s| s.to_string()))
}

fn parse_as_vec_string(args: &FeatureArgs, arg_name: &str) -> Result<Vec<String>> {
    args.get(arg_name)
        .ok_or_else(|| format_err!("can't retrieve '{}' parameter", arg_name))?
        .as_array()
        .ok_or_else(|| format_err!("'{}' isn't an array", arg_name))?
        .iter()
        .map(|v| {
            Ok(v.as_str()
                .ok_or_else(|| format_err!("'{}' is not a string", v))?
                .to_string())
        })
        .collect()
}

fn parse_as_bool(args: &FeatureArgs, arg_name: &str) -> Result<bool> {
    args.get(arg_name)
        .ok_or_else(|| format_err!("can't retrieve '{}' parameter", arg_name))?
        .as_bool()
        .ok_or_else(|| format_err!("'{}' isn't a bool", arg_name))
}

fn parse_as_u64(args: &FeatureArgs, arg_name: &str) -> Result<u64> {
    args.get(arg_name)
        .ok_or_else(|| format_err!("can't retrieve '{}' parameter", arg_name))?
        .as_u64()
        .ok_or_else(|| format_err!("'{}' isn't a u64", arg_name))
}
