use std::collections::HashMap;
use std::sync::Arc;

use failure::format_err;

use crate::errors::*;
use crate::models::FeatureFactory;
use crate::nlu_utils::token::Token;
use crate::resources::SharedResources;
use crate::slot_filler::features::*;

/// Kinds of token features a slot filler can be trained with
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    IsDigit,
    Length,
    IsFirst,
    IsLast,
    Ngram,
    ShapeNgram,
    Prefix,
    Suffix,
    EntityMatch,
    BuiltinEntityMatch,
    WordCluster,
}

impl FeatureKind {
    const ALL: [FeatureKind; 11] = [
        FeatureKind::IsDigit,
        FeatureKind::Length,
        FeatureKind::IsFirst,
        FeatureKind::IsLast,
        FeatureKind::Ngram,
        FeatureKind::ShapeNgram,
        FeatureKind::Prefix,
        FeatureKind::Suffix,
        FeatureKind::EntityMatch,
        FeatureKind::BuiltinEntityMatch,
        FeatureKind::WordCluster,
    ];

    /// Name of the factory in the model, also used as prefix of the feature names
    pub fn identifier(self) -> &'static str {
        match self {
            FeatureKind::IsDigit => "is_digit",
            FeatureKind::Length => "length",
            FeatureKind::IsFirst => "is_first",
            FeatureKind::IsLast => "is_last",
            FeatureKind::Ngram => "ngram",
            FeatureKind::ShapeNgram => "shape_ngram",
            FeatureKind::Prefix => "prefix",
            FeatureKind::Suffix => "suffix",
            FeatureKind::EntityMatch => "entity_match",
            FeatureKind::BuiltinEntityMatch => "builtin_entity_match",
            FeatureKind::WordCluster => "word_cluster",
        }
    }

    fn from_factory_name(factory_name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.identifier() == factory_name)
    }

    fn build_features(
        self,
        args: &FeatureArgs,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn Feature>>> {
        match self {
            FeatureKind::IsDigit => IsDigitFeature::build_features(args, shared_resources),
            FeatureKind::Length => LengthFeature::build_features(args, shared_resources),
            FeatureKind::IsFirst => IsFirstFeature::build_features(args, shared_resources),
            FeatureKind::IsLast => IsLastFeature::build_features(args, shared_resources),
            FeatureKind::Ngram => NgramFeature::build_features(args, shared_resources),
            FeatureKind::ShapeNgram => ShapeNgramFeature::build_features(args, shared_resources),
            FeatureKind::Prefix => PrefixFeature::build_features(args, shared_resources),
            FeatureKind::Suffix => SuffixFeature::build_features(args, shared_resources),
            FeatureKind::EntityMatch => {
                CustomEntityMatchFeature::build_features(args, shared_resources)
            }
            FeatureKind::BuiltinEntityMatch => {
                BuiltinEntityMatchFeature::build_features(args, shared_resources)
            }
            FeatureKind::WordCluster => {
                WordClusterFeature::build_features(args, shared_resources)
            }
        }
    }
}

pub type FeatureArgs = HashMap<String, serde_json::Value>;

pub trait Feature: Send + Sync {
    fn kind(&self) -> FeatureKind;

    fn name(&self) -> String {
        self.kind().identifier().to_string()
    }

    fn build_features(
        args: &FeatureArgs,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Vec<Box<dyn Feature>>>
    where
        Self: Sized;

    fn compute(&self, tokens: &[Token], token_index: usize) -> Result<Option<String>>;

    /// Computes the feature for every token of the sentence
    fn compute_all(&self, tokens: &[Token]) -> Result<Vec<Option<String>>> {
        (0..tokens.len())
            .map(|token_index| self.compute(tokens, token_index))
            .collect()
    }
}

/// A feature attached to the neighbouring tokens found at some offsets
struct OffsetFeature {
    feature: Box<dyn Feature>,
    /// Offset along with the name the feature takes at this offset, `name[-1]` for instance
    named_offsets: Vec<(i32, String)>,
}

impl OffsetFeature {
    fn new(feature: Box<dyn Feature>, offsets: &[i32]) -> Self {
        let name = feature.name();
        let named_offsets = offsets
            .iter()
            .map(|offset| match offset {
                0 => (0, name.clone()),
                _ => (*offset, format!("{}[{:+}]", name, offset)),
            })
            .collect();
        Self {
            feature,
            named_offsets,
        }
    }
}

/// Computes the crf attributes of a tokenized sentence
pub struct ProbabilisticFeatureProcessor {
    features: Vec<OffsetFeature>,
}

impl ProbabilisticFeatureProcessor {
    pub fn new(
        factories: &[FeatureFactory],
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        let mut features = vec![];
        for factory in factories {
            let kind = FeatureKind::from_factory_name(&factory.factory_name).ok_or_else(|| {
                format_err!("Unknown feature factory '{}'", factory.factory_name)
            })?;
            for feature in kind.build_features(&factory.args, shared_resources.clone())? {
                features.push(OffsetFeature::new(feature, &factory.offsets));
            }
        }
        Ok(Self { features })
    }

    /// Computes the `(name, value)` features of each token
    ///
    /// The value of a feature at token `i` is attached to token `i - offset` under the name
    /// `name[offset]`.
    pub fn compute_features(&self, tokens: &[Token]) -> Result<Vec<Vec<(String, String)>>> {
        let nb_tokens = tokens.len() as i32;
        let mut features = vec![vec![]; tokens.len()];
        for offset_feature in self.features.iter() {
            let values = offset_feature.feature.compute_all(tokens)?;
            for (index, value) in values.into_iter().enumerate() {
                let value = match value {
                    Some(value) => value,
                    None => continue,
                };
                for (offset, name) in offset_feature.named_offsets.iter() {
                    let target = index as i32 - offset;
                    if (0..nb_tokens).contains(&target) {
                        features[target as usize].push((name.clone(), value.clone()));
                    }
                }
            }
        }
        Ok(features)
    }
}
