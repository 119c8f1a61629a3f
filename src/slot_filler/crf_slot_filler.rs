use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crfsuite::{Attribute, Item, Model as CrfModel};
use failure::{format_err, ResultExt};
use log::{debug, info};

use crate::errors::*;
use crate::language::Language;
use crate::models::SlotFillerModel;
use crate::nlu_utils::token::tokenize;
use crate::resources::SharedResources;
use crate::slot_filler::crf_utils::*;
use crate::slot_filler::feature_processor::ProbabilisticFeatureProcessor;
use crate::slot_filler::SlotFiller;
use crate::slot_utils::*;
use crate::utils::{load_json_file, EntityName, SlotName};

/// Slot filler tagging each token with a crfsuite linear chain CRF
///
/// Intents without any slot have no CRF model and never yield slots.
pub struct CRFSlotFiller {
    language: Language,
    tagging_scheme: TaggingScheme,
    crf: Option<Crf>,
    slot_name_mapping: HashMap<SlotName, EntityName>,
}

struct Crf {
    model: CrfModel,
    feature_processor: ProbabilisticFeatureProcessor,
}

impl CRFSlotFiller {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        let dir = path.as_ref();
        let model: SlotFillerModel = load_json_file(&dir.join("slot_filler.json"), "slot filler")?;
        info!("Loading slot filler of intent '{}' ...", model.intent);
        let crf_model = match model.crf_model_file.as_ref() {
            Some(crf_model_file) => Some(load_crf_model(&dir.join(crf_model_file))?),
            None => None,
        };
        let slot_filler = Self::new(model, crf_model, shared_resources)?;
        info!("Slot filler loaded");
        Ok(slot_filler)
    }

    pub fn new(
        model: SlotFillerModel,
        crf_model: Option<CrfModel>,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        let tagging_scheme = TaggingScheme::from_u8(model.config.tagging_scheme)?;
        let language: Language = model.language_code.parse()?;
        let crf = match crf_model {
            Some(crf_model) => {
                let labels = crf_model
                    .tagger()?
                    .labels()?
                    .iter()
                    .map(|label| decode_tag(label))
                    .collect::<Result<Vec<String>>>()
                    .with_context(|_| {
                        NluError::CorruptModel(format!(
                            "invalid crf labels in slot filler of intent '{}'",
                            model.intent
                        ))
                    })?;
                let unknown_label = labels.iter().find(|label| {
                    *label != OUTSIDE
                        && !model
                            .slot_name_mapping
                            .contains_key(&tag_name_to_slot_name(label))
                });
                if let Some(label) = unknown_label {
                    return Err(NluError::CorruptModel(format!(
                        "crf label '{}' of intent '{}' refers to an unknown slot",
                        label, model.intent
                    ))
                    .into());
                }
                let feature_processor = ProbabilisticFeatureProcessor::new(
                    &model.config.feature_factory_configs,
                    shared_resources,
                )?;
                Some(Crf {
                    model: crf_model,
                    feature_processor,
                })
            }
            None => None,
        };
        Ok(Self {
            language,
            tagging_scheme,
            crf,
            slot_name_mapping: model.slot_name_mapping,
        })
    }
}

impl SlotFiller for CRFSlotFiller {
    fn get_tagging_scheme(&self) -> TaggingScheme {
        self.tagging_scheme
    }

    fn get_slots(&self, text: &str) -> Result<Vec<InternalSlot>> {
        let crf = match self.crf.as_ref() {
            Some(crf) => crf,
            None => return Ok(vec![]),
        };
        let tokens = tokenize(text, self.language);
        if tokens.is_empty() {
            return Ok(vec![]);
        }
        let features = crf.feature_processor.compute_features(&tokens)?;
        // Tagging mutates the tagger, which is hence created for each query
        let tags = crf
            .model
            .tagger()?
            .tag(&to_crf_items(&features))?
            .iter()
            .map(|tag| decode_tag(tag))
            .collect::<Result<Vec<String>>>()?;
        debug!("Tags of '{}': {:?}", text, tags);
        tags_to_slots(
            text,
            &tokens,
            &tags,
            self.tagging_scheme,
            &self.slot_name_mapping,
        )
    }
}

fn load_crf_model(path: &Path) -> Result<CrfModel> {
    let path_str = path
        .to_str()
        .ok_or_else(|| format_err!("Invalid crf model path {:?}", path))?;
    Ok(CrfModel::from_file(path_str)
        .with_context(|_| NluError::CorruptModel(format!("cannot load crf model {:?}", path)))?)
}

/// Each `(name, value)` feature becomes a binary crfsuite attribute named `name:value`
fn to_crf_items(features: &[Vec<(String, String)>]) -> Vec<Item> {
    features
        .iter()
        .map(|token_features| {
            token_features
                .iter()
                .map(|(name, value)| Attribute::new(format!("{}:{}", name, value), 1.0))
                .collect()
        })
        .collect()
}

// Tags are base64 encoded by the training package so that crfsuite only deals with ascii labels
fn decode_tag(tag: &str) -> Result<String> {
    let bytes = base64::decode(tag)?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
fn encode_tag(tag: &str) -> String {
    base64::encode(tag)
}

/// Sentence annotated with one tag per token
#[cfg(test)]
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TaggedUtterance {
    pub text: String,
    pub tags: Vec<String>,
}

/// Trains the crfsuite model of `model` on `utterances` and writes it to `output`
#[cfg(test)]
pub fn train_crf_model(
    model: &SlotFillerModel,
    shared_resources: Arc<SharedResources>,
    utterances: &[TaggedUtterance],
    output: &Path,
) -> Result<()> {
    use crfsuite::{Algorithm, GraphicalModel, Trainer};

    let language: Language = model.language_code.parse()?;
    let feature_processor =
        ProbabilisticFeatureProcessor::new(&model.config.feature_factory_configs, shared_resources)?;
    let mut trainer = Trainer::new(false);
    trainer.select(Algorithm::LBFGS, GraphicalModel::CRF1D)?;
    trainer.set("c1", "0.0")?;
    trainer.set("c2", "0.01")?;
    trainer.set("max_iterations", "300")?;
    trainer.set("feature.possible_transitions", "1")?;
    for utterance in utterances {
        let tokens = tokenize(&utterance.text, language);
        if tokens.len() != utterance.tags.len() {
            return Err(format_err!(
                "'{}' has {} tokens but {} tags",
                utterance.text,
                tokens.len(),
                utterance.tags.len()
            ));
        }
        let features = feature_processor.compute_features(&tokens)?;
        let tags: Vec<String> = utterance.tags.iter().map(|tag| encode_tag(tag)).collect();
        trainer.append(&to_crf_items(&features), &tags, 0)?;
    }
    let output_str = output
        .to_str()
        .ok_or_else(|| format_err!("Invalid crf model path {:?}", output))?;
    trainer.train(output_str, -1)?;
    Ok(())
}
