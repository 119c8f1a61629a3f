use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::errors::*;
use crate::intent_classifier::{build_intent_classifier, IntentClassifier};
use crate::models::ProbabilisticParserModel;
use crate::ontology::IntentClassifierResult;
use crate::resources::SharedResources;
use crate::slot_filler::{build_slot_filler, SlotFiller};
use crate::slot_utils::InternalSlot;
use crate::utils::{load_json_file, IntentName};

use super::{IntentParser, InternalParsingResult};

/// Intent parser classifying the intent first, then filling the slots of this intent only
pub struct ProbabilisticIntentParser {
    intent_classifier: Box<dyn IntentClassifier>,
    slot_fillers: HashMap<IntentName, Box<dyn SlotFiller>>,
}

impl ProbabilisticIntentParser {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        let dir = path.as_ref();
        info!("Loading probabilistic intent parser ({:?}) ...", dir);
        let model: ProbabilisticParserModel =
            load_json_file(&dir.join("intent_parser.json"), "probabilistic intent parser")?;
        let intent_classifier =
            build_intent_classifier(dir.join("intent_classifier"), shared_resources.clone())?;
        let mut slot_fillers = HashMap::with_capacity(model.slot_fillers.len());
        for metadata in model.slot_fillers {
            if slot_fillers.contains_key(&metadata.intent) {
                return Err(NluError::CorruptModel(format!(
                    "several slot fillers found for intent '{}'",
                    metadata.intent
                ))
                .into());
            }
            let slot_filler_path = dir.join(&metadata.slot_filler_name);
            let slot_filler = build_slot_filler(slot_filler_path, shared_resources.clone())?;
            slot_fillers.insert(metadata.intent, slot_filler);
        }
        info!("Probabilistic intent parser loaded");
        Ok(Self::new(intent_classifier, slot_fillers))
    }

    pub fn new(
        intent_classifier: Box<dyn IntentClassifier>,
        slot_fillers: HashMap<IntentName, Box<dyn SlotFiller>>,
    ) -> Self {
        Self {
            intent_classifier,
            slot_fillers,
        }
    }
}

impl IntentParser for ProbabilisticIntentParser {
    fn parse(
        &self,
        input: &str,
        intents_filter: Option<&HashSet<IntentName>>,
    ) -> Result<InternalParsingResult> {
        let intent = self.intent_classifier.get_intent(input, intents_filter)?;
        let slots = match intent.intent_name.as_deref() {
            Some(intent_name) => self.get_slots(input, intent_name)?,
            None => vec![],
        };
        Ok(InternalParsingResult { intent, slots })
    }

    fn get_intents(
        &self,
        input: &str,
        intents_filter: Option<&HashSet<IntentName>>,
    ) -> Result<Vec<IntentClassifierResult>> {
        self.intent_classifier.get_intents(input, intents_filter)
    }

    fn get_slots(&self, input: &str, intent: &str) -> Result<Vec<InternalSlot>> {
        let slot_filler = self
            .slot_fillers
            .get(intent)
            .ok_or_else(|| NluError::UnknownIntent(intent.to_string()))?;
        slot_filler.get_slots(input)
    }
}
