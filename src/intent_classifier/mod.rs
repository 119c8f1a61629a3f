mod featurizer;
mod log_reg_intent_classifier;
mod logreg;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::errors::*;
use crate::models::ProcessingUnitMetadata;
use crate::ontology::IntentClassifierResult;
use crate::resources::SharedResources;
use crate::utils::{load_json_file, IntentName};

pub use self::featurizer::{entity_placeholder, Featurizer};
pub use self::log_reg_intent_classifier::LogRegIntentClassifier;

pub trait IntentClassifier: Send + Sync {
    /// Returns the most likely intent among `intents_filter`, `None` meaning no intent
    fn get_intent(
        &self,
        input: &str,
        intents_filter: Option<&HashSet<IntentName>>,
    ) -> Result<IntentClassifierResult>;

    /// Scores every intent of `intents_filter` along with the null intent, by decreasing
    /// probability
    fn get_intents(
        &self,
        input: &str,
        intents_filter: Option<&HashSet<IntentName>>,
    ) -> Result<Vec<IntentClassifierResult>>;
}

/// Instantiates the intent classifier persisted in `path`, as named by its metadata file
pub fn build_intent_classifier<P: AsRef<Path>>(
    path: P,
    shared_resources: Arc<SharedResources>,
) -> Result<Box<dyn IntentClassifier>> {
    let path = path.as_ref();
    let metadata: ProcessingUnitMetadata =
        load_json_file(&path.join("metadata.json"), "intent classifier metadata")?;
    if metadata != ProcessingUnitMetadata::LogRegIntentClassifier {
        return Err(NluError::CorruptModel(format!(
            "expected an intent classifier in {:?} but found {:?}",
            path, metadata
        ))
        .into());
    }
    Ok(Box::new(LogRegIntentClassifier::from_path(path, shared_resources)?))
}
