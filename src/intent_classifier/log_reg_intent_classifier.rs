use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use ndarray::prelude::*;

use crate::errors::*;
use crate::models::IntentClassifierModel;
use crate::ontology::IntentClassifierResult;
use crate::resources::SharedResources;
use crate::utils::{load_json_file, IntentName};

use super::logreg::MulticlassLogisticRegression;
use super::{Featurizer, IntentClassifier};

pub struct LogRegIntentClassifier {
    intent_list: Vec<Option<IntentName>>,
    featurizer: Option<Featurizer>,
    logreg: Option<MulticlassLogisticRegression>,
}

impl LogRegIntentClassifier {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        info!("Loading intent classifier ({:?}) ...", path.as_ref());
        let model: IntentClassifierModel =
            load_json_file(&path.as_ref().join("intent_classifier.json"), "intent classifier")?;
        let featurizer = model
            .featurizer
            .as_ref()
            .map(|name| Featurizer::from_path(path.as_ref().join(name), shared_resources))
            .transpose()?;
        let logreg = match (model.intercept, model.coeffs) {
            (Some(intercept), Some(coeffs)) => Some(build_logreg(intercept, coeffs)?),
            _ => None,
        };

        let classifier = Self::new(model.intent_list, featurizer, logreg)?;
        info!("Intent classifier loaded");
        Ok(classifier)
    }

    pub fn new(
        intent_list: Vec<Option<IntentName>>,
        featurizer: Option<Featurizer>,
        logreg: Option<MulticlassLogisticRegression>,
    ) -> Result<Self> {
        if let (Some(featurizer), Some(logreg)) = (featurizer.as_ref(), logreg.as_ref()) {
            if featurizer.nb_features() != logreg.nb_features() {
                return Err(NluError::CorruptModel(format!(
                    "featurizer produces {} features while the classifier expects {}",
                    featurizer.nb_features(),
                    logreg.nb_features()
                ))
                .into());
            }
            if logreg.nb_classes() != intent_list.len() {
                return Err(NluError::CorruptModel(format!(
                    "classifier predicts {} classes but lists {} intents",
                    logreg.nb_classes(),
                    intent_list.len()
                ))
                .into());
            }
        }
        Ok(Self {
            intent_list,
            featurizer,
            logreg,
        })
    }
}

fn build_logreg(intercept: Vec<f32>, coeffs: Vec<Vec<f32>>) -> Result<MulticlassLogisticRegression> {
    let nb_classes = intercept.len();
    let nb_features = coeffs.first().map(|row| row.len()).unwrap_or(0);
    if coeffs.len() != nb_classes || coeffs.iter().any(|row| row.len() != nb_features) {
        return Err(NluError::CorruptModel(
            "inconsistent shapes of the intent classifier coefficients".to_string(),
        )
        .into());
    }
    // The serialized coeffs matrix is transposed
    let weights = Array::from_shape_fn((nb_features, nb_classes), |(i, j)| coeffs[j][i]);
    MulticlassLogisticRegression::new(Array::from(intercept), weights)
}

impl IntentClassifier for LogRegIntentClassifier {
    fn get_intent(
        &self,
        input: &str,
        intents_filter: Option<&HashSet<IntentName>>,
    ) -> Result<IntentClassifierResult> {
        self.get_intents(input, intents_filter)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                NluError::InternalError("intent classifier returned no result".to_string()).into()
            })
    }

    fn get_intents(
        &self,
        input: &str,
        intents_filter: Option<&HashSet<IntentName>>,
    ) -> Result<Vec<IntentClassifierResult>> {
        let in_scope = |opt_intent: &Option<IntentName>| match opt_intent {
            Some(intent) => intents_filter
                .map(|intents| intents.contains(intent))
                .unwrap_or(true),
            None => true,
        };

        let (featurizer, logreg) = match (self.featurizer.as_ref(), self.logreg.as_ref()) {
            (Some(featurizer), Some(logreg)) if !input.is_empty() && self.intent_list.len() > 1 => {
                (featurizer, logreg)
            }
            _ => {
                let single_intent = match self.intent_list.as_slice() {
                    [single_intent] if !input.is_empty() && in_scope(single_intent) => {
                        single_intent.clone()
                    }
                    _ => None,
                };
                debug!("Classifying '{}' without features: {:?}", input, single_intent);
                let mut results = vec![IntentClassifierResult {
                    intent_name: single_intent.clone(),
                    confidence_score: 1.0,
                }];
                results.extend(
                    self.intent_list
                        .iter()
                        .filter(|opt_intent| opt_intent.is_some() && **opt_intent != single_intent)
                        .filter(|opt_intent| in_scope(*opt_intent))
                        .map(|opt_intent| IntentClassifierResult {
                            intent_name: opt_intent.clone(),
                            confidence_score: 0.0,
                        }),
                );
                if single_intent.is_some() {
                    results.push(IntentClassifierResult {
                        intent_name: None,
                        confidence_score: 0.0,
                    });
                }
                return Ok(results);
            }
        };

        let features = featurizer.transform(input)?;
        let filtered_out_indexes =
            get_filtered_out_intents_indexes(&self.intent_list, intents_filter);
        let probabilities = logreg.run(&features.view(), filtered_out_indexes.as_deref())?;

        let mut results: Vec<IntentClassifierResult> = self
            .intent_list
            .iter()
            .zip(probabilities.iter())
            .filter(|&(opt_intent, _)| in_scope(opt_intent))
            .map(|(opt_intent, proba)| IntentClassifierResult {
                intent_name: opt_intent.clone(),
                confidence_score: *proba,
            })
            .collect();

        // Sort intents by decreasing probabilities
        results.sort_by(|a, b| {
            b.confidence_score
                .partial_cmp(&a.confidence_score)
                .unwrap_or(Ordering::Equal)
        });
        debug!("Intent probabilities for '{}': {:?}", input, results);
        Ok(results)
    }
}

fn get_filtered_out_intents_indexes(
    intents_list: &[Option<IntentName>],
    intents_filter: Option<&HashSet<IntentName>>,
) -> Option<Vec<usize>> {
    intents_filter.map(|filter| {
        intents_list
            .iter()
            .enumerate()
            .filter_map(|(i, opt_intent)| match opt_intent {
                Some(intent) if !filter.contains(intent) => Some(i),
                _ => None,
            })
            .collect()
    })
}
