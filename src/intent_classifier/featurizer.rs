use std::cmp::min;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use failure::format_err;
use itertools::Itertools;
use ndarray::prelude::*;

use crate::errors::*;
use crate::language::Language;
use crate::models::{
    CooccurrenceVectorizerModel, FeaturizerModel, SklearnVectorizerModel, TfidfVectorizerModel,
};
use crate::nlu_utils::token::{compute_all_ngrams, tokenize, tokenize_light};
use crate::ontology::BuiltinEntityKind;
use crate::resources::stemmer::Stemmer;
use crate::resources::word_clusterer::WordClusterer;
use crate::resources::SharedResources;
use crate::utils::{load_json_file, replace_entities, MatchedEntity};

type WordPair = (String, String);

pub struct Featurizer {
    tfidf_vectorizer: TfidfVectorizer,
    cooccurrence_vectorizer: Option<CooccurrenceVectorizer>,
}

impl Featurizer {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        let dir = path.as_ref();
        let model: FeaturizerModel = load_json_file(&dir.join("featurizer.json"), "featurizer")?;
        let tfidf_vectorizer =
            TfidfVectorizer::from_path(dir.join(&model.tfidf_vectorizer), shared_resources.clone())?;
        let cooccurrence_vectorizer = model
            .cooccurrence_vectorizer
            .map(|name| CooccurrenceVectorizer::from_path(dir.join(name), shared_resources))
            .transpose()?;
        Ok(Self::new(tfidf_vectorizer, cooccurrence_vectorizer))
    }

    pub fn new(
        tfidf_vectorizer: TfidfVectorizer,
        cooccurrence_vectorizer: Option<CooccurrenceVectorizer>,
    ) -> Self {
        Self {
            tfidf_vectorizer,
            cooccurrence_vectorizer,
        }
    }

    /// Number of features produced by `transform`
    pub fn nb_features(&self) -> usize {
        self.tfidf_vectorizer.nb_features()
            + self
                .cooccurrence_vectorizer
                .as_ref()
                .map(|vectorizer| vectorizer.nb_features())
                .unwrap_or(0)
    }

    pub fn transform(&self, input: &str) -> Result<Array1<f32>> {
        let mut features = self.tfidf_vectorizer.transform(input)?;
        if let Some(vectorizer) = self.cooccurrence_vectorizer.as_ref() {
            features.extend(vectorizer.transform(input)?);
        };
        Ok(Array1::from(features))
    }
}

pub struct TfidfVectorizer {
    builtin_entity_scope: Vec<BuiltinEntityKind>,
    vocabulary: HashMap<String, usize>,
    idf_diag: Vec<f32>,
    word_clusterer: Option<Arc<dyn WordClusterer>>,
    stemmer: Option<Arc<dyn Stemmer>>,
    language: Language,
    shared_resources: Arc<SharedResources>,
}

impl TfidfVectorizer {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        let model_path = path.as_ref().join("vectorizer.json");
        Self::new(load_json_file(&model_path, "tfidf vectorizer")?, shared_resources)
    }

    pub fn new(
        model: TfidfVectorizerModel,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        let SklearnVectorizerModel {
            idf_diag,
            vocab: vocabulary,
        } = model.vectorizer;
        if let Some((word, index)) = vocabulary.iter().find(|(_, index)| **index >= idf_diag.len())
        {
            return Err(NluError::CorruptModel(format!(
                "index {} of word '{}' exceeds the idf vector size {}",
                index,
                word,
                idf_diag.len()
            ))
            .into());
        }
        let word_clusterer = model
            .config
            .word_clusters_name
            .as_ref()
            .map(|name| {
                shared_resources
                    .word_clusterers
                    .get(name)
                    .cloned()
                    .ok_or_else(|| format_err!("Missing word clusters '{}'", name))
            })
            .transpose()?;
        let stemmer = if model.config.use_stemming {
            let stemmer = shared_resources.stemmer.clone();
            Some(stemmer.ok_or_else(|| format_err!("Tfidf vectorizer requires a stemmer"))?)
        } else {
            None
        };
        Ok(Self {
            builtin_entity_scope: parse_builtin_entity_scope(&model.builtin_entity_scope)?,
            vocabulary,
            idf_diag,
            word_clusterer,
            stemmer,
            language: model.language_code.parse()?,
            shared_resources,
        })
    }

    pub fn nb_features(&self) -> usize {
        self.idf_diag.len()
    }

    /// L2 normalized tfidf vector of the words, entities and word clusters of `utterance`
    pub fn transform(&self, utterance: &str) -> Result<Vec<f32>> {
        let tokens = tokenize_light(utterance, self.language);
        let stemmed_tokens = stem_tokens(&tokens, self.stemmer.as_ref());
        let builtin_entity_words = self
            .shared_resources
            .builtin_entity_parser
            .extract_entities(utterance, Some(&self.builtin_entity_scope[..]), 0)?
            .into_iter()
            .map(|entity| get_builtin_entity_feature_name(entity.entity_kind));
        // custom entities are matched against the stemmed utterance
        let custom_entity_words = self
            .shared_resources
            .custom_entity_parser
            .extract_entities(&stemmed_tokens.join(" "), None, 0)?
            .into_iter()
            .map(|entity| get_custom_entity_feature_name(&entity.entity_identifier));
        let cluster_words = self
            .word_clusterer
            .as_ref()
            .map(|clusterer| get_word_clusters(&tokens, clusterer.as_ref()))
            .unwrap_or_default();

        let mut features = vec![0.; self.nb_features()];
        let words = stemmed_tokens
            .into_iter()
            .chain(builtin_entity_words)
            .chain(custom_entity_words)
            .chain(cluster_words);
        for index in words.filter_map(|word| self.vocabulary.get(&word)) {
            features[*index] += 1.;
        }
        for (feature, idf) in features.iter_mut().zip(self.idf_diag.iter()) {
            *feature *= idf;
        }
        let norm = features.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0. {
            features.iter_mut().for_each(|value| *value /= norm);
        }
        Ok(features)
    }
}

pub struct CooccurrenceVectorizer {
    language: Language,
    builtin_entity_scope: Vec<BuiltinEntityKind>,
    word_pairs: HashMap<WordPair, usize>,
    filter_stop_words: bool,
    window_size: Option<usize>,
    keep_order: bool,
    unknown_words_replacement_string: Option<String>,
    shared_resources: Arc<SharedResources>,
}

impl CooccurrenceVectorizer {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        let model_path = path.as_ref().join("vectorizer.json");
        Self::new(load_json_file(&model_path, "cooccurrence vectorizer")?, shared_resources)
    }

    pub fn new(
        model: CooccurrenceVectorizerModel,
        shared_resources: Arc<SharedResources>,
    ) -> Result<Self> {
        let builtin_entity_scope = parse_builtin_entity_scope(&model.builtin_entity_scope)?;
        let nb_pairs = model.word_pairs.len();
        if let Some(index) = model.word_pairs.keys().find(|index| **index >= nb_pairs) {
            return Err(NluError::CorruptModel(format!(
                "word pair index {} exceeds the number of word pairs {}",
                index, nb_pairs
            ))
            .into());
        }
        let word_pairs = model
            .word_pairs
            .into_iter()
            .map(|(index, pair)| (pair, index))
            .collect();

        Ok(Self {
            language: model.language_code.parse()?,
            builtin_entity_scope,
            word_pairs,
            filter_stop_words: model.config.filter_stop_words,
            window_size: model.config.window_size,
            keep_order: model.config.keep_order,
            unknown_words_replacement_string: model.config.unknown_words_replacement_string,
            shared_resources,
        })
    }

    pub fn nb_features(&self) -> usize {
        self.word_pairs.len()
    }

    /// One hot vector of the known word pairs found in `utterance`, entities being replaced
    /// with their placeholders
    fn transform(&self, utterance: &str) -> Result<Vec<f32>> {
        let resources = &self.shared_resources;
        let builtin_entities = resources
            .builtin_entity_parser
            .extract_entities(utterance, Some(&self.builtin_entity_scope[..]), 0)?;
        let custom_entities = resources
            .custom_entity_parser
            .extract_entities(utterance, None, 0)?;
        let matched_entities: Vec<MatchedEntity> = builtin_entities
            .into_iter()
            .map(MatchedEntity::from)
            .chain(custom_entities.into_iter().map(MatchedEntity::from))
            .collect();
        let placeholders: HashSet<String> = matched_entities
            .iter()
            .map(|entity| entity_placeholder(&entity.entity_name))
            .collect();
        let (_, enriched_utterance) =
            replace_entities(utterance, matched_entities, entity_placeholder);

        let words: Vec<String> = tokenize(&enriched_utterance, self.language)
            .into_iter()
            .map(|token| {
                if placeholders.contains(&token.value) {
                    token.value
                } else {
                    token.normalized_value()
                }
            })
            .filter(|word| !self.is_ignored(word))
            .collect();

        let mut features = vec![0.; self.nb_features()];
        for pair in self.extract_word_pairs(&words) {
            if let Some(index) = self.word_pairs.get(&pair) {
                features[*index] = 1.;
            }
        }
        Ok(features)
    }

    fn is_ignored(&self, word: &str) -> bool {
        (self.filter_stop_words && self.shared_resources.stop_words.contains(word))
            || self.unknown_words_replacement_string.as_deref() == Some(word)
    }

    /// Pairs of words distant of at most `window_size`, sorted alphabetically unless the order
    /// of the sentence is kept
    fn extract_word_pairs(&self, words: &[String]) -> HashSet<WordPair> {
        let mut pairs = HashSet::new();
        for (index, first) in words.iter().enumerate() {
            let window_end = self
                .window_size
                .map_or(words.len(), |size| min(index + size + 1, words.len()));
            for second in &words[index + 1..window_end] {
                if self.keep_order || first < second {
                    pairs.insert((first.clone(), second.clone()));
                } else {
                    pairs.insert((second.clone(), first.clone()));
                }
            }
        }
        pairs
    }
}

fn parse_builtin_entity_scope(scope: &[String]) -> Result<Vec<BuiltinEntityKind>> {
    scope
        .iter()
        .map(|ent| {
            BuiltinEntityKind::from_identifier(ent)
                .map_err(|_| NluError::CorruptModel(format!("Unknown builtin entity {:?}", ent)))
                .map_err(failure::Error::from)
        })
        .collect()
}

fn alphanumeric_chars(value: &str) -> impl Iterator<Item = char> + '_ {
    value.chars().filter(|c| c.is_alphanumeric())
}

/// Placeholder replacing an entity in an utterance, such as `SNIPSNUMBER` for `snips/number`
pub fn entity_placeholder(entity_name: &str) -> String {
    alphanumeric_chars(entity_name).collect::<String>().to_uppercase()
}

fn get_builtin_entity_feature_name(entity_kind: BuiltinEntityKind) -> String {
    let e: String = alphanumeric_chars(entity_kind.identifier()).collect();
    format!("builtinentityfeature{}", e.to_lowercase())
}

fn get_custom_entity_feature_name(entity_name: &str) -> String {
    let e: String = alphanumeric_chars(entity_name).collect();
    format!("entityfeature{}", e.to_lowercase())
}

fn get_word_clusters(query_tokens: &[String], word_clusterer: &dyn WordClusterer) -> Vec<String> {
    let tokens_ref = query_tokens.iter().map(|t| t.as_ref()).collect_vec();
    compute_all_ngrams(tokens_ref.as_ref(), tokens_ref.len())
        .into_iter()
        .filter_map(|ngram| word_clusterer.get_cluster(&ngram.0))
        .sorted()
        .collect()
}

fn stem_tokens(tokens: &[String], stemmer: Option<&Arc<dyn Stemmer>>) -> Vec<String> {
    match stemmer {
        Some(stemmer) => tokens.iter().map(|t| stemmer.stem(t)).collect(),
        None => tokens.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use std::iter::FromIterator;
    use std::ops::Range;

    use maplit::{hashmap, hashset};

    use super::*;
    use crate::entity_parser::CustomEntity;
    use crate::models::{CooccurrenceVectorizerConfiguration, TfidfVectorizerConfiguration};
    use crate::ontology::{BuiltinEntity, NumberValue, SlotValue};
    use crate::resources::stemmer::HashMapStemmer;
    use crate::resources::word_clusterer::HashMapWordClusterer;
    use crate::testutils::*;

    const ORDER: &str = "Brëw two hot cups of coffee with 2 sugars";
    const STEMMED_ORDER: &str = "brew two hot cup of coffee with 2 sugar";

    fn custom_entity(value: &str, range: Range<usize>, entity: &str) -> CustomEntity {
        CustomEntity {
            value: value.to_string(),
            resolved_value: value.to_string(),
            alternative_resolved_values: vec![],
            range,
            entity_identifier: entity.to_string(),
        }
    }

    fn number(value: &str, range: Range<usize>, number: f64) -> BuiltinEntity {
        BuiltinEntity {
            value: value.to_string(),
            range,
            entity: SlotValue::Number(NumberValue { value: number }),
            alternatives: vec![],
            entity_kind: BuiltinEntityKind::Number,
        }
    }

    fn order_resources() -> Arc<SharedResources> {
        let builtin_entity_parser = MockedBuiltinEntityParser::from_iter(vec![(
            ORDER.to_string(),
            vec![number("two", 5..8, 2.0), number("2", 33..34, 2.0)],
        )]);
        let custom_entity_parser = MockedCustomEntityParser::from_iter(vec![(
            STEMMED_ORDER.to_string(),
            vec![
                custom_entity("hot", 9..12, "Temperature"),
                custom_entity("coffee", 20..26, "Beverage"),
            ],
        )]);
        let stemmer = HashMapStemmer::from_iter(vec![
            ("cups".to_string(), "cup".to_string()),
            ("sugars".to_string(), "sugar".to_string()),
        ]);
        Arc::new(
            SharedResourcesBuilder::default()
                .builtin_entity_parser(builtin_entity_parser)
                .custom_entity_parser(custom_entity_parser)
                .stemmer(stemmer)
                .build(),
        )
    }

    fn tfidf_model(vocab: HashMap<String, usize>, idf_diag: Vec<f32>) -> TfidfVectorizerModel {
        TfidfVectorizerModel {
            language_code: "en".to_string(),
            builtin_entity_scope: vec!["snips/number".to_string()],
            vectorizer: SklearnVectorizerModel { idf_diag, vocab },
            config: TfidfVectorizerConfiguration {
                use_stemming: true,
                word_clusters_name: None,
            },
        }
    }

    fn order_tfidf_vectorizer(resources: Arc<SharedResources>) -> TfidfVectorizer {
        let vocab = hashmap! {
            "brew".to_string() => 0,
            "coffee".to_string() => 1,
            "cup".to_string() => 2,
            "hot".to_string() => 3,
            "tea".to_string() => 4,
            "sugar".to_string() => 5,
            "entityfeaturetemperature".to_string() => 6,
            "entityfeaturebeverage".to_string() => 7,
            "builtinentityfeaturesnipsnumber".to_string() => 8,
        };
        let idf_diag = vec![1.5, 1.2, 1.0, 2.0, 1.8, 2.5, 0.9, 0.6, 1.1];
        TfidfVectorizer::new(tfidf_model(vocab, idf_diag), resources).unwrap()
    }

    fn order_tfidf_features() -> Vec<f32> {
        vec![
            0.3277172, 0.2621738, 0.2184781, 0.4369563, 0.0, 0.5461953, 0.1966303, 0.1310869,
            0.4806519,
        ]
    }

    fn cooccurrence_model(
        word_pairs: Vec<(&str, &str)>,
        window_size: Option<usize>,
        keep_order: bool,
    ) -> CooccurrenceVectorizerModel {
        CooccurrenceVectorizerModel {
            language_code: "en".to_string(),
            builtin_entity_scope: vec!["snips/number".to_string()],
            word_pairs: word_pairs
                .into_iter()
                .enumerate()
                .map(|(index, (first, second))| (index, (first.to_string(), second.to_string())))
                .collect(),
            config: CooccurrenceVectorizerConfiguration {
                window_size,
                filter_stop_words: true,
                keep_order,
                unknown_words_replacement_string: Some("unknownword".to_string()),
            },
        }
    }

    fn pair(first: &str, second: &str) -> WordPair {
        (first.to_string(), second.to_string())
    }

    fn words(sentence: &str) -> Vec<String> {
        sentence.split_whitespace().map(|word| word.to_string()).collect()
    }

    #[test]
    fn test_tfidf_transform() {
        // Given
        let featurizer = Featurizer::new(order_tfidf_vectorizer(order_resources()), None);

        // When
        let features = featurizer.transform(ORDER).unwrap();

        // Then
        assert_eq!(9, featurizer.nb_features());
        assert_epsilon_eq_array1(&Array1::from(order_tfidf_features()), &features, 1e-5);
    }

    #[test]
    fn test_tfidf_transform_without_known_word() {
        // Given
        let vectorizer = order_tfidf_vectorizer(order_resources());

        // When
        let features = vectorizer.transform("hello world").unwrap();

        // Then
        assert_eq!(vec![0.0_f32; 9], features);
    }

    #[test]
    fn test_transform_with_cooccurrence() {
        // Given
        let resources = order_resources();
        let model = cooccurrence_model(
            vec![
                ("brew", "SNIPSNUMBER"),
                ("hot", "coffee"),
                ("of", "coffee"),
            ],
            Some(1),
            true,
        );
        let featurizer = Featurizer::new(
            order_tfidf_vectorizer(resources.clone()),
            Some(CooccurrenceVectorizer::new(model, resources).unwrap()),
        );

        // When
        let features = featurizer.transform(ORDER).unwrap();

        // Then
        let mut expected_features = order_tfidf_features();
        expected_features.extend(vec![1.0, 0.0, 1.0]);
        assert_eq!(12, featurizer.nb_features());
        assert_epsilon_eq_array1(&Array1::from(expected_features), &features, 1e-5);
    }

    #[test]
    fn test_cooccurrence_transform_filters_stop_words() {
        // Given
        let sentence = "please brew a hot coffee with 2 sugars";
        let builtin_entity_parser = MockedBuiltinEntityParser::from_iter(vec![(
            sentence.to_string(),
            vec![number("2", 30..31, 2.0)],
        )]);
        let custom_entity_parser = MockedCustomEntityParser::from_iter(vec![(
            sentence.to_string(),
            vec![custom_entity("hot", 14..17, "Temperature")],
        )]);
        let resources = SharedResourcesBuilder::default()
            .builtin_entity_parser(builtin_entity_parser)
            .custom_entity_parser(custom_entity_parser)
            .stop_words(hashset!["a".to_string()])
            .build();
        let model = cooccurrence_model(
            vec![
                ("TEMPERATURE", "coffee"),
                ("brew", "coffee"),
                ("please", "a"),
                ("SNIPSNUMBER", "sugars"),
                ("coffee", "TEMPERATURE"),
            ],
            Some(1),
            true,
        );
        let vectorizer = CooccurrenceVectorizer::new(model, Arc::new(resources)).unwrap();

        // When
        let features = vectorizer.transform(sentence).unwrap();

        // Then
        assert_eq!(vec![1.0_f32, 0.0, 0.0, 1.0, 0.0], features);
    }

    #[test]
    fn test_extract_word_pairs() {
        // Given
        let resources = Arc::new(SharedResourcesBuilder::default().build());
        let ordered = CooccurrenceVectorizer::new(
            cooccurrence_model(vec![], None, true),
            resources.clone(),
        )
        .unwrap();
        let unordered =
            CooccurrenceVectorizer::new(cooccurrence_model(vec![], Some(1), false), resources)
                .unwrap();
        let sentence = words("tea with milk");

        // When
        let ordered_pairs = ordered.extract_word_pairs(&sentence);
        let unordered_pairs = unordered.extract_word_pairs(&sentence);

        // Then
        assert_eq!(
            hashset![
                pair("tea", "with"),
                pair("tea", "milk"),
                pair("with", "milk"),
            ],
            ordered_pairs
        );
        assert_eq!(
            hashset![pair("tea", "with"), pair("milk", "with")],
            unordered_pairs
        );
    }

    #[test]
    fn test_unknown_words_replacement_is_ignored() {
        // Given
        let resources = Arc::new(SharedResourcesBuilder::default().build());
        let vectorizer =
            CooccurrenceVectorizer::new(cooccurrence_model(vec![], None, true), resources).unwrap();

        // When / Then
        assert!(vectorizer.is_ignored("unknownword"));
        assert!(!vectorizer.is_ignored("tea"));
    }

    #[test]
    fn test_vectorizers_reject_inconsistent_indexes() {
        // Given
        let resources = Arc::new(SharedResourcesBuilder::default().build());
        let vocab = hashmap! {"tea".to_string() => 0, "milk".to_string() => 1};
        let mut cooccurrence = cooccurrence_model(vec![("tea", "milk")], None, true);
        cooccurrence.word_pairs = hashmap! {3 => pair("tea", "milk")};

        // When
        let tfidf_result = TfidfVectorizer::new(tfidf_model(vocab, vec![1.0]), resources.clone());
        let cooccurrence_result = CooccurrenceVectorizer::new(cooccurrence, resources);

        // Then
        let tfidf_error = tfidf_result.err().unwrap();
        let cooccurrence_error = cooccurrence_result.err().unwrap();
        assert!(matches!(tfidf_error.nlu_error(), Some(NluError::CorruptModel(_))));
        assert!(matches!(
            cooccurrence_error.nlu_error(),
            Some(NluError::CorruptModel(_))
        ));
    }

    #[test]
    fn test_tfidf_vectorizer_requires_declared_resources() {
        // Given
        let resources = Arc::new(SharedResourcesBuilder::default().build());
        let vocab = hashmap! {"tea".to_string() => 0};
        let mut clusters_model = tfidf_model(vocab.clone(), vec![1.0]);
        clusters_model.config.use_stemming = false;
        clusters_model.config.word_clusters_name = Some("brown_clusters".to_string());

        // When
        let missing_stemmer = TfidfVectorizer::new(tfidf_model(vocab, vec![1.0]), resources.clone());
        let missing_clusters = TfidfVectorizer::new(clusters_model, resources);

        // Then
        assert!(missing_stemmer.is_err());
        assert!(missing_clusters.is_err());
    }

    #[test]
    fn test_entity_feature_names() {
        assert_eq!(
            "builtinentityfeaturesnipsamountofmoney",
            get_builtin_entity_feature_name(BuiltinEntityKind::AmountOfMoney)
        );
        assert_eq!(
            "entityfeaturecoffeetype",
            get_custom_entity_feature_name("Coffee_Type")
        );
        assert_eq!("SNIPSNUMBER", entity_placeholder("snips/number"));
    }

    #[test]
    fn test_get_word_clusters() {
        // Given
        let tokens = tokenize_light("Iced, Green tea", Language::EN);
        let word_clusterer = HashMapWordClusterer::from_iter(vec![
            ("iced".to_string(), "1011".to_string()),
            ("green tea".to_string(), "0111".to_string()),
        ]);

        // When
        let clusters = get_word_clusters(&tokens, &word_clusterer);

        // Then
        assert_eq!(vec!["0111".to_string(), "1011".to_string()], clusters);
    }
}
