//! Inference side of a natural language understanding engine
//!
//! A trained engine, persisted as a directory or a zip archive, maps a sentence to the intent
//! it expresses along with the slots it mentions.

mod entity_parser;
pub mod errors;
mod intent_classifier;
mod intent_parser;
mod language;
pub mod models;
mod nlu_engine;
mod nlu_utils;
pub mod ontology;
mod resources;
mod slot_filler;
mod slot_utils;
#[cfg(test)]
mod testutils;
mod utils;

/// Version of the model format produced by the training package
pub const MODEL_VERSION: &str = "0.20.0";
/// Oldest model format which can still be loaded
pub const MIN_MODEL_VERSION: &str = "0.19.0";
pub const DEFAULT_INTENTS_ALTERNATIVES: usize = 0;
pub const DEFAULT_SLOTS_ALTERNATIVES: usize = 5;

pub use crate::entity_parser::{BuiltinEntityParser, RuleBasedBuiltinEntityParser};
pub use crate::errors::*;
pub use crate::language::Language;
pub use crate::nlu_engine::NluEngine;
pub use crate::ontology::*;
