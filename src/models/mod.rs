//! Serialized form of the components of a trained nlu engine

mod intent_classifier;
mod intent_parser;
mod nlu_engine;
mod processing_unit_metadata;
mod slot_filler;

pub use self::intent_classifier::*;
pub use self::intent_parser::*;
pub use self::nlu_engine::*;
pub use self::processing_unit_metadata::*;
pub use self::slot_filler::*;
