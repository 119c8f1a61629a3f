mod crf_slot_filler;
mod crf_utils;
mod feature_processor;
mod features;
mod features_utils;

use std::path::Path;
use std::sync::Arc;

use crate::errors::*;
use crate::models::ProcessingUnitMetadata;
use crate::resources::SharedResources;
use crate::slot_utils::InternalSlot;
use crate::utils::load_json_file;

pub use self::crf_slot_filler::CRFSlotFiller;
#[cfg(test)]
pub use self::crf_slot_filler::{train_crf_model, TaggedUtterance};
pub use self::crf_utils::TaggingScheme;

pub trait SlotFiller: Send + Sync {
    fn get_tagging_scheme(&self) -> TaggingScheme;
    /// Extracts the unresolved slots of `text`
    fn get_slots(&self, text: &str) -> Result<Vec<InternalSlot>>;
}

/// Instantiates the slot filler persisted in `path`, as named by its metadata file
pub fn build_slot_filler<P: AsRef<Path>>(
    path: P,
    shared_resources: Arc<SharedResources>,
) -> Result<Box<dyn SlotFiller>> {
    let path = path.as_ref();
    let metadata: ProcessingUnitMetadata =
        load_json_file(&path.join("metadata.json"), "slot filler metadata")?;
    if metadata != ProcessingUnitMetadata::CrfSlotFiller {
        return Err(NluError::CorruptModel(format!(
            "expected a slot filler in {:?} but found {:?}",
            path, metadata
        ))
        .into());
    }
    Ok(Box::new(CRFSlotFiller::from_path(path, shared_resources)?))
}
