use std::collections::HashMap;
use std::ops::Range;

use failure::{bail, format_err};

use crate::errors::*;
use crate::nlu_utils::string::suffix_from_char_index;
use crate::nlu_utils::token::Token;
use crate::slot_utils::InternalSlot;
use crate::utils::{EntityName, SlotName};

const BEGINNING_PREFIX: &str = "B-";
const INSIDE_PREFIX: &str = "I-";
const LAST_PREFIX: &str = "L-";
const UNIT_PREFIX: &str = "U-";
pub const OUTSIDE: &str = "O";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaggingScheme {
    IO,
    BIO,
    BILOU,
}

impl TaggingScheme {
    pub fn from_u8(i: u8) -> Result<TaggingScheme> {
        match i {
            0 => Ok(TaggingScheme::IO),
            1 => Ok(TaggingScheme::BIO),
            2 => Ok(TaggingScheme::BILOU),
            _ => bail!("Unknown tagging scheme identifier: {}", i),
        }
    }

    fn starts_slot(self, previous: Tag, current: Tag) -> bool {
        match self {
            TaggingScheme::IO => previous == Tag::Outside,
            TaggingScheme::BIO => current == Tag::Beginning || previous == Tag::Outside,
            TaggingScheme::BILOU => match (previous, current) {
                (_, Tag::Beginning) | (_, Tag::Unit) => true,
                (Tag::Outside, _) | (Tag::Last, _) | (Tag::Unit, _) => true,
                _ => false,
            },
        }
    }

    fn ends_slot(self, current: Tag, next: Tag) -> bool {
        match self {
            TaggingScheme::IO => next == Tag::Outside,
            TaggingScheme::BIO => next != Tag::Inside,
            TaggingScheme::BILOU => match (current, next) {
                (_, Tag::Outside) | (_, Tag::Beginning) | (_, Tag::Unit) => true,
                (Tag::Last, _) | (Tag::Unit, _) => true,
                _ => false,
            },
        }
    }
}

/// Position of a token within a slot, as given by the prefix of its tag
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Tag {
    Outside,
    Beginning,
    Inside,
    Last,
    Unit,
}

impl Tag {
    fn parse(tag: &str) -> Self {
        if tag == OUTSIDE {
            Tag::Outside
        } else if tag.starts_with(BEGINNING_PREFIX) {
            Tag::Beginning
        } else if tag.starts_with(LAST_PREFIX) {
            Tag::Last
        } else if tag.starts_with(UNIT_PREFIX) {
            Tag::Unit
        } else {
            Tag::Inside
        }
    }
}

pub fn tag_name_to_slot_name(tag: &str) -> String {
    suffix_from_char_index(tag, 2)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotRange {
    pub slot_name: SlotName,
    pub range: Range<usize>,
    pub char_range: Range<usize>,
}

/// Groups the tagged tokens into slots, the name of a slot being read from its last tag
pub fn tags_to_slot_ranges(
    tokens: &[Token],
    tags: &[String],
    tagging_scheme: TaggingScheme,
) -> Vec<SlotRange> {
    let parsed_tags: Vec<Tag> = tags.iter().map(|tag| Tag::parse(tag)).collect();
    let tag_at = |index: Option<usize>| {
        index
            .and_then(|index| parsed_tags.get(index).copied())
            .unwrap_or(Tag::Outside)
    };
    let mut slots = vec![];
    let mut slot_start = 0;
    for (index, tag) in tags.iter().enumerate() {
        let current = parsed_tags[index];
        if current == Tag::Outside {
            continue;
        }
        if tagging_scheme.starts_slot(tag_at(index.checked_sub(1)), current) {
            slot_start = index;
        }
        if tagging_scheme.ends_slot(current, tag_at(Some(index + 1))) {
            slots.push(SlotRange {
                slot_name: tag_name_to_slot_name(tag),
                range: tokens[slot_start].range.start..tokens[index].range.end,
                char_range: tokens[slot_start].char_range.start..tokens[index].char_range.end,
            });
            slot_start = index + 1;
        }
    }
    slots
}

/// Converts one tag per token into slots of `text`
///
/// `tokens` and `tags` must have the same length.
pub fn tags_to_slots(
    text: &str,
    tokens: &[Token],
    tags: &[String],
    tagging_scheme: TaggingScheme,
    slot_name_mapping: &HashMap<SlotName, EntityName>,
) -> Result<Vec<InternalSlot>> {
    if tokens.len() != tags.len() {
        return Err(NluError::InternalError(format!(
            "got {} tags for {} tokens",
            tags.len(),
            tokens.len()
        ))
        .into());
    }
    let mut slots = vec![];
    for slot_range in tags_to_slot_ranges(tokens, tags, tagging_scheme) {
        let entity = slot_name_mapping
            .get(&slot_range.slot_name)
            .ok_or_else(|| format_err!("No entity found for slot '{}'", slot_range.slot_name))?;
        slots.push(InternalSlot {
            value: text[slot_range.range].to_string(),
            char_range: slot_range.char_range,
            entity: entity.to_string(),
            slot_name: slot_range.slot_name,
        });
    }
    Ok(slots)
}

/// Prefix of the tag of the token at `index` within an entity spanning the tokens `indexes`
pub fn get_scheme_prefix(
    index: usize,
    indexes: &[usize],
    tagging_scheme: TaggingScheme,
) -> &'static str {
    let is_first = indexes.first() == Some(&index);
    let is_last = indexes.last() == Some(&index);
    match tagging_scheme {
        TaggingScheme::IO => INSIDE_PREFIX,
        TaggingScheme::BIO if is_first => BEGINNING_PREFIX,
        TaggingScheme::BIO => INSIDE_PREFIX,
        TaggingScheme::BILOU if indexes.len() == 1 => UNIT_PREFIX,
        TaggingScheme::BILOU if is_first => BEGINNING_PREFIX,
        TaggingScheme::BILOU if is_last => LAST_PREFIX,
        TaggingScheme::BILOU => INSIDE_PREFIX,
    }
}
