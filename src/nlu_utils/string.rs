use std::ops::Range;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercases the input and strips its diacritics
pub fn normalize(string: &str) -> String {
    remove_diacritics(&string.to_lowercase())
}

pub fn remove_diacritics(string: &str) -> String {
    string.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

pub fn get_shape(string: &str) -> String {
    if string.chars().all(char::is_lowercase) {
        "xxx".to_string()
    } else if string.chars().all(char::is_uppercase) {
        "XXX".to_string()
    } else if is_title_case(string) {
        "Xxx".to_string()
    } else {
        "xX".to_string()
    }
}

fn is_title_case(string: &str) -> bool {
    let mut chars = string.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => chars.all(char::is_lowercase),
        _ => false,
    }
}

pub fn substring_with_char_range(string: &str, range: &Range<usize>) -> String {
    string
        .chars()
        .skip(range.start)
        .take(range.end.saturating_sub(range.start))
        .collect()
}

pub fn suffix_from_char_index(string: &str, index: usize) -> String {
    string.chars().skip(index).collect()
}
