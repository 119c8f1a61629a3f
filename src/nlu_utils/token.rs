use std::ops::Range;

use unicode_normalization::char::is_combining_mark;

use crate::language::Language;
use crate::nlu_utils::string::normalize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub value: String,
    /// Byte range in the original input
    pub range: Range<usize>,
    /// Char range in the original input
    pub char_range: Range<usize>,
}

impl Token {
    pub fn new(value: String, range: Range<usize>, char_range: Range<usize>) -> Self {
        Token {
            value,
            range,
            char_range,
        }
    }

    pub fn normalized_value(&self) -> String {
        normalize(&self.value)
    }
}

/// Splits the input into words, digit groups, and single punctuation or symbol characters
///
/// Decimal separators surrounded by digits are kept inside the number ("2.5", "1,000").
/// In languages written without spaces, non ascii letters produce one token each.
pub fn tokenize(input: &str, language: Language) -> Vec<Token> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let split_all_letters = language.is_space_free();
    let mut tokens = vec![];
    let mut index = 0;
    while index < chars.len() {
        let (byte_start, current_char) = chars[index];
        if current_char.is_whitespace() {
            index += 1;
            continue;
        }
        let char_start = index;
        index += 1;
        if is_word_char(current_char) && !(split_all_letters && !current_char.is_ascii()) {
            while index < chars.len() {
                let next_char = chars[index].1;
                if is_word_char(next_char) && !(split_all_letters && !next_char.is_ascii()) {
                    index += 1;
                } else if is_decimal_separator_at(&chars, index) {
                    index += 2;
                } else {
                    break;
                }
            }
        }
        let byte_end = chars
            .get(index)
            .map(|(byte_index, _)| *byte_index)
            .unwrap_or_else(|| input.len());
        tokens.push(Token::new(
            input[byte_start..byte_end].to_string(),
            byte_start..byte_end,
            char_start..index,
        ));
    }
    tokens
}

/// Returns the normalized values of the tokens of the input
pub fn tokenize_light(input: &str, language: Language) -> Vec<String> {
    tokenize(input, language)
        .into_iter()
        .map(|token| token.normalized_value())
        .collect()
}

/// Computes all the ngrams of size at most `max_ngram_size`, along with the indexes of the
/// tokens which compose them
pub fn compute_all_ngrams(tokens: &[&str], max_ngram_size: usize) -> Vec<(String, Vec<usize>)> {
    let mut ngrams = vec![];
    for start in 0..tokens.len() {
        for end in start + 1..=(start + max_ngram_size).min(tokens.len()) {
            ngrams.push((tokens[start..end].join(" "), (start..end).collect()));
        }
    }
    ngrams
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || is_combining_mark(c) || c == '_'
}

fn is_decimal_separator_at(chars: &[(usize, char)], index: usize) -> bool {
    let is_separator = chars[index].1 == '.' || chars[index].1 == ',';
    let previous_is_digit = index > 0 && chars[index - 1].1.is_ascii_digit();
    let next_is_digit = chars
        .get(index + 1)
        .map(|(_, c)| c.is_ascii_digit())
        .unwrap_or(false);
    is_separator && previous_is_digit && next_is_digit
}
