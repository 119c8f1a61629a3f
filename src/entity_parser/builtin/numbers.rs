use lazy_static::lazy_static;
use regex::Regex;

use crate::language::Language;

lazy_static! {
    static ref DIGITS_REGEX: Regex = Regex::new(r"^\d+([.,]\d+)?$").unwrap();
    static ref ORDINAL_DIGITS_REGEX: Regex = Regex::new(r"^(\d+)(st|nd|rd|th|er|e|o|a)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Previous {
    Nothing,
    Digits,
    Unit,
    Teen,
    Ten,
    Hundred,
    Scale,
}

/// Parses a number written with digits, where a comma followed by exactly three digits is a
/// thousands separator and any other comma is a decimal separator
pub fn parse_digits(token: &str) -> Option<f64> {
    if !DIGITS_REGEX.is_match(token) {
        return None;
    }
    let normalized = match token.find(',') {
        Some(index) if token.len() - index - 1 == 3 => token.replace(',', ""),
        Some(_) => token.replace(',', "."),
        None => token.to_string(),
    };
    normalized.parse().ok()
}

fn unit_value(token: &str, language: Language) -> Option<f64> {
    if language != Language::EN {
        return None;
    }
    let value = match token {
        "zero" => 0.,
        "one" => 1.,
        "two" => 2.,
        "three" => 3.,
        "four" => 4.,
        "five" => 5.,
        "six" => 6.,
        "seven" => 7.,
        "eight" => 8.,
        "nine" => 9.,
        _ => return None,
    };
    Some(value)
}

fn teen_value(token: &str, language: Language) -> Option<f64> {
    if language != Language::EN {
        return None;
    }
    let value = match token {
        "ten" => 10.,
        "eleven" => 11.,
        "twelve" => 12.,
        "thirteen" => 13.,
        "fourteen" => 14.,
        "fifteen" => 15.,
        "sixteen" => 16.,
        "seventeen" => 17.,
        "eighteen" => 18.,
        "nineteen" => 19.,
        _ => return None,
    };
    Some(value)
}

fn ten_value(token: &str, language: Language) -> Option<f64> {
    if language != Language::EN {
        return None;
    }
    let value = match token {
        "twenty" => 20.,
        "thirty" => 30.,
        "forty" => 40.,
        "fifty" => 50.,
        "sixty" => 60.,
        "seventy" => 70.,
        "eighty" => 80.,
        "ninety" => 90.,
        _ => return None,
    };
    Some(value)
}

fn scale_value(token: &str, language: Language) -> Option<f64> {
    if language != Language::EN {
        return None;
    }
    match token {
        "thousand" => Some(1e3),
        "million" => Some(1e6),
        "billion" => Some(1e9),
        _ => None,
    }
}

fn is_number_word(token: &str, language: Language) -> bool {
    unit_value(token, language).is_some()
        || teen_value(token, language).is_some()
        || ten_value(token, language).is_some()
}

/// Parses the longest number expression starting at token `start`
///
/// Returns the index following the last token of the expression along with its value.
pub fn number_at(tokens: &[String], start: usize, language: Language) -> Option<(usize, f64)> {
    let mut total = 0.;
    let mut current = 0.;
    let mut previous = Previous::Nothing;
    let mut end = start;
    let mut index = start;
    while index < tokens.len() {
        let token = tokens[index].as_str();
        let next_token = tokens.get(index + 1).map(|t| t.as_str()).unwrap_or("");
        if let Some(value) = parse_digits(token) {
            if previous != Previous::Nothing {
                break;
            }
            current = value;
            previous = Previous::Digits;
        } else if let Some(value) = unit_value(token, language) {
            match previous {
                Previous::Nothing | Previous::Hundred | Previous::Scale | Previous::Ten => {
                    current += value
                }
                _ => break,
            }
            previous = Previous::Unit;
        } else if let Some(value) =
            teen_value(token, language).or_else(|| ten_value(token, language))
        {
            match previous {
                Previous::Nothing | Previous::Hundred | Previous::Scale => current += value,
                _ => break,
            }
            previous = if value < 20. {
                Previous::Teen
            } else {
                Previous::Ten
            };
        } else if token == "hundred" && language == Language::EN {
            match previous {
                Previous::Digits | Previous::Unit | Previous::Teen | Previous::Ten => {
                    current *= 100.
                }
                _ => break,
            }
            previous = Previous::Hundred;
        } else if let Some(scale) = scale_value(token, language) {
            match previous {
                Previous::Digits
                | Previous::Unit
                | Previous::Teen
                | Previous::Ten
                | Previous::Hundred => {
                    total += current * scale;
                    current = 0.;
                }
                _ => break,
            }
            previous = Previous::Scale;
        } else if token == "and"
            && (previous == Previous::Hundred || previous == Previous::Scale)
            && is_number_word(next_token, language)
        {
            index += 1;
            continue;
        } else if token == "-"
            && previous == Previous::Ten
            && unit_value(next_token, language).is_some()
        {
            index += 1;
            continue;
        } else if (token == "a" || token == "one")
            && previous == Previous::Nothing
            && (next_token == "hundred" || scale_value(next_token, language).is_some())
        {
            current = 1.;
            previous = Previous::Unit;
        } else {
            break;
        }
        index += 1;
        end = index;
    }
    if end == start {
        None
    } else {
        Some((end, total + current))
    }
}

fn ordinal_word_value(token: &str, language: Language) -> Option<i64> {
    if language != Language::EN {
        return None;
    }
    let value = match token {
        "first" => 1,
        "second" => 2,
        "third" => 3,
        "fourth" => 4,
        "fifth" => 5,
        "sixth" => 6,
        "seventh" => 7,
        "eighth" => 8,
        "ninth" => 9,
        "tenth" => 10,
        "eleventh" => 11,
        "twelfth" => 12,
        "thirteenth" => 13,
        "fourteenth" => 14,
        "fifteenth" => 15,
        "sixteenth" => 16,
        "seventeenth" => 17,
        "eighteenth" => 18,
        "nineteenth" => 19,
        "twentieth" => 20,
        "thirtieth" => 30,
        "fortieth" => 40,
        "fiftieth" => 50,
        "sixtieth" => 60,
        "seventieth" => 70,
        "eightieth" => 80,
        "ninetieth" => 90,
        "hundredth" => 100,
        _ => return None,
    };
    Some(value)
}

/// Parses the ordinal expression starting at token `start`, such as "3rd", "third" or
/// "twenty-first"
pub fn ordinal_at(tokens: &[String], start: usize, language: Language) -> Option<(usize, i64)> {
    let token = tokens.get(start)?.as_str();
    if let Some(captures) = ORDINAL_DIGITS_REGEX.captures(token) {
        return captures[1].parse().ok().map(|value| (start + 1, value));
    }
    if let Some(value) = ordinal_word_value(token, language) {
        return Some((start + 1, value));
    }
    let tens = ten_value(token, language)? as i64;
    let (units_index, units_token) = match tokens.get(start + 1).map(|t| t.as_str()) {
        Some("-") => (start + 2, tokens.get(start + 2)?.as_str()),
        Some(t) => (start + 1, t),
        None => return None,
    };
    ordinal_word_value(units_token, language)
        .filter(|units| *units < 10)
        .map(|units| (units_index + 1, tens + units))
}
