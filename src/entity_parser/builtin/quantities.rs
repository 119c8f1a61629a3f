use crate::language::Language;
use crate::ontology::*;

use super::numbers::{number_at, ordinal_at};
use super::RuleMatch;

const APPROXIMATION_WORDS: &[&str] = &["about", "around", "approximately", "roughly"];

fn precision_prefix(tokens: &[String], start: usize) -> (usize, Precision) {
    match tokens.get(start) {
        Some(token) if APPROXIMATION_WORDS.contains(&token.as_str()) => {
            (start + 1, Precision::Approximate)
        }
        _ => (start, Precision::Exact),
    }
}

pub fn numbers(tokens: &[String], language: Language) -> Vec<RuleMatch> {
    (0..tokens.len())
        .filter_map(|start| {
            number_at(tokens, start, language).map(|(end, value)| {
                RuleMatch::new(
                    start..end,
                    BuiltinEntityKind::Number,
                    SlotValue::Number(NumberValue { value }),
                )
            })
        })
        .collect()
}

pub fn ordinals(tokens: &[String], language: Language) -> Vec<RuleMatch> {
    (0..tokens.len())
        .filter_map(|start| {
            ordinal_at(tokens, start, language).map(|(end, value)| {
                RuleMatch::new(
                    start..end,
                    BuiltinEntityKind::Ordinal,
                    SlotValue::Ordinal(OrdinalValue { value }),
                )
            })
        })
        .collect()
}

pub fn percentages(tokens: &[String], language: Language) -> Vec<RuleMatch> {
    (0..tokens.len())
        .filter_map(|start| {
            let (end, value) = number_at(tokens, start, language)?;
            let end = match tokens.get(end).map(|t| t.as_str()) {
                Some("%") | Some("percent") => end + 1,
                Some("per") if tokens.get(end + 1).map(|t| t.as_str()) == Some("cent") => end + 2,
                _ => return None,
            };
            Some(RuleMatch::new(
                start..end,
                BuiltinEntityKind::Percentage,
                SlotValue::Percentage(PercentageValue { value }),
            ))
        })
        .collect()
}

fn temperature_unit(token: &str) -> Option<&'static str> {
    match token {
        "celsius" | "centigrade" | "c" => Some("celsius"),
        "fahrenheit" | "f" => Some("fahrenheit"),
        "kelvin" | "k" => Some("kelvin"),
        _ => None,
    }
}

pub fn temperatures(tokens: &[String], language: Language) -> Vec<RuleMatch> {
    (0..tokens.len())
        .filter_map(|start| {
            let negative = match tokens[start].as_str() {
                "minus" | "-" => true,
                _ => false,
            };
            let number_start = if negative { start + 1 } else { start };
            let (mut end, value) = number_at(tokens, number_start, language)?;
            let value = if negative { -value } else { value };
            let unit = match tokens.get(end).map(|t| t.as_str()) {
                Some("°") | Some("degree") | Some("degrees") => {
                    end += 1;
                    match tokens.get(end).and_then(|t| temperature_unit(t)) {
                        Some(unit) => {
                            end += 1;
                            unit
                        }
                        None => "degree",
                    }
                }
                Some(token) if token.len() > 1 => {
                    let unit = temperature_unit(token)?;
                    end += 1;
                    unit
                }
                _ => return None,
            };
            Some(RuleMatch::new(
                start..end,
                BuiltinEntityKind::Temperature,
                SlotValue::Temperature(TemperatureValue {
                    value: value as f32,
                    unit: Some(unit.to_string()),
                }),
            ))
        })
        .collect()
}

fn currency_symbol(token: &str) -> Option<&'static str> {
    match token {
        "$" => Some("$"),
        "€" => Some("€"),
        "£" => Some("£"),
        "¥" => Some("¥"),
        _ => None,
    }
}

fn currency_word(token: &str) -> Option<&'static str> {
    match token {
        "dollar" | "dollars" | "buck" | "bucks" | "usd" => Some("$"),
        "euro" | "euros" | "eur" => Some("€"),
        "pound" | "pounds" | "gbp" => Some("£"),
        "yen" | "jpy" => Some("¥"),
        "cent" | "cents" => Some("cent"),
        _ => currency_symbol(token),
    }
}

pub fn amounts_of_money(tokens: &[String], language: Language) -> Vec<RuleMatch> {
    (0..tokens.len())
        .filter_map(|start| {
            let (amount_start, precision) = precision_prefix(tokens, start);
            let token = tokens.get(amount_start)?;
            let (end, value, unit) = if let Some(unit) = currency_symbol(token) {
                let (end, value) = number_at(tokens, amount_start + 1, language)?;
                (end, value, unit)
            } else {
                let (end, value) = number_at(tokens, amount_start, language)?;
                let unit = currency_word(tokens.get(end)?)?;
                (end + 1, value, unit)
            };
            Some(RuleMatch::new(
                start..end,
                BuiltinEntityKind::AmountOfMoney,
                SlotValue::AmountOfMoney(AmountOfMoneyValue {
                    value: value as f32,
                    precision,
                    unit: Some(unit.to_string()),
                }),
            ))
        })
        .collect()
}

pub fn duration_grain(token: &str) -> Option<Grain> {
    match token {
        "year" | "years" => Some(Grain::Year),
        "quarter" | "quarters" => Some(Grain::Quarter),
        "month" | "months" => Some(Grain::Month),
        "week" | "weeks" => Some(Grain::Week),
        "day" | "days" => Some(Grain::Day),
        "hour" | "hours" | "h" => Some(Grain::Hour),
        "minute" | "minutes" | "min" | "mins" => Some(Grain::Minute),
        "second" | "seconds" | "sec" | "secs" => Some(Grain::Second),
        _ => None,
    }
}

fn finer_grain(grain: Grain) -> Option<(Grain, f64)> {
    match grain {
        Grain::Year => Some((Grain::Month, 12.)),
        Grain::Quarter => Some((Grain::Month, 3.)),
        Grain::Week => Some((Grain::Day, 7.)),
        Grain::Day => Some((Grain::Hour, 24.)),
        Grain::Hour => Some((Grain::Minute, 60.)),
        Grain::Minute => Some((Grain::Second, 60.)),
        Grain::Month | Grain::Second => None,
    }
}

fn add_to_duration(duration: &mut DurationValue, grain: Grain, quantity: f64) {
    let whole = if grain == Grain::Second {
        quantity.round() as i64
    } else {
        quantity.trunc() as i64
    };
    let component = match grain {
        Grain::Year => &mut duration.years,
        Grain::Quarter => &mut duration.quarters,
        Grain::Month => &mut duration.months,
        Grain::Week => &mut duration.weeks,
        Grain::Day => &mut duration.days,
        Grain::Hour => &mut duration.hours,
        Grain::Minute => &mut duration.minutes,
        Grain::Second => &mut duration.seconds,
    };
    *component = component.saturating_add(whole);
    let remainder = quantity.fract();
    if remainder > 1e-6 {
        if let Some((finer, factor)) = finer_grain(grain) {
            add_to_duration(duration, finer, remainder * factor);
        }
    }
}

fn duration_component_at(
    tokens: &[String],
    start: usize,
    language: Language,
) -> Option<(usize, Grain, f64)> {
    let (unit_index, quantity) = match tokens.get(start).map(|t| t.as_str()) {
        Some("a") | Some("an") => (start + 1, 1.),
        _ => number_at(tokens, start, language)?,
    };
    let grain = duration_grain(tokens.get(unit_index)?)?;
    Some((unit_index + 1, grain, quantity))
}

/// Parses a duration such as "2 hours and 30 minutes" starting at token `start`, returning the
/// finest grain which was mentioned along with the value
pub fn duration_at(
    tokens: &[String],
    start: usize,
    language: Language,
) -> Option<(usize, Grain, DurationValue)> {
    let (mut index, precision) = precision_prefix(tokens, start);
    let mut duration = DurationValue::empty(precision);
    let mut finest_grain = None;
    let mut end = start;
    loop {
        let component = duration_component_at(tokens, index, language).or_else(|| {
            match tokens.get(index).map(|t| t.as_str()) {
                Some("and") | Some(",") if finest_grain.is_some() => {
                    duration_component_at(tokens, index + 1, language)
                }
                _ => None,
            }
        });
        match component {
            Some((component_end, grain, quantity)) => {
                add_to_duration(&mut duration, grain, quantity);
                finest_grain = Some(grain);
                index = component_end;
                end = component_end;
            }
            None => break,
        }
    }
    finest_grain.map(|grain| (end, grain, duration))
}

pub fn durations(tokens: &[String], language: Language) -> Vec<RuleMatch> {
    (0..tokens.len())
        .filter_map(|start| {
            duration_at(tokens, start, language).map(|(end, _, value)| {
                RuleMatch::new(
                    start..end,
                    BuiltinEntityKind::Duration,
                    SlotValue::Duration(value),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<String> {
        input.split_whitespace().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_percentages() {
        // When
        let matches = percentages(&tokens("raise it by 25 % or twenty percent"), Language::EN);

        // Then
        let values: Vec<_> = matches.into_iter().map(|m| (m.tokens, m.value)).collect();
        assert_eq!(
            vec![
                (
                    3..5,
                    SlotValue::Percentage(PercentageValue { value: 25. })
                ),
                (
                    6..8,
                    SlotValue::Percentage(PercentageValue { value: 20. })
                ),
            ],
            values
        );
    }

    #[test]
    fn test_temperatures() {
        // When
        let matches = temperatures(&tokens("set it to 21 degrees celsius"), Language::EN);

        // Then
        assert_eq!(1, matches.len());
        assert_eq!(3..6, matches[0].tokens);
        assert_eq!(
            SlotValue::Temperature(TemperatureValue {
                value: 21.,
                unit: Some("celsius".to_string()),
            }),
            matches[0].value
        );
    }

    #[test]
    fn test_amounts_of_money() {
        // When
        let prefixed = amounts_of_money(&tokens("it costs $ 25"), Language::EN);
        let suffixed = amounts_of_money(&tokens("about ten euros"), Language::EN);

        // Then
        assert_eq!(1, prefixed.len());
        assert_eq!(2..4, prefixed[0].tokens);
        assert_eq!(
            SlotValue::AmountOfMoney(AmountOfMoneyValue {
                value: 25.,
                precision: Precision::Exact,
                unit: Some("$".to_string()),
            }),
            prefixed[0].value
        );
        assert_eq!(0..3, suffixed[0].tokens);
        assert_eq!(
            SlotValue::AmountOfMoney(AmountOfMoneyValue {
                value: 10.,
                precision: Precision::Approximate,
                unit: Some("€".to_string()),
            }),
            suffixed[0].value
        );
    }

    #[test]
    fn test_duration_at() {
        // When
        let duration = duration_at(&tokens("2 hours and 30 minutes please"), 0, Language::EN);
        let fractional = duration_at(&tokens("1.5 days"), 0, Language::EN);

        // Then
        let mut expected_duration = DurationValue::empty(Precision::Exact);
        expected_duration.hours = 2;
        expected_duration.minutes = 30;
        assert_eq!(Some((5, Grain::Minute, expected_duration)), duration);

        let mut expected_fractional = DurationValue::empty(Precision::Exact);
        expected_fractional.days = 1;
        expected_fractional.hours = 12;
        assert_eq!(Some((2, Grain::Day, expected_fractional)), fractional);
    }
}
