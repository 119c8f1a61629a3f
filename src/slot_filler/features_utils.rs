use crate::nlu_utils::token::Token;

/// First `size` chars of `word`, if it has that many
pub fn char_prefix(word: &str, size: usize) -> Option<String> {
    if size == 0 || word.chars().count() < size {
        return None;
    }
    Some(word.chars().take(size).collect())
}

/// Last `size` chars of `word`, if it has that many
pub fn char_suffix(word: &str, size: usize) -> Option<String> {
    let nb_chars = word.chars().count();
    if size == 0 || nb_chars < size {
        return None;
    }
    Some(word.chars().skip(nb_chars - size).collect())
}

/// Rebuilds a string in which every token sits at its char range, gaps being filled with
/// spaces
pub fn initial_string_from_tokens(tokens: &[Token]) -> String {
    let mut result = String::new();
    let mut nb_chars = 0;
    for token in tokens {
        let gap = token.char_range.start.saturating_sub(nb_chars);
        result.extend(std::iter::repeat(' ').take(gap));
        result.push_str(&token.value);
        nb_chars = token.char_range.end;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_prefix() {
        assert_eq!(Some("cap".to_string()), char_prefix("cappuccino", 3));
        assert_eq!(Some("thé".to_string()), char_prefix("thé", 3));
        assert_eq!(None, char_prefix("tea", 4));
        assert_eq!(None, char_prefix("tea", 0));
    }

    #[test]
    fn test_char_suffix() {
        assert_eq!(Some("ino".to_string()), char_suffix("cappuccino", 3));
        assert_eq!(Some("hé".to_string()), char_suffix("thé", 2));
        assert_eq!(None, char_suffix("tea", 5));
    }

    #[test]
    fn test_initial_string_from_tokens() {
        // Given
        let tokens = vec![
            Token::new("two".to_string(), 0..3, 0..3),
            Token::new("hot".to_string(), 6..9, 6..9),
            Token::new("teas".to_string(), 10..14, 10..14),
        ];

        // When
        let result = initial_string_from_tokens(&tokens);

        // Then
        assert_eq!("two   hot teas", &result);
    }
}
