use std::ops::Range;

pub fn ranges_overlap(lhs: &Range<usize>, rhs: &Range<usize>) -> bool {
    lhs.start < rhs.end && lhs.end > rhs.start
}

/// Converts a byte range of `string` into the corresponding char range
pub fn convert_to_char_range(string: &str, byte_range: &Range<usize>) -> Range<usize> {
    let start = string
        .char_indices()
        .take_while(|(byte_index, _)| *byte_index < byte_range.start)
        .count();
    let length = string
        .get(byte_range.clone())
        .map(|s| s.chars().count())
        .unwrap_or(0);
    start..start + length
}
