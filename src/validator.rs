//! CNPJ extraction and validation.
//!
//! Registry exports split the identifier across three columns (root, order
//! and check digits). Each part is stripped of surrounding quotes and spaces
//! before concatenation.

use crate::models::{columns, InputRow};

/// Length of a CNPJ in characters.
pub const CNPJ_LEN: usize = 14;

const FIRST_DIGIT_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_DIGIT_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Strips leading and trailing double quotes and spaces.
pub fn trim_field(raw: &str) -> &str {
    raw.trim_matches(|c| c == '"' || c == ' ')
}

/// Concatenates the three identifier columns of `row`.
pub fn extract_identifier(row: &InputRow) -> String {
    [
        columns::CNPJ_ROOT,
        columns::CNPJ_ORDER,
        columns::CNPJ_CHECK_DIGITS,
    ]
    .iter()
    .map(|&idx| row.trimmed(idx))
    .collect()
}

/// Accepts any identifier of exactly 14 characters.
///
/// Length is counted in Unicode scalar values, not bytes, so a 14-character
/// identifier with non-ASCII text still passes. Check digits are not verified
/// here; see [`has_valid_check_digits`].
pub fn validate(raw: &str) -> bool {
    raw.chars().count() == CNPJ_LEN
}

/// Verifies the two mod-11 check digits of a CNPJ.
///
/// Informational only: the pipeline logs a mismatch but still looks the
/// identifier up.
pub fn has_valid_check_digits(raw: &str) -> bool {
    let digits = match raw.chars().map(|c| c.to_digit(10)).collect::<Option<Vec<u32>>>() {
        Some(d) => d,
        None => return false,
    };
    if digits.len() != CNPJ_LEN {
        return false;
    }

    let first = check_digit(&digits[..12], &FIRST_DIGIT_WEIGHTS);
    let second = check_digit(&digits[..13], &SECOND_DIGIT_WEIGHTS);

    digits[12] == first && digits[13] == second
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        0 | 1 => 0,
        r => 11 - r,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(parts: [&str; 3]) -> InputRow {
        let mut fields = vec![String::new(); 28];
        for (i, p) in parts.iter().enumerate() {
            fields[i] = p.to_string();
        }
        InputRow::new(fields)
    }

    #[test]
    fn test_extract_trims_quotes_and_spaces() {
        let id = extract_identifier(&row(["\"11222333\"", " \"0001\" ", "81 "]));
        assert_eq!(id, "11222333000181");
        assert!(validate(&id));
    }

    #[test]
    fn test_fifteen_characters_rejected() {
        let id = extract_identifier(&row(["\"11\"", "\"222\"", "\"3344445555\""]));
        assert_eq!(id.len(), 15);
        assert!(!validate(&id));
    }

    #[test]
    fn test_length_is_the_only_rule() {
        assert!(validate("ABCDEFGHIJKLMN"));
        assert!(validate("00000000000000"));
        assert!(!validate(""));
        assert!(!validate("1122233300018"));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let id = "1122233300018\u{00C7}";
        assert_eq!(id.len(), 15);
        assert!(validate(id));
    }

    #[test]
    fn test_check_digits() {
        assert!(has_valid_check_digits("11222333000181"));
        assert!(!has_valid_check_digits("11222333000182"));
        assert!(!has_valid_check_digits("1122233300018A"));
        assert!(!has_valid_check_digits("112223330001"));
    }
}
