//! Postprocessing of the raw recognized string: character-class filtering
//! and a narrow, regional correction for a known recognizer confusion.

/// Glyph the recognizer misreads in place of the digit zero in the
/// letter-letter-digit prefix of regional plate formats.
const ZERO_CONFUSION_GLYPH: char = 'C';

/// Apply character filtering, then the prefix-zero correction.
pub fn normalize_plate_text(raw: &str) -> String {
    correct_prefix_zero(filter_plate_chars(raw))
}

/// Keep alphanumerics plus the literal `-` and `.`; drop everything else
/// (spaces, punctuation, stray symbols from partial reads).
fn filter_plate_chars(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '.')
        .collect()
}

/// Replace a misread third glyph with `0`.
///
/// Fires only when the filtered string is longer than two characters, starts
/// with a letter, and the third character is the confusion glyph. Once
/// applied the trigger no longer matches, so the rule is idempotent.
fn correct_prefix_zero(filtered: String) -> String {
    let mut chars: Vec<char> = filtered.chars().collect();
    if chars.len() > 2 && chars[0].is_alphabetic() && chars[2] == ZERO_CONFUSION_GLYPH {
        chars[2] = '0';
        return chars.into_iter().collect();
    }
    filtered
}
