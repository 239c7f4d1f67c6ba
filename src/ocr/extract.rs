use anyhow::Result;
use regex::Regex;

/// A recognized glyph must be exactly one ASCII letter.
const GLYPH_PATTERN: &str = r"^[A-Za-z]$";

/// Validates raw engine text as a single letter.
///
/// The text is trimmed first. Empty, multi-character, and non-alphabetic
/// output all return `Ok(None)`.
pub fn validate_glyph(raw: &str, uppercase: bool) -> Result<Option<char>> {
    let glyph_regex = Regex::new(GLYPH_PATTERN)?;
    let trimmed = raw.trim();

    if !glyph_regex.is_match(trimmed) {
        return Ok(None);
    }

    Ok(trimmed.chars().next().map(|c| {
        if uppercase {
            c.to_ascii_uppercase()
        } else {
            c
        }
    }))
}
