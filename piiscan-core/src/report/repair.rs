// piiscan-core/src/report/repair.rs
//! Re-establishes `value[offset..offset + len(word)] == word` for parts read back
//! from a report whose values were altered in transit (HTML escaping, stripped
//! invisible characters, normalised line endings).
//!
//! All offsets and lengths are in chars.
//!
//! License: MIT OR APACHE 2.0

use once_cell::sync::Lazy;
use regex::Regex;

use crate::failure::FailurePart;

static INVISIBLE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\p{C}+").ok());

/// HTML-encodes `text`: `<`, `>`, `&`, quotes and apostrophes become entities.
pub fn html_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\u{A0}'..='\u{FF}' => out.push_str(&format!("&#{};", c as u32)),
            c if (c as u32) > 0xFFFF => out.push_str(&format!("&#{};", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn substring(chars: &[char], offset: usize, len: usize) -> Option<String> {
    let end = offset.checked_add(len)?;
    chars.get(offset..end).map(|s| s.iter().collect())
}

fn matches_at(chars: &[char], offset: usize, word: &[char]) -> bool {
    offset
        .checked_add(word.len())
        .and_then(|end| chars.get(offset..end))
        .map_or(false, |s| s == word)
}

/// Returns a corrected copy of `part`, or `None` when the word cannot be located in `value`.
///
/// Tried in order: the stored offset as-is, the HTML-encoded word at the stored offset,
/// the word against the value with invisible characters removed, and finally a linear
/// search forward then backward from the stored offset. The search never leaves
/// the value.
pub fn repair_part(value: &str, part: &FailurePart) -> Option<FailurePart> {
    let chars: Vec<char> = value.chars().collect();
    let word: Vec<char> = part.word.chars().collect();

    if matches_at(&chars, part.offset, &word) {
        return Some(part.clone());
    }

    let encoded = html_encode(&part.word);
    if encoded != part.word {
        let encoded_chars: Vec<char> = encoded.chars().collect();
        if matches_at(&chars, part.offset, &encoded_chars) {
            return Some(FailurePart::new(encoded, part.classification, part.offset));
        }
    }

    if let Some(invisible) = INVISIBLE.as_ref() {
        let visible: Vec<char> = invisible.replace_all(value, "").chars().collect();
        if visible.len() != chars.len() && matches_at(&visible, part.offset, &word) {
            // one hidden character sits inside the word's span in the original value
            if let Some(widened) = substring(&chars, part.offset, word.len() + 1) {
                return Some(FailurePart::new(widened, part.classification, part.offset));
            }
        }
    }

    if word.is_empty() || word.len() > chars.len() {
        return None;
    }
    let last_start = chars.len() - word.len();
    let forward = part.offset..=last_start;
    let backward = (0..=part.offset.min(last_start)).rev();
    forward
        .chain(backward)
        .find(|&o| matches_at(&chars, o, &word))
        .map(|offset| FailurePart::new(part.word.clone(), part.classification, offset))
}
