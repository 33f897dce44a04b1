//! crates/bloomie_core/src/text.rs
//!
//! Case-insensitive phrase search shared by the keyword heuristics.

/// Where a phrase may sit relative to the surrounding words. Edges of the
/// phrase that are not alphanumeric (e.g. "?") never need a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Plain substring.
    Anywhere,
    /// Must start a word; the word may continue ("water" matches "watered").
    WordStart,
    /// Must be a complete word or word sequence ("4 hours" does not match "14 hours").
    WholeWord,
}

fn lowered_chars(s: &str) -> Vec<char> {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// Number of source chars matching `needle` at `start`, comparing lowercase forms.
fn match_at(chars: &[char], start: usize, needle: &[char]) -> Option<usize> {
    let mut lowered = Vec::with_capacity(needle.len());
    let mut consumed = 0;
    while lowered.len() < needle.len() {
        let c = chars.get(start + consumed)?;
        lowered.extend(c.to_lowercase());
        consumed += 1;
        if !needle.starts_with(&lowered) {
            return None;
        }
    }
    (lowered.len() == needle.len()).then_some(consumed)
}

/// Length in source chars of a match of `needle` at `start`, if the boundary allows it.
fn match_with_boundary(chars: &[char], start: usize, needle: &[char], boundary: Boundary) -> Option<usize> {
    let len = match_at(chars, start, needle)?;
    let starts_word = needle.first().is_some_and(|c| c.is_alphanumeric());
    let ends_word = needle.last().is_some_and(|c| c.is_alphanumeric());

    let before_ok = boundary == Boundary::Anywhere
        || !starts_word
        || start == 0
        || !chars[start - 1].is_alphanumeric();
    let after_ok = boundary != Boundary::WholeWord
        || !ends_word
        || start + len >= chars.len()
        || !chars[start + len].is_alphanumeric();
    (before_ok && after_ok).then_some(len)
}

/// True if `phrase` occurs in `text` under the given boundary rule. Empty
/// phrases never match.
pub fn contains_phrase(text: &str, phrase: &str, boundary: Boundary) -> bool {
    let needle = lowered_chars(phrase.trim());
    if needle.is_empty() {
        return false;
    }
    let chars: Vec<char> = text.chars().collect();
    (0..chars.len()).any(|i| match_with_boundary(&chars, i, &needle, boundary).is_some())
}

/// Replaces every occurrence of `phrase` allowed by `boundary` with a space.
pub fn strip_phrase(text: &str, phrase: &str, boundary: Boundary) -> String {
    let needle = lowered_chars(phrase.trim());
    if needle.is_empty() {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if let Some(len) = match_with_boundary(&chars, i, &needle, boundary) {
            out.push(' ');
            i += len;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_start_allows_suffixes_only() {
        assert!(contains_phrase("Watered the fern", "water", Boundary::WordStart));
        assert!(!contains_phrase("played fetch with a stick", "tick", Boundary::WordStart));
        assert!(!contains_phrase("Showered Rex", "how", Boundary::WordStart));
        assert!(contains_phrase("stick", "tick", Boundary::Anywhere));
    }

    #[test]
    fn whole_word_needs_both_edges() {
        assert!(contains_phrase("in 4 hours", "4 hours", Boundary::WholeWord));
        assert!(!contains_phrase("in 14 hours", "4 hours", Boundary::WholeWord));
        assert!(!contains_phrase("in 4 hoursish", "4 hours", Boundary::WholeWord));
    }

    #[test]
    fn punctuation_keywords_need_no_boundary() {
        assert!(contains_phrase("water my fern?", "?", Boundary::WholeWord));
    }

    #[test]
    fn stripping_respects_boundaries() {
        let stripped = strip_phrase("tomato to go", "to", Boundary::WholeWord);
        assert_eq!(stripped.split_whitespace().collect::<Vec<_>>(), ["tomato", "go"]);
        assert_eq!(strip_phrase("Tomorrowland", "tomorrow", Boundary::Anywhere).trim(), "land");
        assert_eq!(strip_phrase("in 14 hours", "4 hours", Boundary::WholeWord), "in 14 hours");
    }

    #[test]
    fn empty_phrase_never_matches() {
        assert!(!contains_phrase("anything", "  ", Boundary::Anywhere));
        assert_eq!(strip_phrase("anything", "", Boundary::Anywhere), "anything");
    }
}
