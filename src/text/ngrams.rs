use anyhow::Result;
use regex::Regex;
use tracing::trace;

use super::stopwords::is_stopword;
use super::TARGET_TEXT;

/// Runs of characters that separate words.
pub const NON_WORD_CHARS: &str = "[^A-Za-zА-Яа-я0-9_]+";

/// Word separators that do not cross a sentence or clause boundary.
pub const NON_WORD_NON_PUNCTUATION_CHARS: &str = r"[^A-Za-zА-Яа-я0-9_,\.!\?:]+";

/// Builds a regex matching `phrase` with its words joined by `word_separator`
/// and the whole phrase bounded by `border` or the start/end of the text.
/// The phrase itself is captured in group 1.
pub fn construct_search_regex(phrase: &str, word_separator: &str, border: &str) -> Result<Regex> {
    let body = phrase
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(word_separator);
    Ok(Regex::new(&format!("(?:^|{border})({body})(?:{border}|$)"))?)
}

/// Character offset of the first bounded occurrence of `phrase` in `text`.
///
/// Words of the phrase may be separated by any run of non-word characters.
pub fn phrase_offset(text: &str, phrase: &str) -> Result<Option<usize>> {
    let regex = construct_search_regex(phrase, NON_WORD_CHARS, NON_WORD_CHARS)?;
    Ok(regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| text[..m.start()].chars().count()))
}

/// True when `phrase` occurs in `text` without punctuation between its words.
fn occurs_within_clause(text: &str, phrase: &str) -> Result<bool> {
    let regex = construct_search_regex(phrase, NON_WORD_NON_PUNCTUATION_CHARS, NON_WORD_CHARS)?;
    Ok(regex.is_match(text))
}

/// Sliding-window n-grams of `tokens` for every length in `min_len..=max_len`.
///
/// Windows starting or ending with a stopword are dropped. When `full_text`
/// is given, windows that do not occur in it within a single clause are
/// dropped as well. Output is not deduplicated.
pub fn generate_ngrams(
    tokens: &[String],
    full_text: Option<&str>,
    min_len: usize,
    max_len: usize,
) -> Result<Vec<String>> {
    let mut ngrams = Vec::new();
    for len in min_len.max(1)..=max_len {
        if len > tokens.len() {
            break;
        }
        for window in tokens.windows(len) {
            let (first, last) = (&window[0], &window[len - 1]);
            if is_stopword(first) || is_stopword(last) {
                continue;
            }
            let phrase = window.join(" ");
            if let Some(text) = full_text {
                if !occurs_within_clause(text, &phrase)? {
                    trace!(target: TARGET_TEXT, "Dropping n-gram '{}' spanning a clause boundary", phrase);
                    continue;
                }
            }
            ngrams.push(phrase);
        }
    }
    Ok(ngrams)
}
