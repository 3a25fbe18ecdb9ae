//! Coarse keyword matching shared by the standard parser and the detector.
//!
//! Keywords are lower-cased tokens with punctuation removed, longer than two
//! characters and not in [`STOP_WORDS`]. Frame matching ("never run",
//! "always skip") works on whole words and compares the word after the frame
//! to the anchor term through a small suffix stemmer, so "skip" matches an
//! anchor of "skipping".

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Words that never become keywords.
///
/// Includes the frequency adverbs `always` and `never`: they carry the polarity
/// of a directive, not its subject, and are matched separately as frames.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "need", "dare", "ought", "used", "to", "of", "in", "for", "on", "with", "at", "by",
    "from", "as", "into", "through", "during", "before", "after", "above", "below", "between",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why", "how",
    "all", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only",
    "own", "same", "so", "than", "too", "very", "just", "and", "but", "if", "or", "because",
    "until", "while", "although", "that", "this", "these", "those", "it", "its", "they", "them",
    "their", "what", "which", "who", "whom", "any", "both", "every", "always", "never",
];

/// Phrases that contradict a rule when followed by the rule's anchor term.
pub const NEGATION_FRAMES: &[&str] = &[
    "don't", "do not", "never", "no", "avoid", "skip", "without", "disable",
];

/// Phrases that encourage an anti-pattern when followed by its anchor term.
pub const AFFIRMATION_FRAMES: &[&str] = &["always", "must", "require", "use", "prefer", "enable"];

static PUNCT_RE: OnceLock<Regex> = OnceLock::new();

fn punct_re() -> &'static Regex {
    PUNCT_RE.get_or_init(|| Regex::new(r"[^\w\s-]").expect("static regex"))
}

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

pub fn is_stop_word(word: &str) -> bool {
    stop_words().contains(word)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract keywords from `text` in first-seen order, without duplicates.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = punct_re().replace_all(&lowered, " ");
    let mut seen = HashSet::new();
    cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !is_stop_word(w))
        .filter(|w| seen.insert(w.to_string()))
        .map(str::to_string)
        .collect()
}

/// Keywords of `text` as a set, for overlap checks against large content.
pub fn keyword_set(text: &str) -> HashSet<String> {
    extract_keywords(text).into_iter().collect()
}

/// Number of `candidates` present in `set`.
pub fn overlap<'a, I>(set: &HashSet<String>, candidates: I) -> usize
where
    I: IntoIterator<Item = &'a String>,
{
    candidates.into_iter().filter(|k| set.contains(*k)).count()
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Reduce a word to a rough stem: strips `-ing`, `-ed`, `-es`, `-s` and a
/// trailing `e`, and collapses the doubled consonant left by `-ing`/`-ed`.
pub fn stem(word: &str) -> String {
    let mut w = word.to_lowercase();
    for suffix in ["ing", "ed", "es", "s"] {
        let Some(base) = w.strip_suffix(suffix) else {
            continue;
        };
        if base.chars().count() < 3 || (suffix == "s" && base.ends_with('s')) {
            continue;
        }
        let mut base = base.to_string();
        if matches!(suffix, "ing" | "ed") {
            let chars: Vec<char> = base.chars().collect();
            if let [.., a, b] = chars.as_slice() {
                if a == b && !matches!(a, 'l' | 's' | 'z' | 'e' | 'o') {
                    base.pop();
                }
            }
        }
        w = base;
        break;
    }
    if w.chars().count() > 3 && w.ends_with('e') {
        w.pop();
    }
    w
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('\u{2019}', "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-' || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_frame(text: &str, frames: &[&str], term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let target = stem(term);
    let tokens = words(text);
    frames.iter().any(|frame| {
        let frame_words: Vec<&str> = frame.split_whitespace().collect();
        let n = frame_words.len();
        tokens.windows(n + 1).any(|w| {
            w[..n].iter().zip(&frame_words).all(|(a, b)| a == b) && stem(&w[n]) == target
        })
    })
}

/// Whether `text` contains a negation frame applied to `term` ("never run").
pub fn contains_negation(text: &str, term: &str) -> bool {
    contains_frame(text, NEGATION_FRAMES, term)
}

/// Whether `text` contains an affirmation frame applied to `term` ("always skip").
pub fn contains_affirmation(text: &str, term: &str) -> bool {
    contains_frame(text, AFFIRMATION_FRAMES, term)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
