//! Structural transcript digest.

/// Number of leading words kept.
pub const SUMMARY_MAX_WORDS: usize = 30;
/// Hard character limit applied after the word cut.
pub const SUMMARY_MAX_CHARS: usize = 240;

/// First 30 whitespace-separated words, single-spaced, cut to 240 characters.
pub fn summarize(transcript: &str) -> String {
    let joined = transcript
        .split_whitespace()
        .take(SUMMARY_MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    match joined.char_indices().nth(SUMMARY_MAX_CHARS) {
        Some((byte_idx, _)) => joined[..byte_idx].to_string(),
        None => joined,
    }
}
