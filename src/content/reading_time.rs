//! Reading time estimate for post content

use super::post::ContentBlock;
use super::rich_text::as_text;

/// Average reading speed, in words per minute
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

/// Count the words of a text split on single spaces. Empty segments
/// (from leading, trailing or repeated spaces) are not words.
pub fn count_words(text: &str) -> usize {
    text.split(' ').filter(|word| !word.is_empty()).count()
}

/// Total words of all headings and bodies
pub fn content_word_count(blocks: &[ContentBlock]) -> usize {
    blocks
        .iter()
        .map(|block| count_words(&block.heading) + count_words(&as_text(&block.body)))
        .sum()
}

/// Estimated reading time in whole minutes, rounded up
pub fn estimate_reading_time(blocks: &[ContentBlock], words_per_minute: u32) -> u32 {
    minutes_for_words(content_word_count(blocks), words_per_minute)
}

/// Minutes needed to read `words` words. A speed of 0 is treated as 1.
pub fn minutes_for_words(words: usize, words_per_minute: u32) -> u32 {
    let speed = words_per_minute.max(1) as usize;
    u32::try_from(words.div_ceil(speed)).unwrap_or(u32::MAX)
}
