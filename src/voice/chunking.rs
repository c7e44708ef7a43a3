//! Splitting replies into segments a synthesizer accepts
//!
//! Online TTS engines reject or mangle very long inputs, so replies are
//! spoken as a sequence of segments of at most `limit` characters. Words
//! are packed greedily and never split unless a single word is longer than
//! the limit. A segment is closed early at a sentence end once it is at
//! least half full, which keeps pauses in natural places.

/// Default segment size in characters
pub const DEFAULT_SEGMENT_CHARS: usize = 180;

/// Bounds for a configured segment size
pub const MIN_SEGMENT_CHARS: usize = 40;
pub const MAX_SEGMENT_CHARS: usize = 200;

/// Split `text` into non-empty segments of at most `limit` characters.
///
/// Whitespace runs collapse to a single space. A `limit` of 0 uses
/// [`DEFAULT_SEGMENT_CHARS`].
#[must_use]
pub fn chunk_for_speech(text: &str, limit: usize) -> Vec<String> {
    let limit = if limit == 0 { DEFAULT_SEGMENT_CHARS } else { limit };

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();

        if word_chars > limit {
            flush(&mut chunks, &mut current, &mut current_chars);
            chunks.extend(hard_split(word, limit));
            continue;
        }

        let needed = if current.is_empty() {
            word_chars
        } else {
            current_chars + 1 + word_chars
        };

        if needed > limit {
            flush(&mut chunks, &mut current, &mut current_chars);
        }

        if !current.is_empty() {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(word);
        current_chars += word_chars;

        if ends_sentence(word) && current_chars * 2 >= limit {
            flush(&mut chunks, &mut current, &mut current_chars);
        }
    }

    flush(&mut chunks, &mut current, &mut current_chars);
    chunks
}

fn flush(chunks: &mut Vec<String>, current: &mut String, current_chars: &mut usize) {
    if !current.is_empty() {
        chunks.push(std::mem::take(current));
    }
    *current_chars = 0;
}

fn ends_sentence(word: &str) -> bool {
    word.ends_with(['.', '!', '?'])
}

/// Split an oversized word at character boundaries
fn hard_split(word: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars.chunks(limit).map(|c| c.iter().collect()).collect()
}
