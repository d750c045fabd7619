//! Whitespace-aware chunking of input text.
//!
//! The speech endpoint caps the size of a single request, so longer input
//! is packed greedily into chunks of at most `max_len` characters. Chunks
//! only ever break at whitespace; runs of whitespace collapse to a single
//! space. A token that is longer than `max_len` on its own is emitted as a
//! chunk by itself rather than being split or rejected.

/// Upstream character limit per synthesis request.
pub const DEFAULT_MAX_CHARS: usize = 4000;

/// Split `text` into chunks of at most `max_len` characters.
///
/// Lengths are counted in characters, not bytes. A `max_len` of zero is
/// treated as one.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for token in text.split_whitespace() {
        let token_len = token.chars().count();
        let separator = usize::from(current_len > 0);

        if current_len + separator + token_len > max_len {
            if current_len > 0 {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(token);
            current_len = token_len;
        } else {
            if separator == 1 {
                current.push(' ');
            }
            current.push_str(token);
            current_len += separator + token_len;
        }
    }

    if current_len > 0 {
        chunks.push(current);
    }

    chunks
}
