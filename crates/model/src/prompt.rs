use alloc::vec::Vec;
use core::num::NonZeroUsize;

/// Prompts at least this long (in characters) are split before delivery.
pub const SPLIT_THRESHOLD: usize = 255;

/// Length (in characters) of every chunk except possibly the last one.
pub const CHUNK_LENGTH: NonZeroUsize = match NonZeroUsize::new(125) {
    Some(len) => len,
    None => unreachable!(),
};

/// A question text prepared for a transport with a bounded prompt length.
#[derive(Debug, PartialEq, Eq)]
pub struct Prompt<'txt> {
    /// Leading chunks to be sent as plain messages, in order.
    pub preamble: Vec<&'txt str>,
    /// Trailing chunk that the poll itself carries.
    pub prompt: &'txt str,
}

/// Splits `text` into consecutive slices of at most `limit` characters.
/// Boundaries always fall on `char` boundaries.
pub fn chunks(text: &str, limit: NonZeroUsize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let end = rest.char_indices().nth(limit.get()).map_or(rest.len(), |(idx, _)| idx);
        let (head, tail) = rest.split_at(end);
        out.push(head);
        rest = tail;
    }
    out
}

pub fn split(text: &str) -> Prompt<'_> {
    if text.chars().count() < SPLIT_THRESHOLD {
        return Prompt { preamble: Vec::new(), prompt: text };
    }

    let mut preamble = chunks(text, CHUNK_LENGTH);
    let prompt = preamble.pop().unwrap_or_default();
    Prompt { preamble, prompt }
}
