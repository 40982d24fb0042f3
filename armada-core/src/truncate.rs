//! Run log truncation
//!
//! Captured run output is bounded before it is stored or transmitted. The cut
//! is byte-oriented and may fall mid-codepoint; the tail is reinterpreted
//! lossily, so a truncated log can end in a replacement character.

use std::borrow::Cow;

/// Bound `text` to at most `max_bytes` bytes
///
/// Input at or under the limit is returned unchanged (borrowed).
pub fn truncate_log(text: &str, max_bytes: usize) -> Cow<'_, str> {
    if text.len() <= max_bytes {
        return Cow::Borrowed(text);
    }

    String::from_utf8_lossy(&text.as_bytes()[..max_bytes])
}
