/// Characters kept on each side of a match when no window is configured.
pub const DEFAULT_CONTEXT_WINDOW: usize = 100;

/// Return the slice of `text` covering `start..end` widened by `window`
/// characters on both sides, clamped to the text bounds.
///
/// Offsets are byte positions; offsets that fall inside a multi-byte character
/// are snapped outward to the nearest boundary.
pub fn extract_context(text: &str, start: usize, end: usize, window: usize) -> &str {
    let start = saturating_char_boundary(text, start);
    let end = saturating_char_boundary_forward(text, end.max(start));

    let left = if window == 0 {
        start
    } else {
        text[..start]
            .char_indices()
            .rev()
            .take(window)
            .last()
            .map(|(idx, _)| idx)
            .unwrap_or(start)
    };
    let right = text[end..]
        .char_indices()
        .nth(window)
        .map(|(idx, _)| end + idx)
        .unwrap_or(text.len());

    &text[left..right]
}

fn saturating_char_boundary(text: &str, idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    let mut cursor = idx;
    while cursor > 0 && !text.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

fn saturating_char_boundary_forward(text: &str, idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    let mut cursor = idx;
    while cursor < text.len() && !text.is_char_boundary(cursor) {
        cursor += 1;
    }
    cursor
}
